//! Single-threaded reactor: readiness polling over registered sources plus
//! a cancellable timer wheel, both driven from one `run_once` tick.

mod interrupt;
mod timer;

pub use self::interrupt::{InterruptManager, Signal};
pub use self::timer::{TimerHandle, TimerWheel};

use std::io;
use std::sync::Arc;
use std::time::Instant;

use mio::{Evented, Events, Poll, PollOpt, Ready, Token};

use crate::capability::{Clock, LogLevel, Logger};

/// A unit of deferred work posted from outside the loop thread (or from a
/// running callback) and drained at the top of the next tick.
pub type DeferredWork = Box<dyn FnOnce() + Send>;

/// Callback invoked when a registered source becomes readable/writable.
pub type ReadinessCallback = Box<dyn FnMut(Ready)>;

struct Registration {
    token: Token,
    callback: ReadinessCallback,
}

/// The reactor. Owns the `mio::Poll` instance, the timer wheel, and the
/// queue of posted deferred work; nothing here is `Send` on purpose — a
/// single thread drives it, matching the core's concurrency model.
pub struct EventLoop {
    poll: Poll,
    events: Events,
    registrations: Vec<Registration>,
    next_token: usize,
    timers: TimerWheel,
    interrupts: InterruptManager,
    deferred: Vec<DeferredWork>,
    clock: Box<dyn Clock>,
    logger: Arc<dyn Logger>,
    running: bool,
}

impl EventLoop {
    pub fn new(clock: Box<dyn Clock>, logger: Arc<dyn Logger>) -> io::Result<EventLoop> {
        Ok(EventLoop {
            poll: Poll::new()?,
            events: Events::with_capacity(1024),
            registrations: Vec::new(),
            next_token: 0,
            timers: TimerWheel::new(),
            interrupts: InterruptManager::new(),
            deferred: Vec::new(),
            clock,
            logger,
            running: false,
        })
    }

    /// Register a readiness source; returns the token to later
    /// `deregister` it.
    pub fn register<E: Evented>(&mut self, source: &E, interest: Ready, callback: ReadinessCallback) -> io::Result<Token> {
        let token = Token(self.next_token);
        self.next_token += 1;
        self.poll.register(source, token, interest, PollOpt::edge())?;
        self.registrations.push(Registration { token, callback });
        Ok(token)
    }

    pub fn deregister<E: Evented>(&mut self, source: &E, token: Token) -> io::Result<()> {
        self.poll.deregister(source)?;
        self.registrations.retain(|r| r.token != token);
        Ok(())
    }

    /// Schedule `callback` to run at `deadline`. Cancellable via the
    /// returned handle; cancellation is O(log n), tombstone-based.
    pub fn schedule(&mut self, deadline: Instant, callback: Box<dyn FnOnce()>) -> TimerHandle {
        self.timers.schedule(deadline, callback)
    }

    pub fn cancel(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }

    /// Post work to run at the top of the next tick, from any thread that
    /// can reach this handle's sender half (see `post`/self-pipe wakeup).
    pub fn defer(&mut self, work: DeferredWork) {
        self.deferred.push(work);
    }

    pub fn interrupts_mut(&mut self) -> &mut InterruptManager {
        &mut self.interrupts
    }

    /// Run deferred work, expired timers, and one readiness poll. Blocks
    /// for at most the time until the next timer deadline.
    pub fn run_once(&mut self) -> io::Result<()> {
        for work in self.deferred.drain(..) {
            work();
        }

        let now = self.clock.now();
        self.timers.fire_due(now);

        let timeout = self.timers.next_deadline().map(|deadline| deadline.saturating_duration_since(now));
        self.poll.poll(&mut self.events, timeout)?;

        for event in self.events.iter() {
            if let Some(registration) = self.registrations.iter_mut().find(|r| r.token == event.token()) {
                (registration.callback)(event.readiness());
            }
        }

        self.interrupts.dispatch_pending();
        Ok(())
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.running = true;
        self.logger.log(LogLevel::Info, "EventLoop", "starting");
        while self.running {
            self.run_once()?;
        }
        self.logger.log(LogLevel::Info, "EventLoop", "stopped");
        Ok(())
    }

    pub fn stop(&mut self) {
        self.logger.log(LogLevel::Info, "EventLoop", "stop requested");
        self.running = false;
    }
}
