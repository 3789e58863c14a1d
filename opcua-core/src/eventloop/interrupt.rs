//! Interrupt routing as a value owned by the `EventLoop`, not a process
//! singleton. The real binary registers a `signalfd`-backed source (or the
//! self-pipe trick where `signalfd` is unavailable); tests substitute a
//! synchronous dispatcher that raises signals in-process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Interrupt,
    Terminate,
    HangUp,
}

/// Set by the signal handler (or, in tests, by `raise`), cleared once
/// `dispatch_pending` has run the registered callback. The handler side
/// never takes a lock — it only flips this flag and wakes the loop.
struct Pending {
    signal: Signal,
    flag: Arc<AtomicBool>,
}

pub struct InterruptManager {
    pending: Vec<Pending>,
    handlers: HashMap<usize, Box<dyn FnMut(Signal)>>,
    next_handler_id: usize,
}

impl InterruptManager {
    pub fn new() -> InterruptManager {
        InterruptManager { pending: Vec::new(), handlers: HashMap::new(), next_handler_id: 0 }
    }

    /// Register a handler invoked (on the loop thread) whenever any watched
    /// signal fires. Returns an id for `unregister`.
    pub fn on_signal(&mut self, handler: Box<dyn FnMut(Signal)>) -> usize {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        self.handlers.insert(id, handler);
        id
    }

    pub fn unregister(&mut self, id: usize) {
        self.handlers.remove(&id);
    }

    /// Watch `signal`, returning the flag the OS-level handler should set.
    /// The flag is intentionally the only thing the signal-handler context
    /// touches.
    pub fn watch(&mut self, signal: Signal) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.pending.push(Pending { signal, flag: flag.clone() });
        flag
    }

    /// Test/synchronous substitute for an OS signal arriving: marks the
    /// watched flag directly instead of going through a real handler.
    pub fn raise(&self, signal: Signal) {
        for p in &self.pending {
            if p.signal == signal {
                p.flag.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Runs on every `EventLoop` tick: for every watched signal whose flag
    /// is set, clear it and invoke every registered handler.
    pub fn dispatch_pending(&mut self) {
        let mut fired = Vec::new();
        for p in &self.pending {
            if p.flag.swap(false, Ordering::SeqCst) {
                fired.push(p.signal);
            }
        }
        for signal in fired {
            for handler in self.handlers.values_mut() {
                handler(signal);
            }
        }
    }
}

impl Default for InterruptManager {
    fn default() -> InterruptManager {
        InterruptManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_signal_invokes_registered_handler() {
        let mut mgr = InterruptManager::new();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = seen.clone();
        mgr.on_signal(Box::new(move |sig| s.borrow_mut().push(sig)));
        mgr.watch(Signal::Interrupt);

        mgr.raise(Signal::Interrupt);
        mgr.dispatch_pending();

        assert_eq!(*seen.borrow(), vec![Signal::Interrupt]);
    }

    #[test]
    fn dispatch_clears_flag_so_it_does_not_refire() {
        let mut mgr = InterruptManager::new();
        let count = std::rc::Rc::new(std::cell::RefCell::new(0));
        let c = count.clone();
        mgr.on_signal(Box::new(move |_| *c.borrow_mut() += 1));
        mgr.watch(Signal::Terminate);

        mgr.raise(Signal::Terminate);
        mgr.dispatch_pending();
        mgr.dispatch_pending();

        assert_eq!(*count.borrow(), 1);
    }
}
