//! Session lifecycle: creation, activation, request dispatch, and timeout.

mod identity;

pub use self::identity::UserIdentity;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::capability::{LogLevel, Logger};
use crate::codec::NodeId;
use crate::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Activated,
    Closed,
}

/// A server-side session: user identity, timeout bookkeeping, and the set
/// of subscription ids it owns. Bound to at most one SecureChannel at a
/// time; `channel_id` is updated on session transfer.
pub struct Session {
    pub session_id: NodeId,
    pub authentication_token: NodeId,
    pub state: SessionState,
    pub identity: Option<UserIdentity>,
    pub channel_id: Option<u32>,
    pub timeout: Duration,
    pub last_activity: Instant,
    pub subscriptions: HashSet<u32>,
    logger: Arc<dyn Logger>,
}

impl Session {
    pub fn new(
        session_id: NodeId,
        authentication_token: NodeId,
        timeout: Duration,
        now: Instant,
        logger: Arc<dyn Logger>,
    ) -> Session {
        Session {
            session_id,
            authentication_token,
            state: SessionState::Created,
            identity: None,
            channel_id: None,
            timeout,
            last_activity: now,
            subscriptions: HashSet::new(),
            logger,
        }
    }

    pub fn activate(&mut self, identity: UserIdentity, channel_id: u32, now: Instant) {
        self.identity = Some(identity);
        self.channel_id = Some(channel_id);
        self.state = SessionState::Activated;
        self.last_activity = now;
        self.logger.log(LogLevel::Info, "Session", &format!("session activated on channel {}", channel_id));
    }

    /// Session transfer: move an already-activated session to a different
    /// channel without re-running ActivateSession's identity check.
    pub fn transfer_to_channel(&mut self, channel_id: u32, now: Instant) -> Result<(), StatusCode> {
        if self.state != SessionState::Activated {
            return Err(StatusCode::SessionNotActivated);
        }
        self.channel_id = Some(channel_id);
        self.last_activity = now;
        Ok(())
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn is_timed_out(&self, now: Instant) -> bool {
        now.duration_since(self.last_activity) > self.timeout
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.logger.log(LogLevel::Info, "Session", "session closed");
    }

    /// Every operation other than CreateSession/ActivateSession must pass
    /// through this check before dispatch.
    pub fn require_activated(&self) -> Result<(), StatusCode> {
        match self.state {
            SessionState::Activated => Ok(()),
            SessionState::Created => Err(StatusCode::SessionNotActivated),
            SessionState::Closed => Err(StatusCode::SessionClosed),
        }
    }
}

/// Dispatch table mapping a request's type NodeId to a handler. The core
/// does not prescribe the handler signature beyond returning a
/// `StatusCode`; `opcua-server` supplies the concrete service handlers.
pub struct ServiceDispatch<H> {
    handlers: HashMap<NodeId, H>,
}

impl<H> ServiceDispatch<H> {
    pub fn new() -> ServiceDispatch<H> {
        ServiceDispatch { handlers: HashMap::new() }
    }

    pub fn register(&mut self, request_type: NodeId, handler: H) {
        self.handlers.insert(request_type, handler);
    }

    pub fn get(&self, request_type: &NodeId) -> Option<&H> {
        self.handlers.get(request_type)
    }
}

impl<H> Default for ServiceDispatch<H> {
    fn default() -> ServiceDispatch<H> {
        ServiceDispatch::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NullLogger;

    fn session() -> Session {
        Session::new(
            NodeId::numeric(0, 1),
            NodeId::numeric(0, 2),
            Duration::from_secs(60),
            Instant::now(),
            Arc::new(NullLogger),
        )
    }

    #[test]
    fn new_session_requires_activation() {
        let s = session();
        assert_eq!(s.require_activated(), Err(StatusCode::SessionNotActivated));
    }

    #[test]
    fn activated_session_passes_check() {
        let mut s = session();
        s.activate(UserIdentity::Anonymous, 7, Instant::now());
        assert_eq!(s.require_activated(), Ok(()));
    }

    #[test]
    fn transfer_requires_prior_activation() {
        let mut s = session();
        assert_eq!(s.transfer_to_channel(9, Instant::now()), Err(StatusCode::SessionNotActivated));
    }

    #[test]
    fn timeout_detected_after_inactivity() {
        let mut s = session();
        s.timeout = Duration::from_millis(0);
        std::thread::sleep(Duration::from_millis(1));
        assert!(s.is_timed_out(Instant::now()));
    }
}
