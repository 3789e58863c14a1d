//! SecureChannel: the asymmetric handshake, symmetric session keys,
//! per-chunk sign/encrypt, and token renewal.

pub mod crypto;
mod token;

pub use self::token::{DirectionalKeys, SecurityToken};

use std::fmt;
use std::sync::Arc;

use crate::capability::{Clock, Logger, LogLevel, SecurityPolicy};

/// Sequence numbers wrap at this value rather than at `u32::MAX`, per the
/// concrete restart point this implementation was built against.
pub const SEQUENCE_WRAP_THRESHOLD: u32 = 4_294_966_271;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    SecurityChecksFailed,
    SequenceNumberInvalid,
    TokenUnknown,
    PolicyRejected,
    Expired,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for ChannelError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Fresh,
    Opening,
    Open,
    Renewing,
    Closing,
    Closed,
}

/// One secure conversation. Owns the current and (while renewing) next
/// symmetric tokens, the outbound sequence counter, and the last sequence
/// number accepted from the peer.
pub struct SecureChannel {
    pub channel_id: u32,
    pub state: ChannelState,
    policy: Arc<dyn SecurityPolicy>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    current_token: Option<SecurityToken>,
    next_token: Option<SecurityToken>,
    sequence_number_out: u32,
    last_sequence_number_in: Option<u32>,
    request_id_counter: u32,
    pub remote_certificate_thumbprint: Vec<u8>,
}

impl SecureChannel {
    pub fn new(
        channel_id: u32,
        policy: Arc<dyn SecurityPolicy>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
    ) -> SecureChannel {
        SecureChannel {
            channel_id,
            state: ChannelState::Fresh,
            policy,
            clock,
            logger,
            current_token: None,
            next_token: None,
            sequence_number_out: 0,
            last_sequence_number_in: None,
            request_id_counter: 0,
            remote_certificate_thumbprint: Vec::new(),
        }
    }

    pub fn policy(&self) -> &dyn SecurityPolicy {
        self.policy.as_ref()
    }

    /// Install the first symmetric token after a successful OPN handshake.
    pub fn open(&mut self, token: SecurityToken) {
        self.current_token = Some(token);
        self.state = ChannelState::Open;
        self.logger.log(LogLevel::Info, "SecureChannel", &format!("channel {} open, token {}", self.channel_id, token.token_id));
    }

    /// Begin renewal: stash the new token as `next` without yet promoting
    /// it. Both the old and new token are accepted on inbound MSG until
    /// the client first uses the new tokenId (`acknowledge_renewal`).
    pub fn begin_renewal(&mut self, token: SecurityToken) {
        self.logger.log(
            LogLevel::Debug,
            "SecureChannel",
            &format!("channel {} renewing, next token {}", self.channel_id, token.token_id),
        );
        self.next_token = Some(token);
        self.state = ChannelState::Renewing;
    }

    /// Called when an inbound MSG arrives using the new tokenId: promotes
    /// `next` to `current`, dropping the old token immediately rather than
    /// waiting out its grace window (the client has already switched).
    pub fn acknowledge_renewal(&mut self, token_id: u32) {
        if let Some(next) = &self.next_token {
            if next.token_id == token_id {
                self.current_token = self.next_token.take();
                self.state = ChannelState::Open;
                self.logger.log(
                    LogLevel::Info,
                    "SecureChannel",
                    &format!("channel {} renewal acknowledged, token {}", self.channel_id, token_id),
                );
            }
        }
    }

    pub fn close(&mut self) {
        self.state = ChannelState::Closing;
        self.logger.log(LogLevel::Info, "SecureChannel", &format!("channel {} closing", self.channel_id));
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ChannelState::Open | ChannelState::Renewing)
    }

    /// The next outbound sequence number, applying the documented wrap
    /// rule instead of letting it overflow into `u32::MAX`.
    pub fn next_sequence_number(&mut self) -> u32 {
        let next = if self.sequence_number_out == 0 {
            1
        } else if self.sequence_number_out >= SEQUENCE_WRAP_THRESHOLD {
            1
        } else {
            self.sequence_number_out + 1
        };
        self.sequence_number_out = next;
        next
    }

    pub fn next_request_id(&mut self) -> u32 {
        self.request_id_counter = self.request_id_counter.wrapping_add(1);
        self.request_id_counter
    }

    /// Reject a sequence number that isn't strictly greater than the last
    /// one accepted, honoring the same wrap point as `next_sequence_number`.
    pub fn accept_sequence_number(&mut self, seq: u32) -> Result<(), ChannelError> {
        match self.last_sequence_number_in {
            None => {
                self.last_sequence_number_in = Some(seq);
                Ok(())
            }
            Some(last) => {
                let in_order = seq > last || (last >= SEQUENCE_WRAP_THRESHOLD && seq == 1);
                if in_order {
                    self.last_sequence_number_in = Some(seq);
                    Ok(())
                } else {
                    self.logger.log(
                        LogLevel::Warning,
                        "SecureChannel",
                        &format!("channel {} rejected out-of-order sequence number {} (last {})", self.channel_id, seq, last),
                    );
                    Err(ChannelError::SequenceNumberInvalid)
                }
            }
        }
    }

    /// Locate the directional keys for `token_id`, checking the current
    /// token first and falling back to `next` during renewal, honoring the
    /// grace window on whichever token is being superseded.
    pub fn keys_for_token(&self, token_id: u32) -> Result<&SecurityToken, ChannelError> {
        let now = self.clock.now();
        if let Some(current) = &self.current_token {
            if current.token_id == token_id && !current.is_expired(now) {
                return Ok(current);
            }
        }
        if let Some(next) = &self.next_token {
            if next.token_id == token_id {
                return Ok(next);
            }
        }
        Err(ChannelError::TokenUnknown)
    }

    /// Sign-then-encrypt one chunk body under the keys for `token_id`,
    /// padding to the cipher's block alignment before signing.
    pub fn protect(&self, token_id: u32, body: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let token = self.keys_for_token(token_id)?;
        let symmetric = self.policy.symmetric();
        let signature = symmetric
            .sign(body, &token.server_keys.signing_key)
            .map_err(|_| ChannelError::SecurityChecksFailed)?;
        let mut signed = body.to_vec();
        signed.extend_from_slice(&signature);
        symmetric
            .encrypt(&signed, &token.server_keys.encrypting_key, self.sequence_number_out as u64)
            .map_err(|_| ChannelError::SecurityChecksFailed)
    }

    /// Decrypt then verify one chunk body, returning the unsigned payload.
    pub fn unprotect(&self, token_id: u32, sequence_number: u32, ciphertext: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let token = self.keys_for_token(token_id)?;
        let symmetric = self.policy.symmetric();
        let signed = symmetric
            .decrypt(ciphertext, &token.client_keys.encrypting_key, sequence_number as u64)
            .map_err(|_| ChannelError::SecurityChecksFailed)?;
        let sig_len = symmetric.signature_size();
        if signed.len() < sig_len {
            return Err(ChannelError::SecurityChecksFailed);
        }
        let (body, signature) = signed.split_at(signed.len() - sig_len);
        symmetric
            .verify(body, signature, &token.client_keys.signing_key)
            .map_err(|_| ChannelError::SecurityChecksFailed)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{NullLogger, SystemClock};
    use crate::channel::crypto::{Aead256Policy, KEY_SIZE};
    use std::time::{Duration, Instant};

    fn token(id: u32) -> SecurityToken {
        SecurityToken {
            token_id: id,
            client_keys: DirectionalKeys { signing_key: vec![1u8; KEY_SIZE], encrypting_key: vec![1u8; KEY_SIZE] },
            server_keys: DirectionalKeys { signing_key: vec![2u8; KEY_SIZE], encrypting_key: vec![2u8; KEY_SIZE] },
            created_at: Instant::now(),
            lifetime: Duration::from_secs(600),
        }
    }

    fn channel() -> SecureChannel {
        let policy: Arc<dyn SecurityPolicy> = Arc::new(Aead256Policy::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        SecureChannel::new(1, policy, clock, Arc::new(NullLogger))
    }

    #[test]
    fn sequence_number_wraps_at_documented_threshold() {
        let mut ch = channel();
        ch.sequence_number_out = SEQUENCE_WRAP_THRESHOLD;
        assert_eq!(ch.next_sequence_number(), 1);
    }

    #[test]
    fn sequence_number_rejects_replay() {
        let mut ch = channel();
        assert!(ch.accept_sequence_number(5).is_ok());
        assert_eq!(ch.accept_sequence_number(5), Err(ChannelError::SequenceNumberInvalid));
        assert_eq!(ch.accept_sequence_number(4), Err(ChannelError::SequenceNumberInvalid));
    }

    #[test]
    fn sequence_number_accepts_wrap_restart() {
        let mut ch = channel();
        assert!(ch.accept_sequence_number(SEQUENCE_WRAP_THRESHOLD).is_ok());
        assert!(ch.accept_sequence_number(1).is_ok());
    }

    #[test]
    fn both_tokens_valid_during_renewal() {
        let mut ch = channel();
        ch.open(token(1));
        ch.begin_renewal(token(2));
        assert!(ch.keys_for_token(1).is_ok());
        assert!(ch.keys_for_token(2).is_ok());
    }

    #[test]
    fn acknowledging_renewal_drops_old_token() {
        let mut ch = channel();
        ch.open(token(1));
        ch.begin_renewal(token(2));
        ch.acknowledge_renewal(2);
        assert_eq!(ch.keys_for_token(1), Err(ChannelError::TokenUnknown));
        assert!(ch.keys_for_token(2).is_ok());
    }

    #[test]
    fn protect_then_unprotect_roundtrips() {
        let mut ch = channel();
        ch.open(token(1));
        let sealed = ch.protect(1, b"request body").unwrap();
        let seq = ch.sequence_number_out as u64;
        let opened = ch.unprotect(1, seq as u32, &sealed).unwrap();
        assert_eq!(opened, b"request body");
    }
}
