//! SecurityGroup key management: rotation on a KeyLifetime, with a buffer
//! of past and future keys so a reader lagging or leading the writer's
//! current key can still authenticate a message tagged with its KeyId.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::channel::crypto::Aead256Module;
use crate::capability::CryptoModule;
use crate::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub u32);

#[derive(Clone)]
pub struct SecurityKey {
    pub id: KeyId,
    pub bytes: Vec<u8>,
}

/// A rotating key set: the current key plus bounded buffers of past and
/// future keys, indexed by `KeyId` so a receiver can select the right one
/// without renegotiating. `maxPastKeyCount`/`maxFutureKeyCount` bound how
/// far a receiver may lag or lead the writer before a message becomes
/// unauthenticatable.
pub struct SecurityGroup {
    pub security_group_id: String,
    module: Aead256Module,
    current: SecurityKey,
    past: VecDeque<SecurityKey>,
    future: VecDeque<SecurityKey>,
    max_past_key_count: usize,
    max_future_key_count: usize,
    key_lifetime: Duration,
    last_rotation: Instant,
}

impl SecurityGroup {
    pub fn new(
        security_group_id: impl Into<String>,
        current: SecurityKey,
        max_past_key_count: usize,
        max_future_key_count: usize,
        key_lifetime: Duration,
        now: Instant,
    ) -> SecurityGroup {
        SecurityGroup {
            security_group_id: security_group_id.into(),
            module: Aead256Module,
            current,
            past: VecDeque::new(),
            future: VecDeque::new(),
            max_past_key_count,
            max_future_key_count,
            key_lifetime,
            last_rotation: now,
        }
    }

    pub fn current_key_id(&self) -> KeyId {
        self.current.id
    }

    pub fn rotation_due(&self, now: Instant) -> bool {
        now.duration_since(self.last_rotation) >= self.key_lifetime
    }

    /// Advance to the next key: the current key is pushed onto `past`
    /// (evicting the oldest if `maxPastKeyCount` is exceeded), and the next
    /// queued future key becomes current. Pushing a queued future key keeps
    /// `GetSecurityKeys`-style pre-provisioning working across rotations.
    pub fn rotate(&mut self, next: Option<SecurityKey>, now: Instant) {
        let retiring = std::mem::replace(
            &mut self.current,
            self.future.pop_front().or(next).unwrap_or_else(|| self.current.clone()),
        );
        self.past.push_front(retiring);
        while self.past.len() > self.max_past_key_count {
            self.past.pop_back();
        }
        self.last_rotation = now;
    }

    pub fn push_future_key(&mut self, key: SecurityKey) {
        self.future.push_back(key);
        while self.future.len() > self.max_future_key_count {
            self.future.pop_front();
        }
    }

    fn find_key(&self, id: KeyId) -> Option<&SecurityKey> {
        if self.current.id == id {
            return Some(&self.current);
        }
        self.past.iter().chain(self.future.iter()).find(|k| k.id == id)
    }

    /// Sign-then-encrypt the payload under the current key; the resulting
    /// bytes are prefixed with the `KeyId` so the receiver can select the
    /// matching key without out-of-band state.
    pub fn protect(&self, payload: &[u8]) -> Result<Vec<u8>, StatusCode> {
        let ciphertext = self.module.encrypt(payload, &self.current.bytes, self.current.id.0 as u64)?;
        let mut out = Vec::with_capacity(4 + ciphertext.len());
        out.extend_from_slice(&self.current.id.0.to_le_bytes());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn unprotect(&self, protected: &[u8]) -> Result<Vec<u8>, StatusCode> {
        if protected.len() < 4 {
            return Err(StatusCode::SecurityChecksFailed);
        }
        let key_id = KeyId(u32::from_le_bytes([protected[0], protected[1], protected[2], protected[3]]));
        let key = self.find_key(key_id).ok_or(StatusCode::SecurityChecksFailed)?;
        self.module.decrypt(&protected[4..], &key.bytes, key_id.0 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u32) -> SecurityKey {
        SecurityKey { id: KeyId(id), bytes: vec![id as u8; crate::channel::crypto::KEY_SIZE] }
    }

    #[test]
    fn protect_then_unprotect_roundtrips() {
        let group = SecurityGroup::new("group-1", key(1), 2, 2, Duration::from_secs(3600), Instant::now());
        let protected = group.protect(b"a dataset message payload").unwrap();
        let plain = group.unprotect(&protected).unwrap();
        assert_eq!(plain, b"a dataset message payload");
    }

    #[test]
    fn rotation_retires_current_key_into_past_buffer() {
        let mut group = SecurityGroup::new("group-1", key(1), 1, 1, Duration::from_secs(1), Instant::now());
        let protected_under_key_one = group.protect(b"payload").unwrap();

        group.rotate(Some(key(2)), Instant::now());
        assert_eq!(group.current_key_id(), KeyId(2));

        let plain = group.unprotect(&protected_under_key_one).unwrap();
        assert_eq!(plain, b"payload");
    }

    #[test]
    fn past_key_buffer_is_bounded() {
        let mut group = SecurityGroup::new("group-1", key(1), 1, 1, Duration::from_secs(1), Instant::now());
        group.rotate(Some(key(2)), Instant::now());
        group.rotate(Some(key(3)), Instant::now());
        assert!(group.find_key(KeyId(1)).is_none());
        assert!(group.find_key(KeyId(2)).is_some());
    }
}
