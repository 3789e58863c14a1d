use std::time::{Duration, Instant};

/// Symmetric key material for one direction of traffic, derived from the
/// client/server nonce pair exchanged during OPN.
#[derive(Clone)]
pub struct DirectionalKeys {
    pub signing_key: Vec<u8>,
    pub encrypting_key: Vec<u8>,
}

/// One generation of symmetric session keys, scoped to a tokenId.
#[derive(Clone)]
pub struct SecurityToken {
    pub token_id: u32,
    pub client_keys: DirectionalKeys,
    pub server_keys: DirectionalKeys,
    pub created_at: Instant,
    pub lifetime: Duration,
}

impl SecurityToken {
    /// Renewal grace period: at most 25% of the token's lifetime, per the
    /// channel's renewal rule.
    pub fn grace_period(&self) -> Duration {
        self.lifetime / 4
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) > self.lifetime + self.grace_period()
    }

    pub fn renewal_due(&self, now: Instant) -> bool {
        // Renew once 75% of the lifetime has elapsed, leaving the grace
        // window as slack for the client to switch over.
        now.duration_since(self.created_at) >= self.lifetime - self.grace_period()
    }
}
