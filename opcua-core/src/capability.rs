//! Interface abstractions for collaborators the core depends on but does
//! not own: the information model, transport, cryptography, and logging.
//! Each is modeled as a trait rather than a function-pointer table, so the
//! core stays generic over these records instead of doing manual dynamic
//! dispatch.

use crate::codec::{DataValue, NodeId};
use crate::status::StatusCode;

/// Attribute read/write and reference traversal over the information
/// model. The core never owns nodes; it only calls through this trait.
pub trait NodeStore: Send + Sync {
    fn get_attribute(&self, node: &NodeId, attribute_id: u32) -> Result<DataValue, StatusCode>;

    fn set_attribute(&self, node: &NodeId, attribute_id: u32, value: DataValue) -> Result<(), StatusCode>;

    fn exists(&self, node: &NodeId) -> bool;
}

/// One half of a `SecurityPolicy`'s crypto module: either the asymmetric
/// (certificate-keyed) or symmetric (session-keyed) signature + encryption
/// operations, mirroring `UA_SecurityPolicySignatureAlgorithm` /
/// `UA_SecurityPolicyEncryptionAlgorithm`.
pub trait CryptoModule: Send + Sync {
    fn sign(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>, StatusCode>;

    fn verify(&self, data: &[u8], signature: &[u8], key: &[u8]) -> Result<(), StatusCode>;

    fn encrypt(&self, plaintext: &[u8], key: &[u8], nonce: u64) -> Result<Vec<u8>, StatusCode>;

    fn decrypt(&self, ciphertext: &[u8], key: &[u8], nonce: u64) -> Result<Vec<u8>, StatusCode>;

    fn signature_size(&self) -> usize;

    fn key_length(&self) -> usize;
}

/// A security policy: a named algorithm suite bundling an asymmetric
/// module (handshake), a symmetric module (per-message), and key
/// derivation. Corresponds to `UA_SecurityPolicy` in the reference plugin
/// interface.
pub trait SecurityPolicy: Send + Sync {
    fn uri(&self) -> &str;

    fn asymmetric(&self) -> &dyn CryptoModule;

    fn symmetric(&self) -> &dyn CryptoModule;

    /// Derive `length` bytes of key material from `secret` and `seed`
    /// (the channel's `P_SHA`-equivalent key derivation function).
    fn derive_key(&self, secret: &[u8], seed: &[u8], length: usize) -> Vec<u8>;

    fn generate_nonce(&self, length: usize) -> Vec<u8>;

    fn make_certificate_thumbprint(&self, certificate: &[u8]) -> Vec<u8>;
}

/// Structured logging sink. Implementations are expected to wrap a
/// `slog::Logger`; the core never logs to a global, only through an
/// instance threaded in at construction.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, category: &'static str, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Byte-stream or datagram transport. `send` and `try_recv` are both
/// non-blocking: the EventLoop polls readiness separately and calls these
/// only when the registered descriptor is ready.
pub trait Transport: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, StatusCode>;

    fn try_recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StatusCode>;
}

/// Monotonic clock, threaded in so deadline computation never touches
/// `SystemTime` (which can jump backwards across NTP steps).
pub trait Clock: Send + Sync {
    fn now(&self) -> std::time::Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }
}

/// Discards every record. Mirrors `slog::Discard`; useful as the default
/// logger in tests and for callers that have not wired a real sink yet.
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _category: &'static str, _message: &str) {}
}
