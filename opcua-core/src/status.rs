use std::fmt;
use std::io;

use crate::channel::ChannelError;
use crate::chunk::FramingError;
use crate::codec::{DecodeError, EncodeError};

/// Flattened result/error code for every layer of the core. Mirrors the wire
/// convention that every service outcome is a single status value, with
/// `Good` standing in for the zero/success code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Good,

    // Transport
    ConnectionClosed,
    ConnectionRejected,
    Timeout,

    // Framing
    TcpEndpointUrlInvalid,
    TcpMessageTypeInvalid,
    TcpMessageTooLarge,

    // Security
    SecurityChecksFailed,
    SecurityPolicyRejected,
    CertificateUntrusted,
    CertificateTimeInvalid,
    UserAccessDenied,

    // Channel / Session
    SecureChannelIdInvalid,
    SessionIdInvalid,
    SessionClosed,
    SessionNotActivated,

    // Service
    NodeIdUnknown,
    AttributeIdInvalid,
    WriteNotSupported,
    NotReadable,
    TypeMismatch,
    OutOfRange,
    TooManyOperations,

    // Subscription
    SubscriptionIdInvalid,
    MessageNotAvailable,
    NoSubscription,
    TooManyPublishRequests,
    BadTimeout,

    // Resource
    OutOfMemory,
    ResourceUnavailable,

    // Decode/Encode (bridged from codec::DecodeError / EncodeError)
    BadDecodingError,
    BadEncodingLimitsExceeded,
}

impl StatusCode {
    pub fn is_good(self) -> bool {
        self == StatusCode::Good
    }

    pub fn is_bad(self) -> bool {
        !self.is_good()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for StatusCode {}

impl From<io::Error> for StatusCode {
    fn from(_: io::Error) -> Self {
        StatusCode::ConnectionClosed
    }
}

impl From<DecodeError> for StatusCode {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::LengthExceedsContext | DecodeError::DepthExceeded => {
                StatusCode::BadEncodingLimitsExceeded
            }
            _ => StatusCode::BadDecodingError,
        }
    }
}

impl From<EncodeError> for StatusCode {
    fn from(_: EncodeError) -> Self {
        StatusCode::BadEncodingLimitsExceeded
    }
}

impl From<FramingError> for StatusCode {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::ChunkSizeExceeded
            | FramingError::MessageSizeExceeded
            | FramingError::ChunkCountExceeded => StatusCode::TcpMessageTooLarge,
            FramingError::UnknownMessageType => StatusCode::TcpMessageTypeInvalid,
            _ => StatusCode::TcpMessageTypeInvalid,
        }
    }
}

impl From<ChannelError> for StatusCode {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::SecurityChecksFailed => StatusCode::SecurityChecksFailed,
            ChannelError::SequenceNumberInvalid => StatusCode::SecurityChecksFailed,
            ChannelError::TokenUnknown => StatusCode::SecureChannelIdInvalid,
            ChannelError::PolicyRejected => StatusCode::SecurityPolicyRejected,
            ChannelError::Expired => StatusCode::SecureChannelIdInvalid,
        }
    }
}

pub type Result<T> = std::result::Result<T, StatusCode>;
