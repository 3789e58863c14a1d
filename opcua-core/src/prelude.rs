//! Common imports for crates building on top of the core.

pub use crate::capability::{Clock, CryptoModule, LogLevel, Logger, NodeStore, NullLogger, SecurityPolicy, SystemClock, Transport};
pub use crate::channel::{ChannelError, ChannelState, SecureChannel};
pub use crate::chunk::{ChunkFramer, ChunkHeader, ChunkType, FrameLimits, FramingError, MessageType};
pub use crate::codec::{
    BinaryDecodable, BinaryEncodable, DataValue, Decoder, DecodingContext, Encoder, ExpandedNodeId, NodeId, Variant,
    VariantValue,
};
pub use crate::config::Configuration;
pub use crate::eventloop::EventLoop;
pub use crate::session::{Session, SessionState, UserIdentity};
pub use crate::status::{Result, StatusCode};
pub use crate::subscription::{MonitoredItem, Subscription, SubscriptionState};
