//! OPC UA Secure Conversation chunk framing: splitting outgoing messages
//! into bounded chunks and reassembling incoming chunks into messages.

mod block;

pub use self::block::{ChunkBlock, ChunkBlockPool, BLOCK_SIZE};

use std::collections::HashMap;
use std::fmt;

pub const HEADER_SIZE: usize = 8;
pub const SEQUENCE_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Hello,
    Acknowledge,
    Error,
    OpenSecureChannel,
    CloseSecureChannel,
    Message,
}

impl MessageType {
    fn tag(self) -> &'static [u8; 3] {
        match self {
            MessageType::Hello => b"HEL",
            MessageType::Acknowledge => b"ACK",
            MessageType::Error => b"ERR",
            MessageType::OpenSecureChannel => b"OPN",
            MessageType::CloseSecureChannel => b"CLO",
            MessageType::Message => b"MSG",
        }
    }

    fn from_tag(tag: &[u8]) -> Option<MessageType> {
        match tag {
            b"HEL" => Some(MessageType::Hello),
            b"ACK" => Some(MessageType::Acknowledge),
            b"ERR" => Some(MessageType::Error),
            b"OPN" => Some(MessageType::OpenSecureChannel),
            b"CLO" => Some(MessageType::CloseSecureChannel),
            b"MSG" => Some(MessageType::Message),
            _ => None,
        }
    }

    /// Single-chunk unsecured handshake messages never get split.
    pub fn is_unsecured(self) -> bool {
        matches!(self, MessageType::Hello | MessageType::Acknowledge | MessageType::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    Final,
    Continuation,
    Abort,
}

impl ChunkType {
    fn byte(self) -> u8 {
        match self {
            ChunkType::Final => b'F',
            ChunkType::Continuation => b'C',
            ChunkType::Abort => b'A',
        }
    }

    fn from_byte(b: u8) -> Option<ChunkType> {
        match b {
            b'F' => Some(ChunkType::Final),
            b'C' => Some(ChunkType::Continuation),
            b'A' => Some(ChunkType::Abort),
            _ => None,
        }
    }
}

/// The fixed 12-byte chunk header: 3-byte message type, 1-byte chunk type,
/// 4-byte total chunk size (header included), 4-byte secure channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub message_type: MessageType,
    pub chunk_type: ChunkType,
    pub chunk_size: u32,
    pub secure_channel_id: u32,
}

pub const CHUNK_HEADER_SIZE: usize = 12;

impl ChunkHeader {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.message_type.tag());
        out.push(self.chunk_type.byte());
        out.extend_from_slice(&self.chunk_size.to_le_bytes());
        out.extend_from_slice(&self.secure_channel_id.to_le_bytes());
    }

    pub fn decode(bytes: &[u8]) -> Result<ChunkHeader, FramingError> {
        if bytes.len() < CHUNK_HEADER_SIZE {
            return Err(FramingError::TooShort);
        }
        let message_type = MessageType::from_tag(&bytes[0..3]).ok_or(FramingError::UnknownMessageType)?;
        let chunk_type = ChunkType::from_byte(bytes[3]).ok_or(FramingError::MalformedHeader)?;
        let chunk_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let secure_channel_id = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        Ok(ChunkHeader { message_type, chunk_type, chunk_size, secure_channel_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    TooShort,
    MalformedHeader,
    UnknownMessageType,
    ChunkSizeExceeded,
    MessageSizeExceeded,
    ChunkCountExceeded,
    UnknownChannel,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for FramingError {}

/// Negotiated limits from the HEL/ACK handshake.
#[derive(Debug, Clone, Copy)]
pub struct FrameLimits {
    pub max_chunk_size: u32,
    pub max_message_size: u32,
    pub max_chunk_count: u32,
}

impl Default for FrameLimits {
    fn default() -> FrameLimits {
        FrameLimits { max_chunk_size: 64 * 1024, max_message_size: 16 * 1024 * 1024, max_chunk_count: 512 }
    }
}

struct PartialMessage {
    message_type: MessageType,
    bodies: Vec<Vec<u8>>,
    total_len: usize,
}

/// Reassembles chunks sharing a requestId into a complete message body, and
/// splits outgoing bodies into chunks bounded by the negotiated limits.
/// Keyed on requestId per the sequence header embedded ahead of each
/// chunk's body (read and stripped by `SecureChannel` before chunks reach
/// here, since the sequence header lives inside the encrypted region for
/// symmetric messages).
pub struct ChunkFramer {
    limits: FrameLimits,
    in_progress: HashMap<u32, PartialMessage>,
}

impl ChunkFramer {
    pub fn new(limits: FrameLimits) -> ChunkFramer {
        ChunkFramer { limits, in_progress: HashMap::new() }
    }

    /// Feed one chunk's header and decrypted body (sequence header already
    /// stripped) keyed by `request_id`. Returns `Some(bytes)` once the
    /// final chunk of a message has arrived.
    pub fn feed(
        &mut self,
        header: &ChunkHeader,
        request_id: u32,
        body: Vec<u8>,
    ) -> Result<Option<(MessageType, Vec<u8>)>, FramingError> {
        if header.chunk_size > self.limits.max_chunk_size {
            self.in_progress.remove(&request_id);
            return Err(FramingError::ChunkSizeExceeded);
        }

        match header.chunk_type {
            ChunkType::Abort => {
                self.in_progress.remove(&request_id);
                Ok(None)
            }
            ChunkType::Continuation | ChunkType::Final => {
                let entry = self.in_progress.entry(request_id).or_insert_with(|| PartialMessage {
                    message_type: header.message_type,
                    bodies: Vec::new(),
                    total_len: 0,
                });

                if entry.bodies.len() as u32 + 1 > self.limits.max_chunk_count {
                    self.in_progress.remove(&request_id);
                    return Err(FramingError::ChunkCountExceeded);
                }

                entry.total_len += body.len();
                if entry.total_len as u32 > self.limits.max_message_size {
                    self.in_progress.remove(&request_id);
                    return Err(FramingError::MessageSizeExceeded);
                }

                entry.bodies.push(body);

                if header.chunk_type == ChunkType::Final {
                    let partial = self.in_progress.remove(&request_id).unwrap();
                    let mut full = Vec::with_capacity(partial.total_len);
                    for b in partial.bodies {
                        full.extend_from_slice(&b);
                    }
                    Ok(Some((partial.message_type, full)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Discard any partial assembly state for `request_id` (used when a
    /// channel is aborted).
    pub fn abort(&mut self, request_id: u32) {
        self.in_progress.remove(&request_id);
    }

    /// Split `body` into chunks no larger than the negotiated
    /// `max_chunk_size`, each prefixed with `overhead` bytes reserved by the
    /// caller for the security header plus sequence header that must
    /// precede the body of each chunk on the wire. Returns the per-chunk
    /// body slices and whether each is the final chunk.
    pub fn split<'a>(&self, body: &'a [u8], overhead: usize) -> Vec<(&'a [u8], ChunkType)> {
        let budget = (self.limits.max_chunk_size as usize).saturating_sub(overhead + CHUNK_HEADER_SIZE);
        let budget = budget.max(1);
        let mut out = Vec::new();
        let mut offset = 0;
        if body.is_empty() {
            return vec![(&body[0..0], ChunkType::Final)];
        }
        while offset < body.len() {
            let end = (offset + budget).min(body.len());
            let chunk_type = if end == body.len() { ChunkType::Final } else { ChunkType::Continuation };
            out.push((&body[offset..end], chunk_type));
            offset = end;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(chunk_type: ChunkType, size: u32) -> ChunkHeader {
        ChunkHeader { message_type: MessageType::Message, chunk_type, chunk_size: size, secure_channel_id: 1 }
    }

    #[test]
    fn single_chunk_message_completes_immediately() {
        let mut framer = ChunkFramer::new(FrameLimits::default());
        let result = framer.feed(&header(ChunkType::Final, 20), 7, vec![1, 2, 3]).unwrap();
        assert_eq!(result, Some((MessageType::Message, vec![1, 2, 3])));
    }

    #[test]
    fn multi_chunk_message_reassembles_in_order() {
        let mut framer = ChunkFramer::new(FrameLimits::default());
        assert_eq!(framer.feed(&header(ChunkType::Continuation, 20), 7, vec![1, 2]).unwrap(), None);
        assert_eq!(framer.feed(&header(ChunkType::Continuation, 20), 7, vec![3, 4]).unwrap(), None);
        let result = framer.feed(&header(ChunkType::Final, 20), 7, vec![5, 6]).unwrap();
        assert_eq!(result, Some((MessageType::Message, vec![1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn abort_chunk_discards_buffered_state() {
        let mut framer = ChunkFramer::new(FrameLimits::default());
        framer.feed(&header(ChunkType::Continuation, 20), 7, vec![1, 2]).unwrap();
        let result = framer.feed(&header(ChunkType::Abort, 20), 7, vec![]).unwrap();
        assert_eq!(result, None);
        assert!(framer.in_progress.is_empty());
    }

    #[test]
    fn chunk_count_limit_aborts_assembly() {
        let mut limits = FrameLimits::default();
        limits.max_chunk_count = 1;
        let mut framer = ChunkFramer::new(limits);
        assert_eq!(
            framer.feed(&header(ChunkType::Continuation, 20), 7, vec![1]).unwrap(),
            None
        );
        assert_eq!(
            framer.feed(&header(ChunkType::Final, 20), 7, vec![2]),
            Err(FramingError::ChunkCountExceeded)
        );
    }

    #[test]
    fn split_respects_max_chunk_size() {
        let mut limits = FrameLimits::default();
        limits.max_chunk_size = 32;
        let framer = ChunkFramer::new(limits);
        let body = vec![0u8; 50];
        let chunks = framer.split(&body, 0);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.last().unwrap().1, ChunkType::Final);
        let total: usize = chunks.iter().map(|(b, _)| b.len()).sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn header_roundtrips() {
        let h = header(ChunkType::Final, 128);
        let mut bytes = Vec::new();
        h.encode(&mut bytes);
        assert_eq!(bytes.len(), CHUNK_HEADER_SIZE);
        assert_eq!(ChunkHeader::decode(&bytes).unwrap(), h);
    }
}
