//! PubSub publish/subscribe engine: pre-built NetworkMessage buffers
//! re-encoded in place each publishing cycle, and the reader side that
//! demultiplexes and decodes them back out.

mod network_message;
mod security_group;

pub use self::network_message::{DataSetMessage, MetaDataVersion, NetworkMessage};
pub use self::security_group::{KeyId, SecurityGroup, SecurityKey};

use std::sync::Arc;

use crate::capability::{LogLevel, Logger};
use crate::codec::{BinaryEncodable, DataValue, Encoder};
use crate::status::StatusCode;

/// What kind of value a given `OffsetEntry` re-encodes on each cycle.
#[derive(Debug, Clone)]
pub enum OffsetKind {
    GroupVersion,
    SequenceNumber,
    DataSetSequenceNumber,
    Timestamp,
    Field(DataValue),
}

/// One entry in a WriterGroup's OffsetTable: an index into the arena buffer
/// plus what to re-encode there. Indices, not raw pointers, per the
/// buffer-arena redesign — any reconfiguration invalidates the arena and a
/// fresh one (and OffsetTable) is built rather than patched.
#[derive(Debug, Clone)]
pub struct OffsetEntry {
    pub offset: usize,
    pub kind: OffsetKind,
}

/// Owns the encoded bytes a WriterGroup republishes every cycle, plus the
/// table of where each dynamic field lives inside them.
pub struct OffsetTable {
    arena: Vec<u8>,
    entries: Vec<OffsetEntry>,
}

impl OffsetTable {
    pub fn new(arena: Vec<u8>, entries: Vec<OffsetEntry>) -> OffsetTable {
        OffsetTable { arena, entries }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.arena
    }

    /// Re-encode every dynamic field into its reserved slot. Fields are
    /// fixed-width by construction (the arena is never resized here); a
    /// value that no longer fits its slot is a configuration error caught
    /// when the table is built, not here.
    fn refresh(&mut self, group_version: u32, sequence_number: u32, dataset_sequence_number: u16, timestamp: i64) {
        for entry in &self.entries {
            let mut enc = Encoder::new();
            match &entry.kind {
                OffsetKind::GroupVersion => group_version.encode(&mut enc).unwrap(),
                OffsetKind::SequenceNumber => sequence_number.encode(&mut enc).unwrap(),
                OffsetKind::DataSetSequenceNumber => dataset_sequence_number.encode(&mut enc).unwrap(),
                OffsetKind::Timestamp => timestamp.encode(&mut enc).unwrap(),
                OffsetKind::Field(value) => {
                    if let Some(v) = &value.value {
                        v.encode(&mut enc).unwrap();
                    }
                }
            }
            let bytes = enc.into_bytes();
            let end = entry.offset + bytes.len();
            if end <= self.arena.len() {
                self.arena[entry.offset..end].copy_from_slice(&bytes);
            }
        }
    }
}

/// Publishes one DataSetWriter's stream of NetworkMessages. Per cycle:
/// refresh the offset table, optionally sign/encrypt under the current
/// SecurityGroup key, and hand the bytes to the caller for transport.
pub struct WriterGroup {
    pub writer_group_id: u16,
    pub dataset_writer_id: u16,
    pub security: Option<SecurityGroup>,
    table: OffsetTable,
    group_version: u32,
    sequence_number: u32,
    dataset_sequence_number: u16,
    logger: Arc<dyn Logger>,
}

impl WriterGroup {
    pub fn new(writer_group_id: u16, dataset_writer_id: u16, table: OffsetTable, logger: Arc<dyn Logger>) -> WriterGroup {
        WriterGroup {
            writer_group_id,
            dataset_writer_id,
            security: None,
            table,
            group_version: 1,
            sequence_number: 0,
            dataset_sequence_number: 0,
            logger,
        }
    }

    /// Attach a SecurityGroup, logging the key id the group now signs under.
    pub fn set_security(&mut self, group: SecurityGroup) {
        self.logger.log(
            LogLevel::Info,
            "PubSubEngine",
            &format!("writer group {} now protected under key {:?}", self.writer_group_id, group.current_key_id()),
        );
        self.security = Some(group);
    }

    /// Run one publishing cycle: refresh the buffer, sign/encrypt it if a
    /// SecurityGroup is configured, and return the bytes ready for
    /// transport. The sequence numbers advance even if the caller never
    /// sends the returned bytes — a missed transport write does not roll
    /// the stream back.
    pub fn publish_cycle(&mut self, now: i64) -> Result<Vec<u8>, StatusCode> {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.dataset_sequence_number = self.dataset_sequence_number.wrapping_add(1);
        self.table.refresh(self.group_version, self.sequence_number, self.dataset_sequence_number, now);

        match &self.security {
            Some(group) => group.protect(self.table.bytes()),
            None => Ok(self.table.bytes().to_vec()),
        }
    }
}

/// Receives one ReaderGroup's datagrams: demultiplexes by
/// (publisher, writer group, dataset writer), verifies/decrypts under the
/// matching SecurityGroup key (selected by the message's KeyId), and
/// decodes the DataSetMessage.
pub struct ReaderGroup {
    pub publisher_id: u16,
    pub writer_group_id: u16,
    pub dataset_writer_id: u16,
    pub security: Option<SecurityGroup>,
    last_sequence_number: Option<u16>,
}

impl ReaderGroup {
    pub fn new(publisher_id: u16, writer_group_id: u16, dataset_writer_id: u16) -> ReaderGroup {
        ReaderGroup { publisher_id, writer_group_id, dataset_writer_id, security: None, last_sequence_number: None }
    }

    pub fn matches(&self, message: &NetworkMessage) -> bool {
        message.publisher_id == self.publisher_id
    }

    /// Unprotect (if a SecurityGroup is configured) then hand back the raw
    /// payload bytes for the caller's DataSetMetaData-driven decode.
    pub fn receive(&mut self, datagram: &[u8]) -> Result<Vec<u8>, StatusCode> {
        let plaintext = match &self.security {
            Some(group) => group.unprotect(datagram)?,
            None => datagram.to_vec(),
        };
        Ok(plaintext)
    }

    pub fn note_sequence_number(&mut self, sequence_number: u16) {
        self.last_sequence_number = Some(sequence_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NullLogger;
    use crate::codec::VariantValue;
    use crate::codec::Variant;

    fn table_with_sequence_slot() -> OffsetTable {
        let arena = vec![0u8; 4];
        let entries = vec![OffsetEntry { offset: 0, kind: OffsetKind::SequenceNumber }];
        OffsetTable::new(arena, entries)
    }

    #[test]
    fn publish_cycle_advances_sequence_number_in_place() {
        let mut writer = WriterGroup::new(1, 1, table_with_sequence_slot(), Arc::new(NullLogger));
        let first = writer.publish_cycle(0).unwrap();
        let second = writer.publish_cycle(0).unwrap();
        assert_ne!(first, second);
        assert_eq!(u32::from_le_bytes([first[0], first[1], first[2], first[3]]), 1);
        assert_eq!(u32::from_le_bytes([second[0], second[1], second[2], second[3]]), 2);
    }

    #[test]
    fn field_slot_reflects_current_value() {
        let arena = vec![0u8; 4];
        let entries = vec![OffsetEntry {
            offset: 0,
            kind: OffsetKind::Field(DataValue::from_value(Variant::scalar(VariantValue::UInt32(27)))),
        }];
        let mut table = OffsetTable::new(arena, entries);
        table.refresh(1, 1, 1, 0);
        assert_eq!(table.bytes(), &27u32.to_le_bytes());
    }
}
