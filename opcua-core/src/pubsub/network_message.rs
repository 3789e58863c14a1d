//! Binary UADP NetworkMessage/DataSetMessage headers used to demultiplex
//! incoming datagrams before the WriterGroup/ReaderGroup cycle logic.
//!
//! Every field here is encoded/decoded in declaration order, so these
//! derive their codec impls instead of hand-rolling them.

use opcua_core_derive::UaEncodable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, UaEncodable)]
pub struct MetaDataVersion {
    pub major_version: u32,
    pub minor_version: u32,
}

/// One DataSetMessage within a NetworkMessage: identifies its writer and
/// carries the sequence/version bookkeeping a reader uses to detect gaps
/// and stale configuration. The four optional fields each get a one-byte
/// presence flag ahead of their value via `#[ua(optional)]`.
#[derive(Debug, Clone, UaEncodable)]
pub struct DataSetMessage {
    pub dataset_writer_id: u16,
    #[ua(optional)]
    pub sequence_number: Option<u16>,
    #[ua(optional)]
    pub metadata_version: Option<MetaDataVersion>,
    #[ua(optional)]
    pub timestamp: Option<i64>,
    #[ua(optional)]
    pub status: Option<u16>,
    #[ua(array)]
    pub payload: Vec<u8>,
}

/// Header identifying the publisher/writer-group this NetworkMessage
/// belongs to, used by `ReaderGroup::matches` before decoding the payload.
#[derive(Debug, Clone, UaEncodable)]
pub struct NetworkMessage {
    pub publisher_id: u16,
    pub writer_group_id: u16,
    pub group_version: u32,
    pub network_message_number: u16,
    #[ua(array)]
    pub messages: Vec<DataSetMessage>,
}

impl NetworkMessage {
    pub fn new(publisher_id: u16, writer_group_id: u16) -> NetworkMessage {
        NetworkMessage { publisher_id, writer_group_id, group_version: 1, network_message_number: 0, messages: Vec::new() }
    }
}
