use super::primitives::{ByteString, Guid, UaString};
use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeResult, Encoder};

/// Encoding-byte values selecting one of the four compact NodeId forms.
/// `TWO_BYTE` is the dense form for small namespace-zero numeric ids;
/// `NUMERIC` carries a full 16-bit namespace and 32-bit identifier.
const TWO_BYTE: u8 = 0x00;
const NUMERIC: u8 = 0x01;
const STRING: u8 = 0x03;
const GUID: u8 = 0x04;
const BYTESTRING: u8 = 0x05;

const FLAG_NAMESPACE_URI: u8 = 0x80;
const FLAG_SERVER_INDEX: u8 = 0x40;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Guid),
    ByteString(Vec<u8>),
}

/// Identifies a node: a namespace index paired with one of four identifier
/// kinds. Implements a total order so it can key a `BTreeMap`, and `Hash` so
/// it can key a `HashMap`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub namespace_index: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub fn numeric(namespace_index: u16, id: u32) -> NodeId {
        NodeId { namespace_index, identifier: Identifier::Numeric(id) }
    }

    pub fn string(namespace_index: u16, id: impl Into<String>) -> NodeId {
        NodeId { namespace_index, identifier: Identifier::String(id.into()) }
    }

    fn compact_form(&self) -> u8 {
        match &self.identifier {
            Identifier::Numeric(id) if self.namespace_index == 0 && *id <= 0xFF => TWO_BYTE,
            Identifier::Numeric(_) => NUMERIC,
            Identifier::String(_) => STRING,
            Identifier::Guid(_) => GUID,
            Identifier::ByteString(_) => BYTESTRING,
        }
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.namespace_index, format!("{:?}", self.identifier))
            .cmp(&(other.namespace_index, format!("{:?}", other.identifier)))
    }
}

impl BinaryEncodable for NodeId {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        match self.compact_form() {
            TWO_BYTE => {
                let id = match self.identifier {
                    Identifier::Numeric(id) => id as u8,
                    _ => unreachable!(),
                };
                enc.push(&[TWO_BYTE, id]);
                Ok(())
            }
            NUMERIC => {
                let id = match self.identifier {
                    Identifier::Numeric(id) => id,
                    _ => unreachable!(),
                };
                enc.push(&[NUMERIC]);
                self.namespace_index.encode(enc)?;
                id.encode(enc)
            }
            STRING => {
                enc.push(&[STRING]);
                self.namespace_index.encode(enc)?;
                match &self.identifier {
                    Identifier::String(s) => UaString::from(s.clone()).encode(enc),
                    _ => unreachable!(),
                }
            }
            GUID => {
                enc.push(&[GUID]);
                self.namespace_index.encode(enc)?;
                match &self.identifier {
                    Identifier::Guid(g) => g.encode(enc),
                    _ => unreachable!(),
                }
            }
            BYTESTRING => {
                enc.push(&[BYTESTRING]);
                self.namespace_index.encode(enc)?;
                match &self.identifier {
                    Identifier::ByteString(b) => ByteString::from(b.clone()).encode(enc),
                    _ => unreachable!(),
                }
            }
            _ => unreachable!(),
        }
    }

    fn byte_len(&self) -> usize {
        match self.compact_form() {
            TWO_BYTE => 2,
            NUMERIC => 7,
            STRING => match &self.identifier {
                Identifier::String(s) => 3 + 4 + s.len(),
                _ => unreachable!(),
            },
            GUID => 3 + 16,
            BYTESTRING => match &self.identifier {
                Identifier::ByteString(b) => 3 + 4 + b.len(),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }
}

impl BinaryDecodable for NodeId {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let form = u8::decode(dec)? & 0x3F;
        match form {
            TWO_BYTE => {
                let id = u8::decode(dec)?;
                Ok(NodeId::numeric(0, id as u32))
            }
            NUMERIC => {
                let ns = u16::decode(dec)?;
                let id = u32::decode(dec)?;
                Ok(NodeId::numeric(ns, id))
            }
            STRING => {
                let ns = u16::decode(dec)?;
                let s = UaString::decode(dec)?;
                Ok(NodeId::string(ns, s.0.unwrap_or_default()))
            }
            GUID => {
                let ns = u16::decode(dec)?;
                let g = Guid::decode(dec)?;
                Ok(NodeId { namespace_index: ns, identifier: Identifier::Guid(g) })
            }
            BYTESTRING => {
                let ns = u16::decode(dec)?;
                let b = ByteString::decode(dec)?;
                Ok(NodeId { namespace_index: ns, identifier: Identifier::ByteString(b.0.unwrap_or_default()) })
            }
            _ => Err(DecodeError::InvalidEncodingByte),
        }
    }
}

/// `NodeId` plus the optional namespace URI / server index pair that make
/// it resolvable across servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedNodeId {
    pub node_id: NodeId,
    pub namespace_uri: Option<String>,
    pub server_index: Option<u32>,
}

impl PartialEq<NodeId> for ExpandedNodeId {
    fn eq(&self, other: &NodeId) -> bool {
        self.namespace_uri.is_none() && self.node_id == *other
    }
}

impl BinaryEncodable for ExpandedNodeId {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        let mut flags = self.node_id.compact_form();
        if self.namespace_uri.is_some() {
            flags |= FLAG_NAMESPACE_URI;
        }
        if self.server_index.is_some() {
            flags |= FLAG_SERVER_INDEX;
        }
        let mut inner = Encoder::new();
        self.node_id.encode(&mut inner)?;
        let body = inner.into_bytes();
        enc.push(&[flags]);
        enc.push(&body[1..]);
        if let Some(uri) = &self.namespace_uri {
            UaString::from(uri.clone()).encode(enc)?;
        }
        if let Some(idx) = self.server_index {
            idx.encode(enc)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.node_id.byte_len()
            + self.namespace_uri.as_ref().map_or(0, |u| 4 + u.len())
            + self.server_index.map_or(0, |_| 4)
    }
}

impl BinaryDecodable for ExpandedNodeId {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let flags = dec.take(1)?[0];
        let form = flags & 0x3F;
        let node_id = match form {
            TWO_BYTE => {
                let id = u8::decode(dec)?;
                NodeId::numeric(0, id as u32)
            }
            NUMERIC => {
                let ns = u16::decode(dec)?;
                let id = u32::decode(dec)?;
                NodeId::numeric(ns, id)
            }
            STRING => {
                let ns = u16::decode(dec)?;
                let s = UaString::decode(dec)?;
                NodeId::string(ns, s.0.unwrap_or_default())
            }
            GUID => {
                let ns = u16::decode(dec)?;
                let g = Guid::decode(dec)?;
                NodeId { namespace_index: ns, identifier: Identifier::Guid(g) }
            }
            BYTESTRING => {
                let ns = u16::decode(dec)?;
                let b = ByteString::decode(dec)?;
                NodeId { namespace_index: ns, identifier: Identifier::ByteString(b.0.unwrap_or_default()) }
            }
            _ => return Err(DecodeError::InvalidEncodingByte),
        };
        let namespace_uri = if flags & FLAG_NAMESPACE_URI != 0 {
            UaString::decode(dec)?.0
        } else {
            None
        };
        let server_index = if flags & FLAG_SERVER_INDEX != 0 {
            Some(u32::decode(dec)?)
        } else {
            None
        };
        Ok(ExpandedNodeId { node_id, namespace_uri, server_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;

    #[test]
    fn numeric_form_matches_literal_wire_bytes() {
        // namespaceIndex=2, numeric identifier 1234: encoding byte 0x01,
        // two-byte namespace `02 00`, four-byte identifier `D2 04 00 00`.
        let ctx = DecodingContext::default();
        let id = NodeId::numeric(2, 1234);
        let mut enc = Encoder::new();
        id.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(bytes, [0x01, 0x02, 0x00, 0xD2, 0x04, 0x00, 0x00]);
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(NodeId::decode(&mut dec).unwrap(), id);
    }

    #[test]
    fn two_byte_form_used_for_small_namespace_zero_ids() {
        let id = NodeId::numeric(0, 42);
        let mut enc = Encoder::new();
        id.encode(&mut enc).unwrap();
        assert_eq!(enc.into_bytes(), [TWO_BYTE, 42]);
    }

    #[test]
    fn string_nodeid_roundtrips() {
        let ctx = DecodingContext::default();
        let id = NodeId::string(1, "widget");
        let mut enc = Encoder::new();
        id.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(NodeId::decode(&mut dec).unwrap(), id);
    }
}
