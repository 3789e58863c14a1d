use super::nodeid::NodeId;
use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeResult, Encoder};

/// The body of an `ExtensionObject`. `EncodedXml` is carried for protocol
/// completeness but this codec never produces it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionObjectEncoding {
    None,
    Bytestring(Vec<u8>),
    Xml(Vec<u8>),
}

/// A typed container for a structure whose concrete type this codec may
/// not know. An unrecognized type id is preserved verbatim as
/// `Bytestring` so the caller can still forward or store it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionObject {
    pub type_id: NodeId,
    pub body: ExtensionObjectEncoding,
}

impl ExtensionObject {
    pub fn null() -> ExtensionObject {
        ExtensionObject { type_id: NodeId::numeric(0, 0), body: ExtensionObjectEncoding::None }
    }

    pub fn from_bytes(type_id: NodeId, bytes: Vec<u8>) -> ExtensionObject {
        ExtensionObject { type_id, body: ExtensionObjectEncoding::Bytestring(bytes) }
    }
}

impl BinaryEncodable for ExtensionObject {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        self.type_id.encode(enc)?;
        match &self.body {
            ExtensionObjectEncoding::None => {
                enc.push(&[0u8]);
            }
            ExtensionObjectEncoding::Bytestring(bytes) => {
                enc.push(&[1u8]);
                (bytes.len() as i32).encode(enc)?;
                enc.push(bytes);
            }
            ExtensionObjectEncoding::Xml(bytes) => {
                enc.push(&[2u8]);
                (bytes.len() as i32).encode(enc)?;
                enc.push(bytes);
            }
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        self.type_id.byte_len()
            + 1
            + match &self.body {
                ExtensionObjectEncoding::None => 0,
                ExtensionObjectEncoding::Bytestring(b) | ExtensionObjectEncoding::Xml(b) => 4 + b.len(),
            }
    }
}

impl BinaryDecodable for ExtensionObject {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let type_id = NodeId::decode(dec)?;
        let encoding = u8::decode(dec)?;
        let body = match encoding {
            0 => ExtensionObjectEncoding::None,
            1 => {
                let len = i32::decode(dec)?;
                if len < 0 {
                    ExtensionObjectEncoding::Bytestring(Vec::new())
                } else {
                    ExtensionObjectEncoding::Bytestring(dec.take(len as usize)?.to_vec())
                }
            }
            2 => {
                let len = i32::decode(dec)?;
                if len < 0 {
                    ExtensionObjectEncoding::Xml(Vec::new())
                } else {
                    ExtensionObjectEncoding::Xml(dec.take(len as usize)?.to_vec())
                }
            }
            _ => return Err(DecodeError::InvalidEncodingByte),
        };
        Ok(ExtensionObject { type_id, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;

    #[test]
    fn bytestring_body_roundtrips() {
        let ctx = DecodingContext::default();
        let eo = ExtensionObject::from_bytes(NodeId::numeric(1, 99), vec![1, 2, 3, 4]);
        let mut enc = Encoder::new();
        eo.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(ExtensionObject::decode(&mut dec).unwrap(), eo);
    }

    #[test]
    fn null_body_roundtrips() {
        let ctx = DecodingContext::default();
        let eo = ExtensionObject::null();
        let mut enc = Encoder::new();
        eo.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(ExtensionObject::decode(&mut dec).unwrap(), eo);
    }
}
