use super::variant::Variant;
use super::{BinaryDecodable, BinaryEncodable, DecodeResult, Decoder, EncodeResult, Encoder};

const HAS_VALUE: u8 = 0x01;
const HAS_STATUS: u8 = 0x02;
const HAS_SOURCE_TIMESTAMP: u8 = 0x04;
const HAS_SERVER_TIMESTAMP: u8 = 0x08;
const HAS_SOURCE_PICOSECONDS: u8 = 0x10;
const HAS_SERVER_PICOSECONDS: u8 = 0x20;

/// A `Variant` paired with optional timestamps and a status code. Every
/// optional field has a presence bit in the leading mask byte; only present
/// fields occupy wire space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: Option<Variant>,
    pub status: Option<u32>,
    pub source_timestamp: Option<i64>,
    pub server_timestamp: Option<i64>,
    pub source_picoseconds: Option<u16>,
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    pub fn from_value(value: Variant) -> DataValue {
        DataValue { value: Some(value), ..Default::default() }
    }

    fn mask(&self) -> u8 {
        let mut m = 0u8;
        if self.value.is_some() {
            m |= HAS_VALUE;
        }
        if self.status.is_some() {
            m |= HAS_STATUS;
        }
        if self.source_timestamp.is_some() {
            m |= HAS_SOURCE_TIMESTAMP;
        }
        if self.server_timestamp.is_some() {
            m |= HAS_SERVER_TIMESTAMP;
        }
        if self.source_picoseconds.is_some() {
            m |= HAS_SOURCE_PICOSECONDS;
        }
        if self.server_picoseconds.is_some() {
            m |= HAS_SERVER_PICOSECONDS;
        }
        m
    }
}

impl BinaryEncodable for DataValue {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        let mask = self.mask();
        mask.encode(enc)?;
        if let Some(v) = &self.value {
            v.encode(enc)?;
        }
        if let Some(s) = self.status {
            s.encode(enc)?;
        }
        if let Some(t) = self.source_timestamp {
            t.encode(enc)?;
        }
        if let Some(t) = self.server_timestamp {
            t.encode(enc)?;
        }
        if let Some(p) = self.source_picoseconds {
            p.encode(enc)?;
        }
        if let Some(p) = self.server_picoseconds {
            p.encode(enc)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        1 + self.value.as_ref().map_or(0, |v| v.byte_len())
            + self.status.map_or(0, |_| 4)
            + self.source_timestamp.map_or(0, |_| 8)
            + self.server_timestamp.map_or(0, |_| 8)
            + self.source_picoseconds.map_or(0, |_| 2)
            + self.server_picoseconds.map_or(0, |_| 2)
    }
}

impl BinaryDecodable for DataValue {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let mask = u8::decode(dec)?;
        let mut dv = DataValue::default();
        if mask & HAS_VALUE != 0 {
            dv.value = Some(Variant::decode(dec)?);
        }
        if mask & HAS_STATUS != 0 {
            dv.status = Some(u32::decode(dec)?);
        }
        if mask & HAS_SOURCE_TIMESTAMP != 0 {
            dv.source_timestamp = Some(i64::decode(dec)?);
        }
        if mask & HAS_SERVER_TIMESTAMP != 0 {
            dv.server_timestamp = Some(i64::decode(dec)?);
        }
        if mask & HAS_SOURCE_PICOSECONDS != 0 {
            dv.source_picoseconds = Some(u16::decode(dec)?);
        }
        if mask & HAS_SERVER_PICOSECONDS != 0 {
            dv.server_picoseconds = Some(u16::decode(dec)?);
        }
        Ok(dv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;
    use crate::codec::variant::VariantValue;

    #[test]
    fn sparse_datavalue_roundtrips() {
        let ctx = DecodingContext::default();
        let dv = DataValue {
            value: Some(Variant::scalar(VariantValue::UInt32(27))),
            status: Some(0),
            source_timestamp: None,
            server_timestamp: Some(11111111111111),
            source_picoseconds: None,
            server_picoseconds: None,
        };
        let mut enc = Encoder::new();
        dv.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(DataValue::decode(&mut dec).unwrap(), dv);
    }
}
