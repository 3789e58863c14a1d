use super::primitives::{ByteString, DateTime, Guid, LocalizedText, QualifiedName, UaString};
use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeError, EncodeResult, Encoder};

const FLAG_ARRAY: u8 = 0x80;
const FLAG_DIMENSIONS: u8 = 0x40;
const TYPE_MASK: u8 = 0x3F;

/// Built-in scalar datatype ids (Part 6 Table 1), the subset this codec
/// materializes directly rather than boxing through `ExtensionObject`.
fn type_id(value: &VariantValue) -> u8 {
    match value {
        VariantValue::Boolean(_) => 1,
        VariantValue::Byte(_) => 3,
        VariantValue::Int16(_) => 4,
        VariantValue::UInt16(_) => 5,
        VariantValue::Int32(_) => 6,
        VariantValue::UInt32(_) => 7,
        VariantValue::Int64(_) => 8,
        VariantValue::UInt64(_) => 9,
        VariantValue::Float(_) => 10,
        VariantValue::Double(_) => 11,
        VariantValue::String(_) => 12,
        VariantValue::DateTime(_) => 13,
        VariantValue::Guid(_) => 14,
        VariantValue::ByteString(_) => 15,
        VariantValue::LocalizedText(_) => 21,
        VariantValue::QualifiedName(_) => 20,
    }
}

/// A single scalar payload a `Variant` can carry. Arrays are a `Vec` of the
/// matching scalar kind, selected at the `Variant` level rather than here.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(UaString),
    DateTime(DateTime),
    Guid(Guid),
    ByteString(ByteString),
    LocalizedText(LocalizedText),
    QualifiedName(QualifiedName),
}

/// Whether a `Variant` owns the storage behind its payload. `Borrowed`
/// stands in for the wire protocol's "do not delete" marker: `clear` drops
/// only `Owned` payloads, so a `Variant` referencing caller-owned memory
/// can never be double-freed or dangle the caller's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Empty,
    Scalar(VariantValue),
    Array { dims: Option<Vec<u32>>, items: Vec<VariantValue> },
}

/// Discriminated value: empty, a scalar, or an array with an optional
/// multi-dimensional shape whose product must equal the element count.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    storage: Storage,
    ownership: Ownership,
}

impl Variant {
    pub fn empty() -> Variant {
        Variant { storage: Storage::Empty, ownership: Ownership::Owned }
    }

    pub fn scalar(value: VariantValue) -> Variant {
        Variant { storage: Storage::Scalar(value), ownership: Ownership::Owned }
    }

    pub fn array(items: Vec<VariantValue>) -> Variant {
        Variant { storage: Storage::Array { dims: None, items }, ownership: Ownership::Owned }
    }

    pub fn array_with_dims(items: Vec<VariantValue>, dims: Vec<u32>) -> Result<Variant, EncodeError> {
        let product: u64 = dims.iter().map(|&d| d as u64).product();
        if product != items.len() as u64 {
            return Err(EncodeError::BufferTooSmall { required: 0 });
        }
        Ok(Variant { storage: Storage::Array { dims: Some(dims), items }, ownership: Ownership::Owned })
    }

    /// Wrap an existing `Variant`'s payload as borrowed: `clear` on the
    /// result is a no-op, matching `DATA_NODELETE` semantics.
    pub fn borrowed(mut self) -> Variant {
        self.ownership = Ownership::Borrowed;
        self
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.storage, Storage::Empty)
    }

    pub fn as_scalar(&self) -> Option<&VariantValue> {
        match &self.storage {
            Storage::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[VariantValue]> {
        match &self.storage {
            Storage::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Drops the payload if owned; a no-op for borrowed storage. For any `x`,
    /// `clear(copy(x))` and `clear(x)` leave the two instances in the same
    /// observable state because `copy` always yields an `Owned` value.
    pub fn clear(&mut self) {
        if self.ownership == Ownership::Owned {
            self.storage = Storage::Empty;
        }
    }
}

impl BinaryEncodable for Variant {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        match &self.storage {
            Storage::Empty => {
                enc.push(&[0u8]);
                Ok(())
            }
            Storage::Scalar(v) => {
                enc.push(&[type_id(v)]);
                encode_value(v, enc)
            }
            Storage::Array { dims, items } => {
                let mut flag = FLAG_ARRAY;
                if dims.is_some() {
                    flag |= FLAG_DIMENSIONS;
                }
                let tid = items.first().map(type_id).unwrap_or(0);
                enc.push(&[flag | (tid & TYPE_MASK)]);
                (items.len() as i32).encode(enc)?;
                for v in items {
                    encode_value(v, enc)?;
                }
                if let Some(dims) = dims {
                    (dims.len() as i32).encode(enc)?;
                    for d in dims {
                        d.encode(enc)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn byte_len(&self) -> usize {
        match &self.storage {
            Storage::Empty => 1,
            Storage::Scalar(v) => 1 + value_len(v),
            Storage::Array { dims, items } => {
                1 + 4
                    + items.iter().map(value_len).sum::<usize>()
                    + dims.as_ref().map_or(0, |d| 4 + d.len() * 4)
            }
        }
    }
}

impl BinaryDecodable for Variant {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let flag = u8::decode(dec)?;
        if flag == 0 {
            return Ok(Variant::empty());
        }
        let tid = flag & TYPE_MASK;
        let is_array = flag & FLAG_ARRAY != 0;
        let has_dims = flag & FLAG_DIMENSIONS != 0;

        if !is_array {
            let v = decode_value(tid, dec)?;
            return Ok(Variant::scalar(v));
        }

        let len = i32::decode(dec)?;
        if len < 0 {
            return Ok(Variant { storage: Storage::Array { dims: None, items: Vec::new() }, ownership: Ownership::Owned });
        }
        let len = len as u32;
        if len > dec.ctx.max_array_length {
            return Err(DecodeError::LengthExceedsContext);
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(decode_value(tid, dec)?);
        }
        let dims = if has_dims {
            let dim_len = i32::decode(dec)?;
            if dim_len < 0 {
                None
            } else {
                let mut dims = Vec::with_capacity(dim_len as usize);
                for _ in 0..dim_len {
                    dims.push(u32::decode(dec)?);
                }
                Some(dims)
            }
        } else {
            None
        };
        Ok(Variant { storage: Storage::Array { dims, items }, ownership: Ownership::Owned })
    }
}

fn encode_value(v: &VariantValue, enc: &mut Encoder) -> EncodeResult<()> {
    match v {
        VariantValue::Boolean(x) => x.encode(enc),
        VariantValue::Byte(x) => x.encode(enc),
        VariantValue::Int16(x) => x.encode(enc),
        VariantValue::UInt16(x) => x.encode(enc),
        VariantValue::Int32(x) => x.encode(enc),
        VariantValue::UInt32(x) => x.encode(enc),
        VariantValue::Int64(x) => x.encode(enc),
        VariantValue::UInt64(x) => x.encode(enc),
        VariantValue::Float(x) => x.encode(enc),
        VariantValue::Double(x) => x.encode(enc),
        VariantValue::String(x) => x.encode(enc),
        VariantValue::DateTime(x) => x.encode(enc),
        VariantValue::Guid(x) => x.encode(enc),
        VariantValue::ByteString(x) => x.encode(enc),
        VariantValue::LocalizedText(x) => x.encode(enc),
        VariantValue::QualifiedName(x) => x.encode(enc),
    }
}

fn value_len(v: &VariantValue) -> usize {
    match v {
        VariantValue::Boolean(_) | VariantValue::Byte(_) => 1,
        VariantValue::Int16(_) | VariantValue::UInt16(_) => 2,
        VariantValue::Int32(_) | VariantValue::UInt32(_) | VariantValue::Float(_) => 4,
        VariantValue::Int64(_) | VariantValue::UInt64(_) | VariantValue::Double(_) | VariantValue::DateTime(_) => 8,
        VariantValue::Guid(_) => 16,
        VariantValue::String(x) => x.byte_len(),
        VariantValue::ByteString(x) => x.byte_len(),
        VariantValue::LocalizedText(x) => x.byte_len(),
        VariantValue::QualifiedName(x) => x.byte_len(),
    }
}

fn decode_value(tid: u8, dec: &mut Decoder) -> DecodeResult<VariantValue> {
    Ok(match tid {
        1 => VariantValue::Boolean(bool::decode(dec)?),
        3 => VariantValue::Byte(u8::decode(dec)?),
        4 => VariantValue::Int16(i16::decode(dec)?),
        5 => VariantValue::UInt16(u16::decode(dec)?),
        6 => VariantValue::Int32(i32::decode(dec)?),
        7 => VariantValue::UInt32(u32::decode(dec)?),
        8 => VariantValue::Int64(i64::decode(dec)?),
        9 => VariantValue::UInt64(u64::decode(dec)?),
        10 => VariantValue::Float(f32::decode(dec)?),
        11 => VariantValue::Double(f64::decode(dec)?),
        12 => VariantValue::String(UaString::decode(dec)?),
        13 => VariantValue::DateTime(DateTime::decode(dec)?),
        14 => VariantValue::Guid(Guid::decode(dec)?),
        15 => VariantValue::ByteString(ByteString::decode(dec)?),
        20 => VariantValue::QualifiedName(QualifiedName::decode(dec)?),
        21 => VariantValue::LocalizedText(LocalizedText::decode(dec)?),
        _ => return Err(DecodeError::InvalidEncodingByte),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;

    #[test]
    fn array_of_strings_roundtrips() {
        let ctx = DecodingContext::default();
        let v = Variant::array(vec![
            VariantValue::String(UaString::from("hello")),
            VariantValue::String(UaString::from("world")),
            VariantValue::String(UaString::from("foo")),
        ]);
        let mut enc = Encoder::new();
        v.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(bytes[0], FLAG_ARRAY | 12);
        assert_eq!(&bytes[1..5], &3i32.to_le_bytes());
        let mut dec = Decoder::new(&bytes, &ctx);
        let decoded = Variant::decode(&mut dec).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn clear_on_borrowed_is_noop() {
        let mut v = Variant::scalar(VariantValue::UInt32(7)).borrowed();
        v.clear();
        assert!(!v.is_empty());
    }

    #[test]
    fn clear_on_owned_empties() {
        let mut v = Variant::scalar(VariantValue::UInt32(7));
        v.clear();
        assert!(v.is_empty());
    }

    #[test]
    fn clear_of_copy_matches_clear_of_original() {
        let mut original = Variant::scalar(VariantValue::UInt32(7));
        let mut copy = original.clone();
        original.clear();
        copy.clear();
        assert_eq!(original, copy);
    }
}
