use byteorder::{ByteOrder, LittleEndian};

use super::context::DecodingContext;
use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeResult, Encoder};

macro_rules! impl_int {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl BinaryEncodable for $ty {
            fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
                let mut buf = [0u8; $size];
                LittleEndian::$write(&mut buf, *self);
                enc.push(&buf);
                Ok(())
            }

            fn byte_len(&self) -> usize {
                $size
            }
        }

        impl BinaryDecodable for $ty {
            fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
                let bytes = dec.take($size)?;
                Ok(LittleEndian::$read(bytes))
            }
        }
    };
}

impl_int!(u16, 2, read_u16, write_u16);
impl_int!(i16, 2, read_i16, write_i16);
impl_int!(u32, 4, read_u32, write_u32);
impl_int!(i32, 4, read_i32, write_i32);
impl_int!(u64, 8, read_u64, write_u64);
impl_int!(i64, 8, read_i64, write_i64);
impl_int!(f32, 4, read_f32, write_f32);
impl_int!(f64, 8, read_f64, write_f64);

impl BinaryEncodable for u8 {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        enc.push(&[*self]);
        Ok(())
    }

    fn byte_len(&self) -> usize {
        1
    }
}

impl BinaryDecodable for u8 {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        Ok(dec.take(1)?[0])
    }
}

impl BinaryEncodable for bool {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        enc.push(&[if *self { 1 } else { 0 }]);
        Ok(())
    }

    fn byte_len(&self) -> usize {
        1
    }
}

impl BinaryDecodable for bool {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        Ok(dec.take(1)?[0] != 0)
    }
}

/// 100-ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(pub i64);

impl BinaryEncodable for DateTime {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        self.0.encode(enc)
    }

    fn byte_len(&self) -> usize {
        8
    }
}

impl BinaryDecodable for DateTime {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        Ok(DateTime(i64::decode(dec)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl BinaryEncodable for Guid {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        enc.push(&self.0);
        Ok(())
    }

    fn byte_len(&self) -> usize {
        16
    }
}

impl BinaryDecodable for Guid {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        Ok(Guid(dec.take_array::<16>()?))
    }
}

/// Length-prefixed UTF-8 string. A length of `-1` is the null string; it
/// round-trips to `None` and must be re-encoded as `-1`, never as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UaString(pub Option<String>);

impl UaString {
    pub fn null() -> UaString {
        UaString(None)
    }

    pub fn from(s: impl Into<String>) -> UaString {
        UaString(Some(s.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl BinaryEncodable for UaString {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        match &self.0 {
            None => (-1i32).encode(enc),
            Some(s) => {
                (s.len() as i32).encode(enc)?;
                enc.push(s.as_bytes());
                Ok(())
            }
        }
    }

    fn byte_len(&self) -> usize {
        4 + self.0.as_ref().map_or(0, |s| s.len())
    }
}

impl BinaryDecodable for UaString {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let len = i32::decode(dec)?;
        if len < 0 {
            return Ok(UaString(None));
        }
        let len = len as u32;
        if len > dec.ctx.max_string_length {
            return Err(DecodeError::LengthExceedsContext);
        }
        let bytes = dec.take(len as usize)?;
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::Overflow)?;
        Ok(UaString(Some(s)))
    }
}

/// Length-prefixed opaque byte string; same null/empty rules as `UaString`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteString(pub Option<Vec<u8>>);

impl ByteString {
    pub fn null() -> ByteString {
        ByteString(None)
    }

    pub fn from(bytes: impl Into<Vec<u8>>) -> ByteString {
        ByteString(Some(bytes.into()))
    }
}

impl BinaryEncodable for ByteString {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        match &self.0 {
            None => (-1i32).encode(enc),
            Some(b) => {
                (b.len() as i32).encode(enc)?;
                enc.push(b);
                Ok(())
            }
        }
    }

    fn byte_len(&self) -> usize {
        4 + self.0.as_ref().map_or(0, |b| b.len())
    }
}

impl BinaryDecodable for ByteString {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let len = i32::decode(dec)?;
        if len < 0 {
            return Ok(ByteString(None));
        }
        let len = len as u32;
        if len > dec.ctx.max_string_length {
            return Err(DecodeError::LengthExceedsContext);
        }
        Ok(ByteString(Some(dec.take(len as usize)?.to_vec())))
    }
}

/// Namespace index + name, per Part 3 §8.3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: UaString,
}

impl BinaryEncodable for QualifiedName {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        self.namespace_index.encode(enc)?;
        self.name.encode(enc)
    }

    fn byte_len(&self) -> usize {
        2 + self.name.byte_len()
    }
}

impl BinaryDecodable for QualifiedName {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        Ok(QualifiedName {
            namespace_index: u16::decode(dec)?,
            name: UaString::decode(dec)?,
        })
    }
}

/// Locale + text pair; either half may be null independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedText {
    pub locale: UaString,
    pub text: UaString,
}

impl BinaryEncodable for LocalizedText {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        // bit 0 = locale present, bit 1 = text present
        let mut mask = 0u8;
        if self.locale.0.is_some() {
            mask |= 0x01;
        }
        if self.text.0.is_some() {
            mask |= 0x02;
        }
        mask.encode(enc)?;
        if self.locale.0.is_some() {
            self.locale.encode(enc)?;
        }
        if self.text.0.is_some() {
            self.text.encode(enc)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        1 + self.locale.0.as_ref().map_or(0, |_| self.locale.byte_len())
            + self.text.0.as_ref().map_or(0, |_| self.text.byte_len())
    }
}

impl BinaryDecodable for LocalizedText {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let mask = u8::decode(dec)?;
        let locale = if mask & 0x01 != 0 {
            UaString::decode(dec)?
        } else {
            UaString::null()
        };
        let text = if mask & 0x02 != 0 {
            UaString::decode(dec)?
        } else {
            UaString::null()
        };
        Ok(LocalizedText { locale, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_null_roundtrips_to_null() {
        let ctx = DecodingContext::default();
        let mut enc = Encoder::new();
        UaString::null().encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(bytes, (-1i32).to_le_bytes());
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(UaString::decode(&mut dec).unwrap(), UaString::null());
    }

    #[test]
    fn string_empty_roundtrips_to_empty() {
        let ctx = DecodingContext::default();
        let mut enc = Encoder::new();
        UaString::from("").encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(UaString::decode(&mut dec).unwrap(), UaString::from(""));
    }

    #[test]
    fn integers_roundtrip() {
        let ctx = DecodingContext::default();
        let mut enc = Encoder::new();
        1234u32.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(bytes, [0xD2, 0x04, 0x00, 0x00]);
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(u32::decode(&mut dec).unwrap(), 1234u32);
    }
}
