use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeResult, Encoder};

/// Arrays are a signed 32-bit length followed by that many elements;
/// length `-1` denotes a null array and decodes to an empty `Vec` (the
/// null/empty distinction is not preserved for structured-type array
/// fields — only `UaString`/`ByteString` carry it, per the wire rules).
impl<T: BinaryEncodable> BinaryEncodable for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        (self.len() as i32).encode(enc)?;
        for item in self {
            item.encode(enc)?;
        }
        Ok(())
    }

    fn byte_len(&self) -> usize {
        4 + self.iter().map(BinaryEncodable::byte_len).sum::<usize>()
    }
}

impl<T: BinaryDecodable> BinaryDecodable for Vec<T> {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let len = i32::decode(dec)?;
        if len < 0 {
            return Ok(Vec::new());
        }
        let len = len as u32;
        if len > dec.ctx.max_array_length {
            return Err(DecodeError::LengthExceedsContext);
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(T::decode(dec)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;

    #[test]
    fn array_of_u32_roundtrips() {
        let ctx = DecodingContext::default();
        let values: Vec<u32> = vec![1, 2, 3, 4, 5];
        let mut enc = Encoder::new();
        values.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(Vec::<u32>::decode(&mut dec).unwrap(), values);
    }

    #[test]
    fn array_length_over_context_cap_is_rejected() {
        let mut ctx = DecodingContext::default();
        ctx.max_array_length = 2;
        let bytes = 5i32.to_le_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(Vec::<u32>::decode(&mut dec), Err(DecodeError::LengthExceedsContext));
    }
}
