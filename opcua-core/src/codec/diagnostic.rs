use super::primitives::UaString;
use super::{BinaryDecodable, BinaryEncodable, DecodeError, DecodeResult, Decoder, EncodeResult, Encoder};

const HAS_SYMBOLIC_ID: u8 = 0x01;
const HAS_NAMESPACE: u8 = 0x02;
const HAS_LOCALIZED_TEXT: u8 = 0x04;
const HAS_LOCALE: u8 = 0x08;
const HAS_ADDITIONAL_INFO: u8 = 0x10;
const HAS_INNER_STATUS: u8 = 0x20;
const HAS_INNER_DIAGNOSTIC: u8 = 0x40;

/// A recursive diagnostic record. `inner_diagnostic_info` is boxed and
/// decode-depth-capped (`ctx.max_decode_depth`) rather than relying on the
/// host call stack, so a hostile chain of nested records cannot blow it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosticInfo {
    pub symbolic_id: Option<i32>,
    pub namespace_uri: Option<i32>,
    pub locale: Option<i32>,
    pub localized_text: Option<i32>,
    pub additional_info: Option<UaString>,
    pub inner_status_code: Option<u32>,
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl DiagnosticInfo {
    fn mask(&self) -> u8 {
        let mut m = 0u8;
        if self.symbolic_id.is_some() {
            m |= HAS_SYMBOLIC_ID;
        }
        if self.namespace_uri.is_some() {
            m |= HAS_NAMESPACE;
        }
        if self.localized_text.is_some() {
            m |= HAS_LOCALIZED_TEXT;
        }
        if self.locale.is_some() {
            m |= HAS_LOCALE;
        }
        if self.additional_info.is_some() {
            m |= HAS_ADDITIONAL_INFO;
        }
        if self.inner_status_code.is_some() {
            m |= HAS_INNER_STATUS;
        }
        if self.inner_diagnostic_info.is_some() {
            m |= HAS_INNER_DIAGNOSTIC;
        }
        m
    }

    fn encode_at(&self, enc: &mut Encoder) -> EncodeResult<()> {
        let mask = self.mask();
        mask.encode(enc)?;
        if let Some(v) = self.symbolic_id {
            v.encode(enc)?;
        }
        if let Some(v) = self.namespace_uri {
            v.encode(enc)?;
        }
        if let Some(v) = self.locale {
            v.encode(enc)?;
        }
        if let Some(v) = self.localized_text {
            v.encode(enc)?;
        }
        if let Some(v) = &self.additional_info {
            v.encode(enc)?;
        }
        if let Some(v) = self.inner_status_code {
            v.encode(enc)?;
        }
        if let Some(inner) = &self.inner_diagnostic_info {
            inner.encode_at(enc)?;
        }
        Ok(())
    }

    fn decode_at(dec: &mut Decoder, depth: u8) -> DecodeResult<DiagnosticInfo> {
        if depth > dec.ctx.max_decode_depth {
            return Err(DecodeError::DepthExceeded);
        }
        let mask = u8::decode(dec)?;
        let mut d = DiagnosticInfo::default();
        if mask & HAS_SYMBOLIC_ID != 0 {
            d.symbolic_id = Some(i32::decode(dec)?);
        }
        if mask & HAS_NAMESPACE != 0 {
            d.namespace_uri = Some(i32::decode(dec)?);
        }
        if mask & HAS_LOCALE != 0 {
            d.locale = Some(i32::decode(dec)?);
        }
        if mask & HAS_LOCALIZED_TEXT != 0 {
            d.localized_text = Some(i32::decode(dec)?);
        }
        if mask & HAS_ADDITIONAL_INFO != 0 {
            d.additional_info = Some(UaString::decode(dec)?);
        }
        if mask & HAS_INNER_STATUS != 0 {
            d.inner_status_code = Some(u32::decode(dec)?);
        }
        if mask & HAS_INNER_DIAGNOSTIC != 0 {
            d.inner_diagnostic_info = Some(Box::new(DiagnosticInfo::decode_at(dec, depth + 1)?));
        }
        Ok(d)
    }
}

impl BinaryEncodable for DiagnosticInfo {
    fn encode(&self, enc: &mut Encoder) -> EncodeResult<()> {
        self.encode_at(enc)
    }

    fn byte_len(&self) -> usize {
        1 + self.symbolic_id.map_or(0, |_| 4)
            + self.namespace_uri.map_or(0, |_| 4)
            + self.locale.map_or(0, |_| 4)
            + self.localized_text.map_or(0, |_| 4)
            + self.additional_info.as_ref().map_or(0, |s| s.byte_len())
            + self.inner_status_code.map_or(0, |_| 4)
            + self.inner_diagnostic_info.as_ref().map_or(0, |d| d.byte_len())
    }
}

impl BinaryDecodable for DiagnosticInfo {
    fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        DiagnosticInfo::decode_at(dec, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::DecodingContext;

    #[test]
    fn nested_diagnostic_info_roundtrips() {
        let ctx = DecodingContext::default();
        let inner = DiagnosticInfo { symbolic_id: Some(2), ..Default::default() };
        let outer = DiagnosticInfo {
            symbolic_id: Some(1),
            inner_diagnostic_info: Some(Box::new(inner)),
            ..Default::default()
        };
        let mut enc = Encoder::new();
        outer.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(DiagnosticInfo::decode(&mut dec).unwrap(), outer);
    }

    #[test]
    fn depth_beyond_context_limit_is_rejected() {
        let mut ctx = DecodingContext::default();
        ctx.max_decode_depth = 1;
        let mut current = DiagnosticInfo { symbolic_id: Some(0), ..Default::default() };
        for i in 1..=3 {
            current = DiagnosticInfo {
                symbolic_id: Some(i),
                inner_diagnostic_info: Some(Box::new(current)),
                ..Default::default()
            };
        }
        let mut enc = Encoder::new();
        current.encode(&mut enc).unwrap();
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes, &ctx);
        assert_eq!(DiagnosticInfo::decode(&mut dec), Err(DecodeError::DepthExceeded));
    }
}
