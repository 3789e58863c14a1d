/// Bounds a decode/encode operation: namespace mapping, extension type
/// lookup, and the size limits negotiated for the channel.
pub struct DecodingContext {
    pub max_array_length: u32,
    pub max_string_length: u32,
    pub max_message_size: u32,
    pub max_decode_depth: u8,
}

impl Default for DecodingContext {
    fn default() -> DecodingContext {
        DecodingContext {
            max_array_length: 100_000,
            max_string_length: 1 << 20,
            max_message_size: 16 << 20,
            max_decode_depth: 3,
        }
    }
}

impl DecodingContext {
    pub fn unbounded() -> DecodingContext {
        DecodingContext {
            max_array_length: u32::MAX,
            max_string_length: u32::MAX,
            max_message_size: u32::MAX,
            max_decode_depth: 3,
        }
    }
}
