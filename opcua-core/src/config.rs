//! Server/channel configuration as a keyed map rather than a parallel
//! struct, so an unrecognized key is retained and visible to iteration —
//! only unused by the typed accessors below it.

use indexmap::IndexMap;

use crate::codec::{QualifiedName, UaString, Variant, VariantValue};

/// `QualifiedName`-keyed configuration values, preserving insertion order
/// for deterministic iteration (e.g. dumping the active configuration for
/// diagnostics).
#[derive(Default)]
pub struct Configuration {
    values: IndexMap<QualifiedName, Variant>,
}

impl Configuration {
    pub fn new() -> Configuration {
        Configuration { values: IndexMap::new() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Variant) {
        self.values.insert(qname(key), value);
    }

    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.values.get(&qname(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualifiedName, &Variant)> {
        self.values.iter()
    }

    fn uint32(&self, key: &str, default: u32) -> u32 {
        match self.get(key).and_then(Variant::as_scalar) {
            Some(VariantValue::UInt32(v)) => *v,
            _ => default,
        }
    }

    pub fn max_message_size(&self) -> u32 {
        self.uint32("MaxMessageSize", 16 << 20)
    }

    pub fn max_chunk_size(&self) -> u32 {
        self.uint32("MaxChunkSize", 64 * 1024)
    }

    pub fn max_chunk_count(&self) -> u32 {
        self.uint32("MaxChunkCount", 512)
    }

    pub fn max_array_length(&self) -> u32 {
        self.uint32("MaxArrayLength", 100_000)
    }

    pub fn max_string_length(&self) -> u32 {
        self.uint32("MaxStringLength", 1 << 20)
    }

    pub fn max_session_timeout_ms(&self) -> u32 {
        self.uint32("MaxSessionTimeout", 120_000)
    }

    pub fn max_subscription_lifetime_count(&self) -> u32 {
        self.uint32("MaxSubscriptionLifetimeCount", 10_000)
    }
}

fn qname(key: impl Into<String>) -> QualifiedName {
    QualifiedName { namespace_index: 0, name: UaString::from(key.into()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessor_falls_back_to_default_when_key_absent() {
        let config = Configuration::new();
        assert_eq!(config.max_chunk_size(), 64 * 1024);
    }

    #[test]
    fn typed_accessor_reads_configured_value() {
        let mut config = Configuration::new();
        config.set("MaxChunkSize", Variant::scalar(VariantValue::UInt32(8192)));
        assert_eq!(config.max_chunk_size(), 8192);
    }

    #[test]
    fn unrecognized_key_is_retained_for_iteration() {
        let mut config = Configuration::new();
        config.set("VendorSpecificKnob", Variant::scalar(VariantValue::Boolean(true)));
        assert_eq!(config.iter().count(), 1);
    }
}
