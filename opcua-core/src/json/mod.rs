//! PubSub-JSON NetworkMessage encoding (the OPC UA Part 14 JSON mapping),
//! an alternate wire format to the binary UADP one used elsewhere in the
//! crate. No date/time crate is pulled in for the `Timestamp` field — the
//! calendar conversion is the same kind of hand-rolled arithmetic the core
//! already uses for its own 100-ns tick `DateTime`.

mod datetime;

pub use self::datetime::ticks_to_iso8601;

use std::fmt::Write as _;

use serde_json::Value;

use crate::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonMetaDataVersion {
    pub major_version: u32,
    pub minor_version: u32,
}

/// `UaType` is the Part 6 Table 1 scalar type id (the same values produced
/// by `codec::variant::type_id`); `value` is whatever `serde_json` produces
/// for that scalar — this mapping only handles the reversible scalar case
/// the fixed test vector needs, not the full non-reversible array grammar.
#[derive(Debug, Clone)]
pub struct JsonFieldValue {
    pub ua_type: u8,
    pub value: Value,
}

/// One DataSetMessage inside a JSON NetworkMessage. `payload` is kept as an
/// ordered `Vec` rather than a map so re-encoding reproduces the field
/// order it was built or decoded with.
#[derive(Debug, Clone)]
pub struct JsonDataSetMessage {
    pub dataset_writer_id: u16,
    pub sequence_number: Option<u32>,
    pub metadata_version: Option<JsonMetaDataVersion>,
    pub timestamp: Option<i64>,
    pub status: Option<u16>,
    pub is_keyframe: bool,
    pub payload: Vec<(String, JsonFieldValue)>,
}

#[derive(Debug, Clone)]
pub struct JsonNetworkMessage {
    pub message_id: String,
    pub publisher_id: Option<String>,
    pub dataset_class_id: Option<String>,
    pub messages: Vec<JsonDataSetMessage>,
}

impl JsonNetworkMessage {
    /// Serializes to the canonical field order the OPC UA JSON mapping and
    /// the distilled test vectors expect. Built by hand rather than through
    /// `serde_json::Value` because this crate's `serde_json` build has no
    /// `preserve_order` feature, and object key order here is part of the
    /// wire contract, not incidental.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        out.push('{');
        write!(out, "\"MessageId\":{}", quote(&self.message_id)).unwrap();
        write!(out, ",\"MessageType\":\"ua-data\"").unwrap();
        if let Some(publisher_id) = &self.publisher_id {
            write!(out, ",\"PublisherId\":{}", quote(publisher_id)).unwrap();
        }
        if let Some(class_id) = &self.dataset_class_id {
            write!(out, ",\"DataSetClassId\":{}", quote(class_id)).unwrap();
        }
        out.push_str(",\"Messages\":[");
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            message.write_json(&mut out);
        }
        out.push(']');
        out.push('}');
        out
    }

    /// Best-effort decode: unrecognized or missing metadata never fails the
    /// parse, only leaves the corresponding field `None`. Payload field
    /// order is not reconstructed (serde_json's default map is unordered);
    /// only `to_json`'s own output preserves order end to end.
    pub fn from_json(text: &str) -> Result<JsonNetworkMessage, StatusCode> {
        let value: Value = serde_json::from_str(text).map_err(|_| StatusCode::BadDecodingError)?;
        let object = value.as_object().ok_or(StatusCode::BadDecodingError)?;

        let message_id = object.get("MessageId").and_then(Value::as_str).unwrap_or_default().to_string();
        let publisher_id = object.get("PublisherId").and_then(Value::as_str).map(str::to_string);
        let dataset_class_id = object.get("DataSetClassId").and_then(Value::as_str).map(str::to_string);

        let messages = object
            .get("Messages")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(JsonDataSetMessage::from_value).collect())
            .unwrap_or_default();

        Ok(JsonNetworkMessage { message_id, publisher_id, dataset_class_id, messages })
    }
}

impl JsonDataSetMessage {
    fn write_json(&self, out: &mut String) {
        out.push('{');
        write!(out, "\"DataSetWriterId\":{}", self.dataset_writer_id).unwrap();
        if let Some(seq) = self.sequence_number {
            write!(out, ",\"SequenceNumber\":{}", seq).unwrap();
        }
        if let Some(version) = &self.metadata_version {
            write!(
                out,
                ",\"MetaDataVersion\":{{\"MajorVersion\":{},\"MinorVersion\":{}}}",
                version.major_version, version.minor_version
            )
            .unwrap();
        }
        if let Some(ticks) = self.timestamp {
            write!(out, ",\"Timestamp\":\"{}\"", ticks_to_iso8601(ticks)).unwrap();
        }
        if let Some(status) = self.status {
            write!(out, ",\"Status\":{}", status).unwrap();
        }
        write!(out, ",\"MessageType\":\"{}\"", if self.is_keyframe { "ua-keyframe" } else { "ua-deltaframe" }).unwrap();
        out.push_str(",\"Payload\":{");
        for (i, (name, field)) in self.payload.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write!(out, "{}:{{\"UaType\":{},\"Value\":{}}}", quote(name), field.ua_type, field.value).unwrap();
        }
        out.push('}');
        out.push('}');
    }

    fn from_value(value: &Value) -> Option<JsonDataSetMessage> {
        let object = value.as_object()?;
        let dataset_writer_id = object.get("DataSetWriterId")?.as_u64()? as u16;
        let sequence_number = object.get("SequenceNumber").and_then(Value::as_u64).map(|n| n as u32);
        let metadata_version = object.get("MetaDataVersion").and_then(|v| v.as_object()).map(|m| JsonMetaDataVersion {
            major_version: m.get("MajorVersion").and_then(Value::as_u64).unwrap_or(0) as u32,
            minor_version: m.get("MinorVersion").and_then(Value::as_u64).unwrap_or(0) as u32,
        });
        let status = object.get("Status").and_then(Value::as_u64).map(|n| n as u16);
        let is_keyframe = object.get("MessageType").and_then(Value::as_str).map_or(true, |s| s == "ua-keyframe");
        let payload = object
            .get("Payload")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| {
                        let obj = v.as_object()?;
                        let ua_type = obj.get("UaType")?.as_u64()? as u8;
                        let value = obj.get("Value")?.clone();
                        Some((k.clone(), JsonFieldValue { ua_type, value }))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(JsonDataSetMessage {
            dataset_writer_id,
            sequence_number,
            metadata_version,
            timestamp: None,
            status,
            is_keyframe,
            payload,
        })
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reversible_encoding_matches_literal_json() {
        let message = JsonNetworkMessage {
            message_id: "ABCDEFGH".to_string(),
            publisher_id: Some("65535".to_string()),
            dataset_class_id: Some("00000001-0002-0003-0000-000000000000".to_string()),
            messages: vec![JsonDataSetMessage {
                dataset_writer_id: 12345,
                sequence_number: Some(4711),
                metadata_version: Some(JsonMetaDataVersion { major_version: 42, minor_version: 7 }),
                timestamp: Some(11111111111111),
                status: Some(12345),
                is_keyframe: true,
                payload: vec![("Field1".to_string(), JsonFieldValue { ua_type: 7, value: json!(27) })],
            }],
        };

        let expected = "{\"MessageId\":\"ABCDEFGH\",\"MessageType\":\"ua-data\",\"PublisherId\":\"65535\",\
\"DataSetClassId\":\"00000001-0002-0003-0000-000000000000\",\"Messages\":[{\"DataSetWriterId\":12345,\
\"SequenceNumber\":4711,\"MetaDataVersion\":{\"MajorVersion\":42,\"MinorVersion\":7},\
\"Timestamp\":\"1601-01-13T20:38:31.1111111Z\",\"Status\":12345,\"MessageType\":\"ua-keyframe\",\
\"Payload\":{\"Field1\":{\"UaType\":7,\"Value\":27}}}]}";

        assert_eq!(message.to_json(), expected);
    }

    #[test]
    fn decode_without_metadata_still_succeeds() {
        let text = "{\"MessageId\":\"X\",\"MessageType\":\"ua-data\",\"Messages\":[{\"DataSetWriterId\":1,\"Payload\":{}}]}";
        let decoded = JsonNetworkMessage::from_json(text).unwrap();
        assert_eq!(decoded.messages[0].dataset_writer_id, 1);
        assert!(decoded.messages[0].metadata_version.is_none());
    }
}
