//! Inbound telemetry shapes
//!
//! IoT Central / IoT Hub exports post either one message object or an
//! array of them. Message bodies are heterogeneous, so they are kept as
//! `serde_json::Value` and only the fields the relay needs are pulled out.

use serde_json::Value;

use super::extract::SettingSource;
use super::RelayError;

/// One telemetry notification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundMessage {
    /// `deviceId`, when it is a non-empty string or a non-zero number
    pub device_id: Option<String>,
    /// `properties`, in whatever shape the exporter sent
    pub properties: Option<Value>,
}

impl From<Value> for InboundMessage {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };

        let device_id = match fields.remove("deviceId") {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            Some(Value::Number(id)) if id.as_f64() != Some(0.0) => Some(id.to_string()),
            _ => None,
        };
        let properties = fields.remove("properties").filter(|p| !p.is_null());

        Self {
            device_id,
            properties,
        }
    }
}

/// A request body normalized to a sequence of messages
#[derive(Debug, Clone, PartialEq)]
pub struct InboundBatch {
    messages: Vec<InboundMessage>,
}

impl InboundBatch {
    /// Parse a raw request body
    ///
    /// Returns `Ok(None)` when there is no data: an empty body or JSON `null`.
    /// A single object is treated as a one-element batch.
    pub fn parse(body: &[u8]) -> Result<Option<Self>, RelayError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let value: Value = serde_json::from_slice(body).map_err(RelayError::MalformedBody)?;
        Self::from_value(value)
    }

    /// Normalize an already-parsed body
    ///
    /// A `null` element inside an array has no fields to read and faults
    /// the whole batch; other non-object elements become empty messages.
    pub fn from_value(value: Value) -> Result<Option<Self>, RelayError> {
        let messages = match value {
            Value::Null => return Ok(None),
            Value::Array(items) => {
                if let Some(index) = items.iter().position(Value::is_null) {
                    return Err(RelayError::NullMessage { index });
                }
                items.into_iter().map(InboundMessage::from).collect()
            }
            single => vec![InboundMessage::from(single)],
        };
        Ok(Some(Self { messages }))
    }

    pub fn messages(&self) -> &[InboundMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// A plant type ready to be pushed to one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSetting {
    pub device_id: String,
    pub plant_type: i64,
    pub source: SettingSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_and_null_bodies_are_no_data() {
        assert_eq!(InboundBatch::parse(b"").unwrap(), None);
        assert_eq!(InboundBatch::parse(b"  \n").unwrap(), None);
        assert_eq!(InboundBatch::parse(b"null").unwrap(), None);
    }

    #[test]
    fn test_single_object_equals_one_element_array() {
        let single = br#"{"deviceId":"dev1","properties":[{"name":"Type","value":"2"}]}"#;
        let array = br#"[{"deviceId":"dev1","properties":[{"name":"Type","value":"2"}]}]"#;

        let a = InboundBatch::parse(single).unwrap().unwrap();
        let b = InboundBatch::parse(array).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            InboundBatch::parse(b"{not json"),
            Err(RelayError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_message_fields() {
        let msg = InboundMessage::from(json!({
            "deviceId": "plant-7",
            "properties": {"desired": {"Type": 3}},
            "enqueuedTime": "2026-03-01T10:00:00Z"
        }));
        assert_eq!(msg.device_id.as_deref(), Some("plant-7"));
        assert_eq!(msg.properties, Some(json!({"desired": {"Type": 3}})));
    }

    #[test]
    fn test_unusable_device_ids_are_dropped() {
        assert_eq!(InboundMessage::from(json!({"deviceId": ""})).device_id, None);
        assert_eq!(InboundMessage::from(json!({"deviceId": 0})).device_id, None);
        assert_eq!(InboundMessage::from(json!({"deviceId": true})).device_id, None);
        assert_eq!(InboundMessage::from(json!({"deviceId": null})).device_id, None);
    }

    #[test]
    fn test_numeric_device_id_is_stringified() {
        let msg = InboundMessage::from(json!({"deviceId": 42}));
        assert_eq!(msg.device_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_non_object_messages_are_empty() {
        let batch = InboundBatch::from_value(json!([1, "x", true]))
            .unwrap()
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert!(batch.messages().iter().all(|m| *m == InboundMessage::default()));
    }

    #[test]
    fn test_null_element_faults_batch() {
        let result = InboundBatch::from_value(json!([{"deviceId": "a"}, null]));
        assert!(matches!(result, Err(RelayError::NullMessage { index: 1 })));
        assert!(matches!(
            InboundBatch::parse(b"[null]"),
            Err(RelayError::NullMessage { index: 0 })
        ));
    }

    #[test]
    fn test_null_properties_are_absent() {
        let msg = InboundMessage::from(json!({"deviceId": "d", "properties": null}));
        assert_eq!(msg.properties, None);
    }
}
