//! Plant-type extraction
//!
//! Exporters deliver the "Type" property in one of two shapes:
//!
//! - Properties Array: `"properties": [{"name": "Type", "value": "2"}, ...]`
//! - Desired Object:   `"properties": {"desired": {"Type": 2}}`
//!
//! Each shape has its own extractor. They are tried in order and the
//! first one that recognizes the shape wins.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::types::{ExtractedSetting, InboundMessage};

/// Which payload shape the plant type was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    PropertiesArray,
    DesiredObject,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingSource::PropertiesArray => write!(f, "Properties Array"),
            SettingSource::DesiredObject => write!(f, "Desired Object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlantTypeError {
    #[error("plant type {0} is not a base-10 integer")]
    NotNumeric(String),
    #[error("plant type {0} is not a whole number")]
    Fractional(f64),
}

/// Looks for the plant type in one payload shape
pub type Extractor = fn(&Value) -> Option<(&Value, SettingSource)>;

/// Extractors in priority order
pub const EXTRACTORS: [Extractor; 2] = [from_properties_array, from_desired_object];

/// `properties: [{name: "Type", value: ...}]`
pub fn from_properties_array(properties: &Value) -> Option<(&Value, SettingSource)> {
    properties
        .as_array()?
        .iter()
        .find(|item| item.get("name").and_then(Value::as_str) == Some("Type"))?
        .get("value")
        .map(|value| (value, SettingSource::PropertiesArray))
}

/// `properties: {desired: {Type: ...}}`
pub fn from_desired_object(properties: &Value) -> Option<(&Value, SettingSource)> {
    properties
        .get("desired")?
        .get("Type")
        .map(|value| (value, SettingSource::DesiredObject))
}

/// Run the extractors over a `properties` value
///
/// A `null` plant type counts as not found.
pub fn find_plant_type(properties: &Value) -> Option<(&Value, SettingSource)> {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(properties))
        .filter(|(value, _)| !value.is_null())
}

/// Parse the leading base-10 integer of a string
///
/// Leading whitespace and one sign are allowed; anything after the digits
/// is ignored, so `"2.0"` and `"12px"` read as 2 and 12. Returns `None`
/// when no digit follows. Overlong digit runs saturate so the byte encoder
/// reports them as out of range.
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Turn a raw plant type into an integer
///
/// Strings are read by their leading base-10 integer; numbers must be whole.
pub fn coerce_plant_type(value: &Value) -> Result<i64, PlantTypeError> {
    match value {
        Value::String(text) => parse_leading_int(text)
            .ok_or_else(|| PlantTypeError::NotNumeric(format!("{:?}", text))),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(int);
            }
            match number.as_f64() {
                Some(float) if float.fract() == 0.0 => Ok(float as i64),
                Some(float) => Err(PlantTypeError::Fractional(float)),
                None => Err(PlantTypeError::NotNumeric(number.to_string())),
            }
        }
        other => Err(PlantTypeError::NotNumeric(other.to_string())),
    }
}

impl ExtractedSetting {
    /// Pull a dispatchable setting out of a message
    ///
    /// Returns `Ok(None)` when the message has no plant type or no device id.
    /// Coercion only runs on messages that are otherwise dispatchable.
    pub fn from_message(message: &InboundMessage) -> Result<Option<Self>, PlantTypeError> {
        let Some((raw, source)) = message.properties.as_ref().and_then(find_plant_type) else {
            return Ok(None);
        };
        let Some(device_id) = &message.device_id else {
            return Ok(None);
        };

        Ok(Some(Self {
            device_id: device_id.clone(),
            plant_type: coerce_plant_type(raw)?,
            source,
        }))
    }
}
