//! Downlink payload encoder
//!
//! The plant type travels as a single FRMPayload byte on FPort 1.
//! TTN expects `frm_payload` as standard (padded) base64, so a plant
//! type of 2 goes out as `"Ag=="`.
//!
//! Values that do not fit in one unsigned byte are refused rather than
//! truncated or wrapped.

use base64::Engine;
use thiserror::Error;

/// Errors raised while turning a plant type into payload bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("plant type {0} does not fit in a single byte (0-255)")]
    OutOfRange(i64),
}

/// A plant type that is known to fit the one-byte downlink payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantTypePayload(u8);

impl TryFrom<i64> for PlantTypePayload {
    type Error = PayloadError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(PlantTypePayload)
            .map_err(|_| PayloadError::OutOfRange(value))
    }
}

impl From<u8> for PlantTypePayload {
    fn from(byte: u8) -> Self {
        PlantTypePayload(byte)
    }
}

impl PlantTypePayload {
    /// The raw FRMPayload byte
    pub fn byte(self) -> u8 {
        self.0
    }

    /// Raw payload bytes (always exactly one)
    pub fn to_bytes(self) -> [u8; 1] {
        [self.0]
    }

    /// Base64 form used in the `frm_payload` field
    pub fn to_base64(self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    /// Hex form, for logs
    pub fn to_hex(self) -> String {
        hex::encode(self.to_bytes())
    }
}
