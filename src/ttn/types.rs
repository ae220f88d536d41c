//! Types for the TTN Application Server downlink push API
//!
//! `POST /api/v3/as/applications/{app}/devices/{dev}/down/push`

use serde::{Deserialize, Serialize};

use super::encoder::PlantTypePayload;

/// Application port the plant firmware listens on for the plant type
pub const PLANT_TYPE_F_PORT: u8 = 1;

/// Body of a downlink push request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlinkPush {
    pub downlinks: Vec<ApplicationDownlink>,
}

/// One queued downlink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDownlink {
    /// FPort (application port)
    pub f_port: u8,
    /// Application payload (base64 encoded)
    pub frm_payload: String,
    pub priority: Priority,
}

/// Downlink scheduling priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Normal,
}

impl DownlinkPush {
    /// A push carrying one plant-type downlink at normal priority
    pub fn plant_type(payload: PlantTypePayload) -> Self {
        Self {
            downlinks: vec![ApplicationDownlink {
                f_port: PLANT_TYPE_F_PORT,
                frm_payload: payload.to_base64(),
                priority: Priority::Normal,
            }],
        }
    }
}
