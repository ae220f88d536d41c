//! The Things Network (TTN v3) downlink client
//!
//! Pushes plant-type downlinks into the TTN Application Server queue:
//! 1. Build `{base}/api/v3/as/applications/{app}/devices/{dev}/down/push`
//! 2. POST the `{"downlinks":[...]}` envelope with a bearer API key
//! 3. Report the HTTP status back to the caller (any status counts as a response)
//!
//! Reference: <https://www.thethingsindustries.com/docs/the-things-stack/concepts/downlink-queue/>

pub mod encoder;
pub mod types;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::TtnConfig;
use encoder::PlantTypePayload;
use types::DownlinkPush;

#[derive(Debug, Error)]
pub enum DownlinkError {
    #[error("invalid network server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("connection to network server failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// What the network server said about a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub status: StatusCode,
}

impl Delivery {
    /// Whether the network server accepted the downlink into its queue
    pub fn accepted(&self) -> bool {
        self.status.is_success()
    }
}

/// Somewhere a plant-type downlink can be pushed to
#[async_trait]
pub trait DownlinkSink: Send + Sync {
    async fn push(
        &self,
        device_id: &str,
        payload: PlantTypePayload,
    ) -> Result<Delivery, DownlinkError>;
}

/// HTTPS client for the TTN Application Server downlink push API
pub struct TtnClient {
    config: TtnConfig,
    base_url: Url,
    http: Client,
}

impl TtnClient {
    pub fn new(config: TtnConfig) -> Result<Self, DownlinkError> {
        let raw = config.base_url();
        let base_url = Url::parse(&raw).map_err(|e| DownlinkError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DownlinkError::InvalidUrl {
                url: raw,
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http = Client::builder().build().map_err(DownlinkError::Client)?;

        info!(
            "TTN client configured for application {} at {}",
            config.app_id, base_url
        );

        Ok(Self {
            config,
            base_url,
            http,
        })
    }

    /// Downlink push URL for one device
    ///
    /// The device id is pushed as a single path segment, so it is
    /// percent-encoded rather than allowed to alter the path.
    pub fn push_url(&self, device_id: &str) -> Result<Url, DownlinkError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DownlinkError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend([
                "api",
                "v3",
                "as",
                "applications",
                self.config.app_id.as_str(),
                "devices",
                device_id,
                "down",
                "push",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl DownlinkSink for TtnClient {
    async fn push(
        &self,
        device_id: &str,
        payload: PlantTypePayload,
    ) -> Result<Delivery, DownlinkError> {
        let url = self.push_url(device_id)?;
        let body = DownlinkPush::plant_type(payload);

        info!(
            device_id = %device_id,
            plant_type = payload.byte(),
            "TTN: sending downlink (hex: {}, base64: {})",
            payload.to_hex(),
            payload.to_base64()
        );

        // `json` sets Content-Type and Content-Length
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            debug!(device_id = %device_id, "TTN error body: {}", body_text);
        }

        Ok(Delivery { status })
    }
}
