//! Downlink relay
//!
//! Turns one inbound telemetry batch into plant-type downlinks:
//! 1. Normalize the body to a sequence of messages
//! 2. For each message, find the plant type and device id
//! 3. Encode the plant type as one byte and push it to the device
//!
//! Messages are handled strictly one after another. Per-message misses
//! and network failures are logged and counted but never fail the batch;
//! the caller only ever sees "No data" (400), "Processed" or "Error Handled".

pub mod extract;
pub mod types;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::ttn::encoder::{PayloadError, PlantTypePayload};
use crate::ttn::DownlinkSink;
use extract::PlantTypeError;
use types::{ExtractedSetting, InboundBatch, InboundMessage};

pub const BODY_NO_DATA: &str = "No data";
pub const BODY_PROCESSED: &str = "Processed";
pub const BODY_ERROR_HANDLED: &str = "Error Handled";

/// A fault that aborts the whole batch
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("batch element {index} is null")]
    NullMessage { index: usize },

    #[error("device {device_id}: {source}")]
    PlantType {
        device_id: String,
        #[source]
        source: PlantTypeError,
    },

    #[error("device {device_id}: {source}")]
    Payload {
        device_id: String,
        #[source]
        source: PayloadError,
    },
}

/// Per-batch tally of what happened to each message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    /// Accepted by the network server (2xx)
    pub delivered: usize,
    /// Network server answered with a non-2xx status
    pub rejected: usize,
    /// Network server could not be reached
    pub failed: usize,
    /// No plant type or no device id
    pub skipped: usize,
}

/// Result of handling one request
#[derive(Debug)]
pub enum RelayOutcome {
    NoData,
    Processed(BatchReport),
    Faulted(RelayError),
}

impl RelayOutcome {
    /// HTTP status reported to the caller
    ///
    /// Faults are acknowledged as success so the exporter does not retry.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayOutcome::NoData => 400,
            RelayOutcome::Processed(_) | RelayOutcome::Faulted(_) => 200,
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            RelayOutcome::NoData => BODY_NO_DATA,
            RelayOutcome::Processed(_) => BODY_PROCESSED,
            RelayOutcome::Faulted(_) => BODY_ERROR_HANDLED,
        }
    }
}

pub struct DownlinkRelay<S> {
    sink: S,
}

impl<S: DownlinkSink> DownlinkRelay<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Handle one request body
    pub async fn handle(&self, body: &[u8]) -> RelayOutcome {
        match self.process(body).await {
            Ok(None) => {
                warn!("Request carried no data");
                RelayOutcome::NoData
            }
            Ok(Some(report)) => {
                info!(
                    received = report.received,
                    delivered = report.delivered,
                    rejected = report.rejected,
                    failed = report.failed,
                    skipped = report.skipped,
                    "Batch processed"
                );
                RelayOutcome::Processed(report)
            }
            Err(e) => {
                error!(error = %e, "CRITICAL ERROR: batch aborted");
                RelayOutcome::Faulted(e)
            }
        }
    }

    async fn process(&self, body: &[u8]) -> Result<Option<BatchReport>, RelayError> {
        let Some(batch) = InboundBatch::parse(body)? else {
            return Ok(None);
        };

        let mut report = BatchReport {
            received: batch.len(),
            ..BatchReport::default()
        };
        for message in batch.messages() {
            self.relay_message(message, &mut report).await?;
        }
        Ok(Some(report))
    }

    async fn relay_message(
        &self,
        message: &InboundMessage,
        report: &mut BatchReport,
    ) -> Result<(), RelayError> {
        let device = message.device_id.as_deref().unwrap_or("<none>");

        let setting = ExtractedSetting::from_message(message).map_err(|source| {
            RelayError::PlantType {
                device_id: device.to_string(),
                source,
            }
        })?;

        let Some(setting) = setting else {
            warn!(device_id = %device, "No 'Type' found for device, skipping");
            if let Some(properties) = &message.properties {
                info!(device_id = %device, "Properties content: {}", properties);
            }
            report.skipped += 1;
            return Ok(());
        };

        info!(
            device_id = %setting.device_id,
            source = %setting.source,
            "Found plant type {}",
            setting.plant_type
        );

        let payload =
            PlantTypePayload::try_from(setting.plant_type).map_err(|source| RelayError::Payload {
                device_id: setting.device_id.clone(),
                source,
            })?;

        match self.sink.push(&setting.device_id, payload).await {
            Ok(delivery) if delivery.accepted() => {
                info!(device_id = %setting.device_id, "TTN response code: {}", delivery.status);
                report.delivered += 1;
            }
            Ok(delivery) => {
                warn!(device_id = %setting.device_id, "TTN response code: {}", delivery.status);
                report.rejected += 1;
            }
            Err(e) => {
                error!(device_id = %setting.device_id, error = %e, "TTN connection error");
                report.failed += 1;
            }
        }
        Ok(())
    }
}
