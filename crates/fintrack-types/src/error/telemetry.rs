//! Telemetry delivery errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while shipping a log batch. Never surfaced to users;
/// the pipeline reports them on the console sink and drops the batch.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum TelemetryError {
    /// The batch request could not be sent
    #[error("Failed to send {entries} log entries: {message}")]
    DeliveryFailed {
        /// Number of entries in the dropped batch
        entries: usize,
        /// Transport failure description
        message: String,
    },

    /// The ingestion endpoint answered with a non-success status
    #[error("Log ingestion rejected batch ({status})")]
    Rejected {
        /// HTTP status code
        status: u16,
    },
}
