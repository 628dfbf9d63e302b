//! Encoding of portal documents for HTTP responses.

use crate::messages::PageDocument;
use meterstyle_core::TelemetrySnapshot;
use thiserror::Error;

/// Errors that can occur during document encoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization failed.
    #[error("Failed to serialize document: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Encode a telemetry snapshot as the flat telemetry document.
pub fn encode_telemetry(snapshot: &TelemetrySnapshot) -> Result<String, CodecError> {
    serde_json::to_string(snapshot).map_err(CodecError::from)
}

/// Encode the configuration page as JSON.
pub fn encode_page(page: &PageDocument<'_>) -> Result<String, CodecError> {
    serde_json::to_string(page).map_err(CodecError::from)
}
