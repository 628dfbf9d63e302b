//! Portal message types.
//!
//! The telemetry document is [`TelemetrySnapshot`] itself: a flat object
//! whose keys are the metrics that were available. The page document
//! describes the configuration page in the same element format style
//! documents are written in, so a saved page is also a valid style.

use meterstyle_core::{ElementTree, TelemetrySnapshot};
use serde::Serialize;

/// The configuration page as a JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct PageDocument<'a> {
    pub title: &'a str,
    pub uri: &'a str,
    pub element: &'a ElementTree,
}

impl<'a> PageDocument<'a> {
    pub fn new(title: &'a str, uri: &'a str, element: &'a ElementTree) -> Self {
        Self {
            title,
            uri,
            element,
        }
    }
}

/// Body returned when a device operation fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
