//! # meterstyle-core
//!
//! Core model for the style portal and the power meter endpoint.
//!
//! This crate provides:
//! - The element tree behind the configuration page (text, radio, submit)
//! - The document store contract and the style catalog built from it
//! - Style document parsing and merging into the element tree
//! - The portal session that drives a page load
//! - Telemetry assembly from a meter device
//! - Portal settings and their storage
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! so the same logic runs behind the Linux server and on a microcontroller.

pub mod catalog;
pub mod config;
pub mod element;
pub mod session;
pub mod style;
pub mod telemetry;

pub use catalog::{DirStore, DocumentStore, MemoryDocumentStore, StoreError, StyleCatalog};
pub use config::{
    ConfigError, ConfigStorage, FileConfigStorage, MeterSettings, PortalSettings,
};
pub use element::{
    Arrange, Element, ElementError, ElementKind, ElementTree, Posterior, Radio, Submit, Text,
};
pub use session::{PageLoad, PortalSession};
pub use style::{parse_style_document, StyleAssignment};
pub use telemetry::{MeterDevice, MeterError, Metric, TelemetryAssembler, TelemetrySnapshot};
