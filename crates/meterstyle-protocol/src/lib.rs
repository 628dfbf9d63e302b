//! # meterstyle-protocol
//!
//! Wire formats served by the portal.
//!
//! This crate defines the telemetry document, the page document and the
//! HTML rendering of the configuration page.

pub mod codec;
pub mod html;
pub mod messages;

pub use codec::{encode_page, encode_telemetry, CodecError};
pub use html::render_page;
pub use messages::*;
