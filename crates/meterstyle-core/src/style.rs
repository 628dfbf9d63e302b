//! Style document parsing.
//!
//! A style document is JSON in any of these shapes:
//! - a single element object: `{"name": "Caption", "value": "..."}`
//! - an array of element objects
//! - a page object with an `"element"` array
//!
//! Parsing is best-effort. Objects that cannot target an element are
//! skipped and a document that is not JSON yields no assignments.

use serde_json::{Map, Value};
use tracing::warn;

use crate::element::ElementKind;

/// Attribute assignments for one named element.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleAssignment {
    /// Target element name.
    pub name: String,
    /// Declared element type, if the document names one.
    pub kind: Option<ElementKind>,
    /// Every member of the object other than `name` and `type`.
    pub attributes: Map<String, Value>,
}

impl StyleAssignment {
    /// Build an assignment from an element object.
    ///
    /// Returns `None` when the object has no string `name`, or declares a
    /// `type` that is not one of the known element kinds.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let name = object.get("name")?.as_str()?.to_string();
        let kind = match object.get("type") {
            None | Some(Value::Null) => None,
            Some(tag) => Some(ElementKind::parse(tag.as_str()?)?),
        };
        let attributes = object
            .iter()
            .filter(|(k, _)| k.as_str() != "name" && k.as_str() != "type")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self {
            name,
            kind,
            attributes,
        })
    }
}

/// Parse the raw contents of a style document into assignments, in
/// document order.
pub fn parse_style_document(content: &[u8]) -> Vec<StyleAssignment> {
    let document: Value = match serde_json::from_slice(content) {
        Ok(document) => document,
        Err(e) => {
            warn!("Style document is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let objects: Vec<&Value> = match &document {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("element") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![&document],
        },
        _ => {
            warn!("Style document must be an object or an array");
            return Vec::new();
        }
    };

    objects
        .into_iter()
        .filter_map(|item| {
            let assignment = item.as_object().and_then(StyleAssignment::from_object);
            if assignment.is_none() {
                warn!("Skipping style entry without a usable name or type: {}", item);
            }
            assignment
        })
        .collect()
}
