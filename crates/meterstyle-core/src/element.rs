//! Element tree behind the configuration page.
//!
//! The tree holds a fixed set of named elements declared at startup. Its
//! shape never changes at runtime: style documents only overwrite
//! attributes of elements that already exist, and the radio element's
//! option list is replaced wholesale by the catalog.
//!
//! Elements serialize in the same object format style documents use:
//!
//! ```json
//! {"name": "Caption", "type": "ACText", "value": "Hello, world", "style": "color:tomato"}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::style::StyleAssignment;

/// Name of the display element on the portal page.
pub const CAPTION: &str = "Caption";
/// Name of the style selector on the portal page.
pub const STYLES: &str = "Styles";
/// Name of the apply button on the portal page.
pub const APPLY: &str = "Apply";

/// Errors raised while building an element tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElementError {
    /// Two elements were declared with the same name.
    #[error("Duplicate element name: {0}")]
    DuplicateName(String),
}

/// The capability an element provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Display text.
    Text,
    /// Single-select list.
    Radio,
    /// Action trigger.
    Submit,
}

impl ElementKind {
    /// Type tag used in element documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Text => "ACText",
            ElementKind::Radio => "ACRadio",
            ElementKind::Submit => "ACSubmit",
        }
    }

    /// Parse a type tag. Accepts the full tag (`ACText`) or the short form
    /// (`text`), case insensitive.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.to_ascii_lowercase();
        let short = tag.strip_prefix("ac").unwrap_or(&tag);
        match short {
            "text" => Some(ElementKind::Text),
            "radio" => Some(ElementKind::Radio),
            "submit" => Some(ElementKind::Submit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Layout emitted after an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Posterior {
    None,
    Br,
    Par,
    Div,
}

impl Posterior {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Posterior::None),
            "br" => Some(Posterior::Br),
            "par" => Some(Posterior::Par),
            "div" => Some(Posterior::Div),
            _ => None,
        }
    }
}

/// Direction in which radio options are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arrange {
    Vertical,
    Horizontal,
}

impl Arrange {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vertical" => Some(Arrange::Vertical),
            "horizontal" => Some(Arrange::Horizontal),
            _ => None,
        }
    }
}

/// Display text element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub name: String,
    pub value: String,
    pub style: String,
    /// Markup template with a `%s` placeholder for the (escaped) value.
    /// Empty shows the value as is.
    pub format: String,
    pub posterior: Posterior,
}

impl Text {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            style: String::new(),
            format: String::new(),
            posterior: Posterior::None,
        }
    }

    /// The text as shown on the page, with `format` applied.
    pub fn display_value(&self) -> String {
        if self.format.is_empty() {
            self.value.clone()
        } else {
            self.format.replacen("%s", &self.value, 1)
        }
    }

    fn load(&mut self, attrs: &Map<String, Value>) {
        for (key, value) in attrs {
            match key.as_str() {
                "value" => set_string(&mut self.value, value),
                "style" => set_string(&mut self.style, value),
                "format" => set_string(&mut self.format, value),
                "posterior" => set_posterior(&mut self.posterior, value),
                _ => {}
            }
        }
    }
}

/// Single-select list element.
///
/// The current selection is kept as a string so that a request can name a
/// style that is not (or no longer) among the options. `checked` is the
/// 1-based index of the selection in `options`, or 0 when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Radio {
    pub name: String,
    pub label: String,
    #[serde(rename = "value")]
    options: Vec<String>,
    checked: usize,
    pub arrange: Arrange,
    pub posterior: Posterior,
    #[serde(skip)]
    selection: String,
}

impl Radio {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: String::new(),
            options: Vec::new(),
            checked: 0,
            arrange: Arrange::Vertical,
            posterior: Posterior::Br,
            selection: String::new(),
        }
    }

    /// The selected option, or an empty string.
    pub fn value(&self) -> &str {
        &self.selection
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// 1-based index of the selection among the options, 0 if none.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Set the current selection. An empty string clears it.
    pub fn select(&mut self, value: &str) {
        self.selection = value.to_string();
        self.recheck();
    }

    /// Replace the option list. The selection survives only if it is
    /// still one of the options.
    pub fn set_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        if !self.options.iter().any(|o| *o == self.selection) {
            self.selection.clear();
        }
        self.recheck();
    }

    /// Remove every option and the selection.
    pub fn clear_options(&mut self) {
        self.options.clear();
        self.selection.clear();
        self.checked = 0;
    }

    fn recheck(&mut self) {
        self.checked = self
            .options
            .iter()
            .position(|o| *o == self.selection)
            .map(|i| i + 1)
            .unwrap_or(0);
    }

    // Options and the checked index are structural and never loaded from a document.
    fn load(&mut self, attrs: &Map<String, Value>) {
        for (key, value) in attrs {
            match key.as_str() {
                "label" => set_string(&mut self.label, value),
                "arrange" => {
                    if let Some(arrange) = value.as_str().and_then(Arrange::parse) {
                        self.arrange = arrange;
                    }
                }
                "posterior" => set_posterior(&mut self.posterior, value),
                _ => {}
            }
        }
    }
}

/// Action trigger element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submit {
    pub name: String,
    /// Button caption.
    pub value: String,
    pub uri: String,
    pub posterior: Posterior,
}

impl Submit {
    pub fn new(name: &str, value: &str, uri: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            uri: uri.to_string(),
            posterior: Posterior::None,
        }
    }

    fn load(&mut self, attrs: &Map<String, Value>) {
        for (key, value) in attrs {
            match key.as_str() {
                "value" => set_string(&mut self.value, value),
                "uri" => set_string(&mut self.uri, value),
                "posterior" => set_posterior(&mut self.posterior, value),
                _ => {}
            }
        }
    }
}

/// A named page element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Element {
    #[serde(rename = "ACText")]
    Text(Text),
    #[serde(rename = "ACRadio")]
    Radio(Radio),
    #[serde(rename = "ACSubmit")]
    Submit(Submit),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Text(e) => &e.name,
            Element::Radio(e) => &e.name,
            Element::Submit(e) => &e.name,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Text(_) => ElementKind::Text,
            Element::Radio(_) => ElementKind::Radio,
            Element::Submit(_) => ElementKind::Submit,
        }
    }

    /// The element's current value.
    pub fn value(&self) -> &str {
        match self {
            Element::Text(e) => &e.value,
            Element::Radio(e) => e.value(),
            Element::Submit(e) => &e.value,
        }
    }

    /// Overwrite the attributes this kind accepts from a document.
    /// Unknown attributes and values of the wrong type are ignored.
    pub fn load_attributes(&mut self, attrs: &Map<String, Value>) {
        match self {
            Element::Text(e) => e.load(attrs),
            Element::Radio(e) => e.load(attrs),
            Element::Submit(e) => e.load(attrs),
        }
    }
}

impl From<Text> for Element {
    fn from(e: Text) -> Self {
        Element::Text(e)
    }
}

impl From<Radio> for Element {
    fn from(e: Radio) -> Self {
        Element::Radio(e)
    }
}

impl From<Submit> for Element {
    fn from(e: Submit) -> Self {
        Element::Submit(e)
    }
}

/// Fixed, ordered collection of uniquely named elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ElementTree {
    elements: Vec<Element>,
}

impl ElementTree {
    /// Build a tree from elements in declaration order.
    pub fn new(elements: Vec<Element>) -> Result<Self, ElementError> {
        for (i, element) in elements.iter().enumerate() {
            if elements[..i].iter().any(|e| e.name() == element.name()) {
                return Err(ElementError::DuplicateName(element.name().to_string()));
            }
        }
        Ok(Self { elements })
    }

    /// The portal page: a caption, the style selector and an apply button
    /// that posts back to `page_uri`.
    pub fn portal(page_uri: &str) -> Self {
        Self {
            elements: vec![
                Text::new(CAPTION, "Hello, world").into(),
                Radio::new(STYLES).into(),
                Submit::new(APPLY, "Apply", page_uri).into(),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.name() == name)
    }

    pub fn text(&self, name: &str) -> Option<&Text> {
        match self.get(name)? {
            Element::Text(e) => Some(e),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, name: &str) -> Option<&mut Text> {
        match self.get_mut(name)? {
            Element::Text(e) => Some(e),
            _ => None,
        }
    }

    pub fn radio(&self, name: &str) -> Option<&Radio> {
        match self.get(name)? {
            Element::Radio(e) => Some(e),
            _ => None,
        }
    }

    pub fn radio_mut(&mut self, name: &str) -> Option<&mut Radio> {
        match self.get_mut(name)? {
            Element::Radio(e) => Some(e),
            _ => None,
        }
    }

    pub fn submit(&self, name: &str) -> Option<&Submit> {
        match self.get(name)? {
            Element::Submit(e) => Some(e),
            _ => None,
        }
    }

    pub fn submit_mut(&mut self, name: &str) -> Option<&mut Submit> {
        match self.get_mut(name)? {
            Element::Submit(e) => Some(e),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Merge style assignments into the tree by element name.
    ///
    /// Assignments naming an unknown element, or declaring a type other
    /// than the target's, are skipped. Returns the number applied.
    pub fn apply(&mut self, assignments: &[StyleAssignment]) -> usize {
        let mut applied = 0;
        for assignment in assignments {
            let Some(element) = self.get_mut(&assignment.name) else {
                debug!("Ignoring style for unknown element '{}'", assignment.name);
                continue;
            };
            if let Some(kind) = assignment.kind {
                if kind != element.kind() {
                    warn!(
                        "Style for '{}' declares {} but the element is {}",
                        assignment.name,
                        kind,
                        element.kind()
                    );
                    continue;
                }
            }
            element.load_attributes(&assignment.attributes);
            applied += 1;
        }
        applied
    }
}

fn set_string(target: &mut String, value: &Value) {
    match value {
        Value::String(s) => *target = s.clone(),
        Value::Number(n) => *target = n.to_string(),
        Value::Bool(b) => *target = b.to_string(),
        _ => {}
    }
}

fn set_posterior(target: &mut Posterior, value: &Value) {
    if let Some(posterior) = value.as_str().and_then(Posterior::parse) {
        *target = posterior;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn assignment(value: Value) -> StyleAssignment {
        StyleAssignment::from_object(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_portal_tree() {
        let tree = ElementTree::portal("/hello");
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.text(CAPTION).unwrap().value, "Hello, world");
        assert!(tree.radio(STYLES).unwrap().options().is_empty());
        assert_eq!(tree.submit(APPLY).unwrap().uri, "/hello");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = ElementTree::new(vec![
            Text::new("a", "").into(),
            Submit::new("a", "", "/").into(),
        ]);
        assert_eq!(result, Err(ElementError::DuplicateName("a".to_string())));
    }

    #[test]
    fn test_typed_lookup_checks_kind() {
        let tree = ElementTree::portal("/hello");
        assert!(tree.radio(CAPTION).is_none());
        assert!(tree.text(STYLES).is_none());
        assert!(tree.text("missing").is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ElementKind::parse("ACText"), Some(ElementKind::Text));
        assert_eq!(ElementKind::parse("radio"), Some(ElementKind::Radio));
        assert_eq!(ElementKind::parse("AcSubmit"), Some(ElementKind::Submit));
        assert_eq!(ElementKind::parse("ACInput"), None);
    }

    #[test]
    fn test_set_options_keeps_present_selection() {
        let mut radio = Radio::new(STYLES);
        radio.set_options(["a.json", "b.json"]);
        radio.select("b.json");
        assert_eq!(radio.checked(), 2);

        radio.set_options(["b.json", "c.json"]);
        assert_eq!(radio.value(), "b.json");
        assert_eq!(radio.checked(), 1);
    }

    #[test]
    fn test_set_options_drops_missing_selection() {
        let mut radio = Radio::new(STYLES);
        radio.set_options(["a.json"]);
        radio.select("a.json");

        radio.set_options(["c.json"]);
        assert_eq!(radio.value(), "");
        assert_eq!(radio.checked(), 0);
    }

    #[test]
    fn test_select_unknown_value_is_recorded() {
        let mut radio = Radio::new(STYLES);
        radio.set_options(["a.json"]);
        radio.select("gone.json");
        assert_eq!(radio.value(), "gone.json");
        assert_eq!(radio.checked(), 0);
    }

    #[test]
    fn test_apply_text_attributes() {
        let mut tree = ElementTree::portal("/hello");
        let applied = tree.apply(&[assignment(json!({
            "name": "Caption",
            "type": "ACText",
            "value": "Good night",
            "style": "color:white;background:black",
            "format": "<b>%s</b>",
            "posterior": "par"
        }))]);

        assert_eq!(applied, 1);
        let caption = tree.text(CAPTION).unwrap();
        assert_eq!(caption.value, "Good night");
        assert_eq!(caption.style, "color:white;background:black");
        assert_eq!(caption.display_value(), "<b>Good night</b>");
        assert_eq!(caption.posterior, Posterior::Par);
    }

    #[test]
    fn test_apply_ignores_unknown_elements() {
        let mut tree = ElementTree::portal("/hello");
        let before = tree.clone();
        let applied = tree.apply(&[assignment(json!({"name": "Nope", "value": "x"}))]);
        assert_eq!(applied, 0);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_apply_skips_kind_mismatch() {
        let mut tree = ElementTree::portal("/hello");
        let before = tree.clone();
        tree.apply(&[assignment(json!({"name": "Caption", "type": "ACRadio", "label": "x"}))]);
        assert_eq!(tree, before);
    }

    #[test]
    fn test_apply_radio_keeps_structure() {
        let mut tree = ElementTree::portal("/hello");
        tree.radio_mut(STYLES).unwrap().set_options(["a.json", "b.json"]);
        tree.radio_mut(STYLES).unwrap().select("a.json");

        tree.apply(&[assignment(json!({
            "name": "Styles",
            "value": ["evil.json"],
            "checked": 2,
            "label": "Pick a style",
            "arrange": "horizontal"
        }))]);

        let radio = tree.radio(STYLES).unwrap();
        assert_eq!(radio.options(), &["a.json".to_string(), "b.json".to_string()]);
        assert_eq!(radio.value(), "a.json");
        assert_eq!(radio.label, "Pick a style");
        assert_eq!(radio.arrange, Arrange::Horizontal);
    }

    #[test]
    fn test_apply_stringifies_scalars() {
        let mut tree = ElementTree::portal("/hello");
        tree.apply(&[assignment(json!({"name": "Caption", "value": 42, "style": null}))]);
        let caption = tree.text(CAPTION).unwrap();
        assert_eq!(caption.value, "42");
        assert_eq!(caption.style, "");
    }

    #[test]
    fn test_serialize_element_format() {
        let mut tree = ElementTree::portal("/hello");
        tree.radio_mut(STYLES).unwrap().set_options(["a.json"]);
        tree.radio_mut(STYLES).unwrap().select("a.json");

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["type"], "ACText");
        assert_eq!(json[0]["name"], "Caption");
        assert_eq!(json[1]["type"], "ACRadio");
        assert_eq!(json[1]["value"], json!(["a.json"]));
        assert_eq!(json[1]["checked"], 1);
        assert_eq!(json[2]["uri"], "/hello");
    }
}
