//! Portal session: the element tree plus the state a page load needs.
//!
//! A page load reads the selector's current value, loads that style
//! document, rebuilds the catalog from the live store and merges the
//! loaded assignments into the tree. Failures along the way are logged and
//! absorbed, the worst outcome is a page showing the previous style.

use tracing::{debug, info, warn};

use crate::catalog::{DocumentStore, StyleCatalog};
use crate::element::{ElementTree, STYLES};
use crate::style::{parse_style_document, StyleAssignment};

/// Outcome of one page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoad {
    /// Selection read from the selector, empty if none.
    pub selected: String,
    /// Whether the selected document was read from the store.
    pub loaded: bool,
    /// Catalog as rebuilt during this load.
    pub catalog: Vec<String>,
}

/// State owned by the page-serving scope for the lifetime of the page.
#[derive(Debug, Clone)]
pub struct PortalSession {
    tree: ElementTree,
    selector: String,
    catalog: StyleCatalog,
    last_selected: String,
    pending: Vec<StyleAssignment>,
}

impl PortalSession {
    /// Create a session over `tree`, where `selector` names the radio
    /// element bound to the style catalog.
    pub fn new(tree: ElementTree, selector: &str) -> Self {
        Self {
            tree,
            selector: selector.to_string(),
            catalog: StyleCatalog::new(),
            last_selected: String::new(),
            pending: Vec::new(),
        }
    }

    /// Session over the default portal page.
    pub fn portal(page_uri: &str) -> Self {
        Self::new(ElementTree::portal(page_uri), STYLES)
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Name of the radio element bound to the catalog.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Name of the most recently loaded style document, empty before the first.
    pub fn last_selected(&self) -> &str {
        &self.last_selected
    }

    /// Current value of the selector.
    pub fn selection(&self) -> &str {
        self.tree
            .radio(&self.selector)
            .map(|r| r.value())
            .unwrap_or("")
    }

    /// Set the selector's current value from request input.
    pub fn select(&mut self, name: &str) {
        match self.tree.radio_mut(&self.selector) {
            Some(radio) => radio.select(name),
            None => warn!("Selector '{}' is not a radio element", self.selector),
        }
    }

    /// Synchronize the tree with the selected style and the live store.
    pub fn on_page_load<S: DocumentStore + ?Sized>(&mut self, store: &S) -> PageLoad {
        let selected = self.selection().to_string();

        let loaded = !selected.is_empty() && self.load_style(store, &selected);

        let catalog = self.catalog.rebuild(store).to_vec();
        if let Some(radio) = self.tree.radio_mut(&self.selector) {
            radio.set_options(catalog.iter().cloned());
        }

        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            let applied = self.tree.apply(&pending);
            debug!(
                "Merged {} of {} style assignments into the page",
                applied,
                pending.len()
            );
        }

        PageLoad {
            selected,
            loaded,
            catalog,
        }
    }

    fn load_style<S: DocumentStore + ?Sized>(&mut self, store: &S, name: &str) -> bool {
        match store.read(name) {
            Ok(content) => {
                self.pending = parse_style_document(&content);
                self.last_selected = name.to_string();
                info!(
                    "Style {} loaded ({} bytes, {} assignments)",
                    name,
                    content.len(),
                    self.pending.len()
                );
                true
            }
            Err(e) => {
                warn!("Style {} open failed: {}", name, e);
                false
            }
        }
    }
}
