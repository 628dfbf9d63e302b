//! Document store contract and the style catalog.
//!
//! The document store is a flat namespace of named blobs on a durable
//! medium (a flash filesystem on the device, a directory on Linux). The
//! catalog is the list of names it currently holds, rebuilt from scratch
//! on every pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this name.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The name is not a plain store-relative name.
    #[error("Invalid document name: {0:?}")]
    InvalidName(String),

    /// The underlying medium failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A flat namespace of named documents.
///
/// Names are store-relative and case-sensitive. Every call acquires and
/// releases whatever handle it needs, nothing is held between calls.
pub trait DocumentStore: Send + Sync {
    /// Names of every non-directory entry, in the store's own order.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Read the full contents of a document.
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError>;
}

/// Check that a name addresses an entry directly inside the store.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let flat = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if flat {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Document store backed by a single directory.
///
/// Subdirectories are not listed and cannot be read through.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for DirStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(target) if !target.is_dir() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Skipping unresolvable link {:?}: {}", entry.file_name(), e);
                        continue;
                    }
                }
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 document name {:?}", raw),
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(name)?;
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// In-memory document store that keeps insertion order.
///
/// Documents can be added and removed through a shared reference, which
/// stands in for out-of-band uploads and deletions.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<(String, Vec<u8>)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, or replace the contents of an existing one in place.
    pub fn insert(&self, name: &str, content: impl Into<Vec<u8>>) {
        let content = content.into();
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        match documents.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = content,
            None => documents.push((name.to_string(), content)),
        }
    }

    /// Remove a document. Returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        let before = documents.len();
        documents.retain(|(n, _)| n != name);
        documents.len() != before
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        Ok(documents.iter().map(|(n, _)| n.clone()).collect())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(name)?;
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        documents
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

/// The selectable list of style document names.
///
/// Holds exactly what the store yielded on the last rebuild. Nothing is
/// carried over between rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleCatalog {
    names: Vec<String>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current list and repopulate it from the store.
    ///
    /// A store that cannot be enumerated leaves the catalog empty for this
    /// pass. Duplicate names keep their first position.
    pub fn rebuild<S: DocumentStore + ?Sized>(&mut self, store: &S) -> &[String] {
        self.names.clear();
        match store.list() {
            Ok(names) => {
                for name in names {
                    if !self.names.contains(&name) {
                        self.names.push(name);
                    }
                }
                debug!("Style catalog rebuilt with {} entries", self.names.len());
            }
            Err(e) => warn!("Failed to enumerate style documents: {}", e),
        }
        &self.names
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct UnlistableStore;

    impl DocumentStore for UnlistableStore {
        fn list(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "unmounted")))
        }

        fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    #[test]
    fn test_memory_store_order_and_replace() {
        let store = MemoryDocumentStore::new();
        store.insert("bright.json", "1");
        store.insert("dark.json", "2");
        store.insert("bright.json", "3");

        assert_eq!(store.list().unwrap(), vec!["bright.json", "dark.json"]);
        assert_eq!(store.read("bright.json").unwrap(), b"3");
    }

    #[test]
    fn test_memory_store_remove() {
        let store = MemoryDocumentStore::new();
        store.insert("a.json", "{}");
        assert!(store.remove("a.json"));
        assert!(!store.remove("a.json"));
        assert!(matches!(store.read("a.json"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let store = MemoryDocumentStore::new();
        for name in ["", ".", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert!(
                matches!(store.read(name), Err(StoreError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_dir_store_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bright.json"), "{}").unwrap();
        fs::write(dir.path().join("dark.json"), "[]").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let store = DirStore::new(dir.path());
        let mut names = store.list().unwrap();
        names.sort();
        assert_eq!(names, vec!["bright.json", "dark.json"]);
        assert_eq!(store.read("dark.json").unwrap(), b"[]");
    }

    #[test]
    fn test_dir_store_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        assert!(matches!(store.read("gone.json"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.read("nested"), Err(_)));
    }

    #[test]
    fn test_dir_store_missing_root_fails_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path().join("absent"));
        assert!(store.list().is_err());
    }

    #[test]
    fn test_catalog_rebuild_replaces_contents() {
        let store = MemoryDocumentStore::new();
        store.insert("a.json", "{}");
        store.insert("b.json", "{}");

        let mut catalog = StyleCatalog::new();
        assert_eq!(catalog.rebuild(&store), &["a.json", "b.json"]);

        store.remove("a.json");
        store.insert("c.json", "{}");
        assert_eq!(catalog.rebuild(&store), &["b.json", "c.json"]);
        assert!(!catalog.contains("a.json"));
    }

    #[test]
    fn test_catalog_enumeration_failure_is_empty() {
        let store = MemoryDocumentStore::new();
        store.insert("a.json", "{}");
        let mut catalog = StyleCatalog::new();
        catalog.rebuild(&store);

        assert!(catalog.rebuild(&UnlistableStore).is_empty());
    }

    struct RepeatingStore;

    impl DocumentStore for RepeatingStore {
        fn list(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        }

        fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    #[test]
    fn test_catalog_drops_duplicate_names() {
        let mut catalog = StyleCatalog::new();
        assert_eq!(catalog.rebuild(&RepeatingStore), &["a", "b"]);
        assert_eq!(catalog.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_dir_store_follows_links() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("link")).unwrap();
        symlink(dir.path().join("a.json"), dir.path().join("alias.json")).unwrap();
        symlink(dir.path().join("gone.json"), dir.path().join("dangling.json")).unwrap();

        let mut names = DirStore::new(dir.path()).list().unwrap();
        names.sort();
        assert_eq!(names, vec!["a.json", "alias.json"]);
    }

    #[test]
    fn test_catalog_matches_dir_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.json", "two.json", "three.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut catalog = StyleCatalog::new();
        catalog.rebuild(&DirStore::new(dir.path()));
        assert_eq!(catalog.len(), 3);
    }
}
