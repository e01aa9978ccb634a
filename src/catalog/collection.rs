//! Collections: named groups of books.

use std::path::Path;

use super::book::stable_id;

/// A named, ordered group of books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    /// Stable id used in URLs
    pub id: String,

    pub name: String,

    /// Member book ids in reading order
    pub book_ids: Vec<String>,
}

impl CollectionRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, book_ids: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            book_ids,
        }
    }

    /// Collection for a library subdirectory, named by its path below `root`.
    pub fn for_directory(root: &Path, dir: &Path, book_ids: Vec<String>) -> Self {
        let relative = dir.strip_prefix(root).unwrap_or(dir);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self::new(collection_id_for(dir), name, book_ids)
    }

    pub fn contains(&self, book_id: &str) -> bool {
        self.book_ids.iter().any(|id| id == book_id)
    }
}

/// Stable id for a collection directory.
pub fn collection_id_for(dir: &Path) -> String {
    stable_id(dir)
}
