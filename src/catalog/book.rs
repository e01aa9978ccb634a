//! Book records, reader positions and stable ids.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::spread::PageOrder;

/// Length of catalog ids in hex characters.
const ID_LEN: usize = 16;

/// Metadata the reader keeps for one book.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Stable id used in URLs
    pub id: String,

    /// Display name
    pub name: String,

    /// File the book is read from
    pub locator: PathBuf,

    /// Page count from the last successful open; advisory until opened
    pub page_count: usize,

    /// Page shown when the reader was last closed
    pub last_page_index: usize,

    pub page_order: PageOrder,

    /// Seconds since the Unix epoch
    pub created_at: u64,

    /// Encoded thumbnail, set once from the first decode of page 0
    pub thumbnail: Option<Bytes>,
}

impl BookRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, locator: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            locator: locator.into(),
            page_count: 0,
            last_page_index: 0,
            page_order: PageOrder::default(),
            created_at: 0,
            thumbnail: None,
        }
    }

    /// Build a record for a file, deriving id, name and creation time from it.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let created_at = std::fs::metadata(path)
            .and_then(|m| m.created().or_else(|_| m.modified()))
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            created_at,
            ..Self::new(book_id_for(path), name, path)
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }
}

/// Stable id for a book file: a truncated SHA-256 of its path.
pub fn book_id_for(path: &Path) -> String {
    stable_id(path)
}

/// Truncated SHA-256 of the canonical form of `path`.
pub(crate) fn stable_id(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

/// Reader position handed to the catalog when a book is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerState {
    pub book_id: String,
    pub last_page_index: usize,
    pub right_to_left: bool,
}
