//! In-memory catalog built from a library directory.
//!
//! Every supported file below the root becomes a book. Every subdirectory
//! holding books directly becomes a collection of those books.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::format::{natural_cmp, SourceFormat};
use crate::spread::PageOrder;

use super::{BookCatalog, BookRecord, CollectionRecord, ViewerState};

/// Catalog held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    books: RwLock<Vec<BookRecord>>,
    collections: RwLock<Vec<CollectionRecord>>,
}

impl MemoryCatalog {
    pub fn new(books: Vec<BookRecord>) -> Self {
        Self {
            books: RwLock::new(books),
            collections: RwLock::default(),
        }
    }

    pub fn with_collections(self, collections: Vec<CollectionRecord>) -> Self {
        Self {
            collections: RwLock::new(collections),
            ..self
        }
    }

    /// Build a catalog from every supported book file under `root`.
    ///
    /// Files are matched by extension and listed in natural path order.
    /// Collections follow the natural order of their directories.
    pub fn scan(root: &Path) -> io::Result<Self> {
        let mut paths = Vec::new();
        collect_book_files(root, &mut paths)?;
        paths.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

        let books: Vec<BookRecord> = paths.iter().map(|p| BookRecord::from_path(p)).collect();
        let collections = group_by_directory(root, &paths, &books);
        debug!(
            root = %root.display(),
            books = books.len(),
            collections = collections.len(),
            "Scanned library"
        );
        Ok(Self::new(books).with_collections(collections))
    }

    pub async fn insert(&self, record: BookRecord) {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|b| b.id == record.id) {
            Some(existing) => *existing = record,
            None => books.push(record),
        }
    }

    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.read().await.is_empty()
    }
}

/// One collection per subdirectory of `root` that directly contains books.
fn group_by_directory(
    root: &Path,
    paths: &[PathBuf],
    books: &[BookRecord],
) -> Vec<CollectionRecord> {
    let mut groups: Vec<(PathBuf, Vec<String>)> = Vec::new();
    for (path, book) in paths.iter().zip(books) {
        let Some(dir) = path.parent() else { continue };
        if dir == root {
            continue;
        }
        match groups.iter_mut().find(|(d, _)| d == dir) {
            Some((_, ids)) => ids.push(book.id.clone()),
            None => groups.push((dir.to_path_buf(), vec![book.id.clone()])),
        }
    }

    groups.sort_by(|(a, _), (b, _)| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    groups
        .into_iter()
        .map(|(dir, ids)| CollectionRecord::for_directory(root, &dir, ids))
        .collect()
}

fn collect_book_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Err(e) = collect_book_files(&path, out) {
                warn!(dir = %path.display(), error = %e, "Skipping unreadable directory");
            }
        } else if SourceFormat::from_path(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

#[async_trait]
impl BookCatalog for MemoryCatalog {
    async fn books(&self) -> Vec<BookRecord> {
        self.books.read().await.clone()
    }

    async fn book(&self, id: &str) -> Option<BookRecord> {
        self.books.read().await.iter().find(|b| b.id == id).cloned()
    }

    async fn update_page_count(&self, id: &str, page_count: usize) {
        let mut books = self.books.write().await;
        if let Some(book) = books.iter_mut().find(|b| b.id == id) {
            book.page_count = page_count;
        }
    }

    async fn store_thumbnail_if_absent(&self, id: &str, thumbnail: Bytes) -> bool {
        let mut books = self.books.write().await;
        match books.iter_mut().find(|b| b.id == id) {
            Some(book) if book.thumbnail.is_none() => {
                book.thumbnail = Some(thumbnail);
                true
            }
            _ => false,
        }
    }

    async fn store_viewer_state(&self, state: ViewerState) {
        let mut books = self.books.write().await;
        if let Some(book) = books.iter_mut().find(|b| b.id == state.book_id) {
            book.last_page_index = state.last_page_index;
            book.page_order = PageOrder::from_right_to_left(state.right_to_left);
        }
    }

    async fn collections(&self) -> Vec<CollectionRecord> {
        self.collections.read().await.clone()
    }

    async fn collection(&self, id: &str) -> Option<CollectionRecord> {
        self.collections.read().await.iter().find(|c| c.id == id).cloned()
    }
}
