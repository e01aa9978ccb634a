//! Book metadata.
//!
//! The reader core does not own persistent metadata. It talks to a
//! [`BookCatalog`] that resolves ids to files and records what the core
//! learns: page counts, thumbnails and the last reading position. Books may
//! also be grouped into collections. [`MemoryCatalog`] is the in-process
//! implementation used by the binary.

use async_trait::async_trait;
use bytes::Bytes;

pub mod book;
pub mod collection;
pub mod memory;

pub use book::{book_id_for, BookRecord, ViewerState};
pub use collection::{collection_id_for, CollectionRecord};
pub use memory::MemoryCatalog;

/// Metadata collaborator for the reader core.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// All books, in display order.
    async fn books(&self) -> Vec<BookRecord>;

    /// Look up one book.
    async fn book(&self, id: &str) -> Option<BookRecord>;

    /// Record the page count observed after opening a book.
    async fn update_page_count(&self, id: &str, page_count: usize);

    /// Store a thumbnail unless one is already present.
    ///
    /// Returns whether the thumbnail was stored.
    async fn store_thumbnail_if_absent(&self, id: &str, thumbnail: Bytes) -> bool;

    /// Persist the reader position of a closed book.
    async fn store_viewer_state(&self, state: ViewerState);

    /// All collections, in display order. Catalogs without grouping have none.
    async fn collections(&self) -> Vec<CollectionRecord> {
        Vec::new()
    }

    async fn collection(&self, id: &str) -> Option<CollectionRecord> {
        self.collections().await.into_iter().find(|c| c.id == id)
    }
}
