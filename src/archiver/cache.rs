//! Archiver cache: opened books keyed by file identity.
//!
//! The cache provides:
//! - A fixed number of opened [`PageSource`]s (one by default)
//! - Eviction in insertion order; hits do not refresh an entry
//! - One [`ResourceHandle`] per entry, released only after the entry's
//!   decodes have drained
//!
//! All mutations go through one async mutex. Concurrent requests for the same
//! book therefore open it once, and an eviction completes before the book
//! that caused it is handed out.
//!
//! # Example
//!
//! ```ignore
//! use folio::archiver::{ArchiverCache, LocalBookSource};
//!
//! let cache = ArchiverCache::new(LocalBookSource::new());
//! let source = cache.get(Path::new("/books/volume1.cbz")).await?;
//! let page = source.decode_page(0).await?;
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info};

use crate::error::OpenError;
use crate::source::PageSource;

use super::handle::{BookSource, ResourceHandle};

// =============================================================================
// Configuration
// =============================================================================

/// Default number of opened books kept in the cache.
pub const DEFAULT_BOOK_CACHE_CAPACITY: usize = 1;

/// Default number of page decodes running at once across all books.
pub const DEFAULT_DECODE_WORKERS: usize = 4;

// =============================================================================
// ArchiverCache
// =============================================================================

struct CacheEntry {
    source: Arc<PageSource>,
    handle: ResourceHandle,
}

/// Capacity-bounded cache of opened books.
pub struct ArchiverCache<S: BookSource> {
    /// Grants file access and opens sources
    source: S,

    /// Entries; `peek` is used for hits so order stays insertion order
    entries: Mutex<LruCache<PathBuf, CacheEntry>>,

    /// Decode permits shared by every source this cache opens
    decode_limit: Arc<Semaphore>,

    capacity: usize,
}

impl<S: BookSource> ArchiverCache<S> {
    /// Create a cache holding one book with the default decode limit.
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, DEFAULT_BOOK_CACHE_CAPACITY, DEFAULT_DECODE_WORKERS)
    }

    /// Create a cache with explicit limits. Zero values are raised to one.
    pub fn with_capacity(source: S, capacity: usize, decode_workers: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            entries: Mutex::new(LruCache::new(capacity)),
            decode_limit: Arc::new(Semaphore::new(decode_workers.max(1))),
            capacity: capacity.get(),
        }
    }

    /// Get the page source for a book, opening it on a miss.
    ///
    /// On a miss the book's resource handle is acquired and its source opened.
    /// If the cache is full, the oldest entry is then drained and released
    /// before the new entry is inserted and returned.
    pub async fn get(&self, identity: &Path) -> Result<Arc<PageSource>, OpenError> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.peek(identity) {
            debug!(book = %identity.display(), "Archiver cache hit");
            return Ok(Arc::clone(&entry.source));
        }

        let handle = self.source.acquire(identity).await?;
        let source = match self
            .source
            .open(identity, Arc::clone(&self.decode_limit))
            .await
        {
            Ok(source) => Arc::new(source),
            Err(e) => {
                handle.release();
                return Err(e);
            }
        };
        info!(
            book = %identity.display(),
            format = source.format().name(),
            pages = source.page_count(),
            "Opened book"
        );

        if entries.len() >= self.capacity {
            if let Some((evicted, entry)) = entries.pop_lru() {
                debug!(book = %evicted.display(), "Evicting book from archiver cache");
                retire(entry).await;
            }
        }

        entries.put(
            identity.to_path_buf(),
            CacheEntry {
                source: Arc::clone(&source),
                handle,
            },
        );

        Ok(source)
    }

    /// Evict one book, draining its decodes and releasing its handle.
    ///
    /// Returns whether the book was cached.
    pub async fn invalidate(&self, identity: &Path) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.pop(identity) {
            Some(entry) => {
                debug!(book = %identity.display(), "Invalidated book");
                retire(entry).await;
                true
            }
            None => false,
        }
    }

    /// Evict every book. Used at shutdown.
    pub async fn shutdown(&self) {
        let mut entries = self.entries.lock().await;
        while let Some((identity, entry)) = entries.pop_lru() {
            debug!(book = %identity.display(), "Closing book");
            retire(entry).await;
        }
    }

    pub async fn contains(&self, identity: &Path) -> bool {
        self.entries.lock().await.contains(identity)
    }

    /// Get the number of cached books.
    pub async fn cached_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

/// Drain an entry's decodes, then release its handle.
async fn retire(entry: CacheEntry) {
    entry.source.drain().await;
    entry.handle.release();
}

// =============================================================================
// Tests
// =============================================================================
