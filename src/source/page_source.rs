//! An opened book and its decode queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::OpenError;
use crate::format::SourceFormat;

use super::decoder::PageBackend;
use super::pool::{DecodePool, DecodeTicket};

/// An opened book: a container backend plus its decode queue.
///
/// The page count is fixed at open time. Decodes are asynchronous and never
/// block the caller.
pub struct PageSource {
    identity: PathBuf,
    format: SourceFormat,
    page_count: usize,
    pool: DecodePool,
}

impl PageSource {
    /// Open the book at `identity`, detecting its format.
    ///
    /// Reading the container happens on the blocking pool; the decode workers
    /// are spawned on the current runtime.
    pub async fn open(identity: &Path, limit: Arc<Semaphore>) -> Result<Self, OpenError> {
        let path = identity.to_path_buf();
        let backend = tokio::task::spawn_blocking(move || PageBackend::open(&path))
            .await
            .map_err(|e| OpenError::unsupported(format!("open task failed: {}", e)))??;
        Ok(Self::new(identity, backend, limit))
    }

    /// Wrap an already opened backend using its variant's decode concurrency.
    pub fn new(identity: impl Into<PathBuf>, backend: PageBackend, limit: Arc<Semaphore>) -> Self {
        let concurrency = backend.format().decode_concurrency();
        Self::with_concurrency(identity, backend, concurrency, limit)
    }

    /// Wrap a backend with an explicit decode concurrency.
    pub fn with_concurrency(
        identity: impl Into<PathBuf>,
        backend: PageBackend,
        concurrency: usize,
        limit: Arc<Semaphore>,
    ) -> Self {
        let format = backend.format();
        let page_count = backend.page_count();
        Self {
            identity: identity.into(),
            format,
            page_count,
            pool: DecodePool::spawn(Arc::new(backend), concurrency, limit),
        }
    }

    /// The file this source was opened from.
    pub fn identity(&self) -> &Path {
        &self.identity
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Request page `index`. The ticket resolves exactly once.
    pub fn decode_page(&self, index: usize) -> DecodeTicket {
        self.pool.submit(index)
    }

    /// Request page `index` ahead of time.
    ///
    /// Runs only when no [`decode_page`](Self::decode_page) request is
    /// waiting, and is skipped if the ticket is dropped before it starts.
    pub fn preload_page(&self, index: usize) -> DecodeTicket {
        self.pool.submit_preload(index)
    }

    /// Decodes requested but not yet completed.
    pub fn pending_decodes(&self) -> usize {
        self.pool.pending()
    }

    pub fn decode_concurrency(&self) -> usize {
        self.pool.concurrency()
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Stop accepting decodes and wait for outstanding ones to finish.
    pub async fn drain(&self) {
        self.pool.drain().await;
    }
}

impl std::fmt::Debug for PageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSource")
            .field("identity", &self.identity)
            .field("format", &self.format)
            .field("page_count", &self.page_count)
            .finish()
    }
}
