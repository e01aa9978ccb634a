//! Resource handles and the sources that grant them.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::OpenError;
use crate::source::PageSource;

// =============================================================================
// ResourceHandle
// =============================================================================

/// A scoped permission to keep reading one book file.
///
/// Released exactly once, by calling [`release`](Self::release). The archiver
/// cache only does so after the owning page source has drained its decodes.
/// Dropping an unreleased handle still releases it, with a warning.
pub struct ResourceHandle {
    identity: PathBuf,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ResourceHandle {
    pub fn new(identity: impl Into<PathBuf>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            identity: identity.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn identity(&self) -> &Path {
        &self.identity
    }

    /// Give up access to the file.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!(book = %self.identity.display(), "Released resource handle");
        }
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            warn!(book = %self.identity.display(), "Resource handle dropped without release");
            release();
        }
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("identity", &self.identity)
            .field("released", &self.release.is_none())
            .finish()
    }
}

// =============================================================================
// BookSource Trait
// =============================================================================

/// Grants access to book files and opens page sources over them.
///
/// This abstraction lets the cache work against local storage, sandboxed
/// storage with explicit grants, or test doubles.
#[async_trait]
pub trait BookSource: Send + Sync {
    /// Acquire access to the file at `identity`.
    ///
    /// Fails with `ResourceUnavailable` if the file is missing or unreadable.
    async fn acquire(&self, identity: &Path) -> Result<ResourceHandle, OpenError>;

    /// Open a page source once access has been acquired.
    async fn open(&self, identity: &Path, limit: Arc<Semaphore>) -> Result<PageSource, OpenError> {
        PageSource::open(identity, limit).await
    }
}

/// Book files on the local filesystem.
///
/// A handle keeps the file open for its lifetime, so the book stays readable
/// even if it is renamed or unlinked while cached.
#[derive(Debug, Clone, Default)]
pub struct LocalBookSource;

impl LocalBookSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BookSource for LocalBookSource {
    async fn acquire(&self, identity: &Path) -> Result<ResourceHandle, OpenError> {
        let label = identity.display().to_string();
        let file = tokio::fs::File::open(identity)
            .await
            .map_err(|e| OpenError::unavailable(&label, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| OpenError::unavailable(&label, e))?;
        if !metadata.is_file() {
            return Err(OpenError::unavailable(label, "not a regular file"));
        }

        let file: File = file.into_std().await;
        debug!(book = %label, "Acquired resource handle");
        Ok(ResourceHandle::new(identity, move || drop(file)))
    }
}
