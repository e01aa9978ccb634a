//! Page service: book ids in, encoded images out.
//!
//! The service orchestrates:
//! 1. Catalog lookup of the book id
//! 2. Opening the book through the archiver cache
//! 3. Range checking and decoding the page
//! 4. Fitting and JPEG encoding
//!
//! Each response carries the cache hint the HTTP layer should send.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::archiver::{ArchiverCache, BookSource};
use crate::catalog::{BookCatalog, BookRecord, CollectionRecord};
use crate::error::{PageError, ServeError};
use crate::source::PageSource;

use super::encoder::PageEncoder;
use super::thumbnail::record_thumbnail;

// =============================================================================
// Cache hints
// =============================================================================

/// Cache-Control for page images and stored thumbnails.
pub const IMAGE_CACHE_CONTROL: &str = "private, max-age=1440";

/// Cache-Control for the placeholder thumbnail, which is replaced once a cover decodes.
pub const DEFAULT_THUMBNAIL_CACHE_CONTROL: &str = "private, max-age=60";

/// Cache-Control for JSON listings.
pub const LISTING_CACHE_CONTROL: &str = "no-cache";

/// Encoded image plus its cache hint.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    /// JPEG bytes
    pub data: Bytes,

    /// Value for the Cache-Control header
    pub cache_control: &'static str,
}

// =============================================================================
// PageService
// =============================================================================

/// Serving facade over the archiver cache and the catalog.
pub struct PageService<S: BookSource> {
    cache: Arc<ArchiverCache<S>>,
    catalog: Arc<dyn BookCatalog>,
    encoder: PageEncoder,
    default_thumbnail: Bytes,
}

impl<S: BookSource> PageService<S> {
    /// Create a service with the default encoder settings.
    pub fn new(cache: ArchiverCache<S>, catalog: Arc<dyn BookCatalog>) -> Self {
        Self::with_shared_cache(Arc::new(cache), catalog, PageEncoder::default())
    }

    /// Create a service around a cache that is shared with other components.
    pub fn with_shared_cache(
        cache: Arc<ArchiverCache<S>>,
        catalog: Arc<dyn BookCatalog>,
        encoder: PageEncoder,
    ) -> Self {
        let default_thumbnail = encoder.default_thumbnail().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to render default thumbnail");
            Bytes::new()
        });
        Self {
            cache,
            catalog,
            encoder,
            default_thumbnail,
        }
    }

    pub fn cache(&self) -> &Arc<ArchiverCache<S>> {
        &self.cache
    }

    pub fn catalog(&self) -> &Arc<dyn BookCatalog> {
        &self.catalog
    }

    pub fn encoder(&self) -> PageEncoder {
        self.encoder
    }

    pub async fn books(&self) -> Vec<BookRecord> {
        self.catalog.books().await
    }

    pub async fn collections(&self) -> Vec<CollectionRecord> {
        self.catalog.collections().await
    }

    /// Look up a collection by id.
    pub async fn collection(&self, collection_id: &str) -> Result<CollectionRecord, ServeError> {
        self.catalog
            .collection(collection_id)
            .await
            .ok_or_else(|| ServeError::CollectionNotFound {
                collection_id: collection_id.to_string(),
            })
    }

    /// Look up a book by id.
    pub async fn book(&self, book_id: &str) -> Result<BookRecord, ServeError> {
        self.catalog
            .book(book_id)
            .await
            .ok_or_else(|| ServeError::BookNotFound {
                book_id: book_id.to_string(),
            })
    }

    /// Open a book through the cache and refresh its advisory page count.
    pub async fn open_book(&self, book: &BookRecord) -> Result<Arc<PageSource>, ServeError> {
        let source = self.cache.get(&book.locator).await.map_err(|e| {
            warn!(book_id = %book.id, error = %e, "Failed to open book");
            ServeError::from(e)
        })?;

        if source.page_count() != book.page_count {
            self.catalog
                .update_page_count(&book.id, source.page_count())
                .await;
        }
        Ok(source)
    }

    /// Number of pages in a book.
    pub async fn page_count(&self, book_id: &str) -> Result<usize, ServeError> {
        let book = self.book(book_id).await?;
        let source = self.open_book(&book).await?;
        Ok(source.page_count())
    }

    /// Decode, fit and encode one page.
    pub async fn page(&self, book_id: &str, index: usize) -> Result<ImageResponse, ServeError> {
        let book = self.book(book_id).await?;
        let source = self.open_book(&book).await?;

        if index >= source.page_count() {
            return Err(ServeError::PageOutOfRange {
                book_id: book.id,
                index,
                page_count: source.page_count(),
            });
        }

        let page = match source.decode_page(index).await {
            Ok(page) => page,
            Err(e) => {
                warn!(book_id = %book.id, page = index, error = %e, "Failed to decode page");
                if matches!(e, PageError::ResourceUnavailable { .. }) {
                    self.cache.invalidate(&book.locator).await;
                }
                return Err(e.into());
            }
        };

        if index == 0 && !book.has_thumbnail() {
            record_thumbnail(self.catalog.as_ref(), self.encoder, &book.id, &page).await;
        }

        let encoder = self.encoder;
        let data = tokio::task::spawn_blocking(move || encoder.encode_page(&page))
            .await
            .map_err(|e| ServeError::EncodeError {
                message: e.to_string(),
            })??;

        debug!(book_id = %book.id, page = index, bytes = data.len(), "Served page");
        Ok(ImageResponse {
            data,
            cache_control: IMAGE_CACHE_CONTROL,
        })
    }

    /// The book's stored thumbnail, or the placeholder with a short cache hint.
    pub async fn thumbnail(&self, book_id: &str) -> Result<ImageResponse, ServeError> {
        let book = self.book(book_id).await?;
        Ok(match book.thumbnail {
            Some(data) => ImageResponse {
                data,
                cache_control: IMAGE_CACHE_CONTROL,
            },
            None => ImageResponse {
                data: self.default_thumbnail.clone(),
                cache_control: DEFAULT_THUMBNAIL_CACHE_CONTROL,
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
