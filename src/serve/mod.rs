//! Serving facade.
//!
//! This module turns book ids and page indices into encoded images:
//!
//! - [`PageService`] - catalog lookup, cached open, decode, encode
//! - [`PageEncoder`] - bounded resizing and JPEG encoding
//! - [`record_thumbnail`] - one-time thumbnail capture from a decoded cover
//!
//! # Example
//!
//! ```ignore
//! use folio::serve::PageService;
//!
//! let service = PageService::new(cache, catalog);
//! let page = service.page("3f2a9c0d1e4b5a6f", 0).await?;
//! // page.data is a JPEG no larger than 1024x1024
//! ```

pub mod encoder;
pub mod service;
pub mod thumbnail;

pub use encoder::{
    fit_within, PageEncoder, DEFAULT_JPEG_QUALITY, DEFAULT_PAGE_MAX_SIZE, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY, THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH,
};
pub use service::{
    ImageResponse, PageService, DEFAULT_THUMBNAIL_CACHE_CONTROL, IMAGE_CACHE_CONTROL,
    LISTING_CACHE_CONTROL,
};
pub use thumbnail::record_thumbnail;
