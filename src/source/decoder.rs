//! Decoded pages and the backend enum that produces them.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{OpenError, PageError};
use crate::format::{detect_format, SourceFormat};

use super::archive::ImageArchive;
use super::document::{PaginatedDocument, PdfiumRasterizer};

// =============================================================================
// DecodedImage
// =============================================================================

/// Pixels of one decoded page plus its natural dimensions.
///
/// Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: Arc<DynamicImage>,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }
}

// =============================================================================
// PageBackend
// =============================================================================

/// The two container variants a page source can read.
///
/// Decoding is blocking; callers run it on the decode worker pool.
pub enum PageBackend {
    ImageArchive(ImageArchive),
    Document(PaginatedDocument),
}

impl PageBackend {
    /// Detect the container format and open the matching backend.
    ///
    /// This reads the archive directory or loads the document, so it blocks.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        match detect_format(path)? {
            SourceFormat::ImageArchive => Ok(PageBackend::ImageArchive(ImageArchive::open(path)?)),
            SourceFormat::Document => {
                let rasterizer = PdfiumRasterizer::open(path)?;
                Ok(PageBackend::Document(PaginatedDocument::new(rasterizer)))
            }
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            PageBackend::ImageArchive(_) => SourceFormat::ImageArchive,
            PageBackend::Document(_) => SourceFormat::Document,
        }
    }

    pub fn page_count(&self) -> usize {
        match self {
            PageBackend::ImageArchive(archive) => archive.page_count(),
            PageBackend::Document(document) => document.page_count(),
        }
    }

    /// Decode one page. Indices outside `[0, page_count)` are broken pages.
    pub fn decode(&self, index: usize) -> Result<DecodedImage, PageError> {
        if index >= self.page_count() {
            return Err(PageError::broken(
                index,
                format!("page index out of range (book has {} pages)", self.page_count()),
            ));
        }
        match self {
            PageBackend::ImageArchive(archive) => archive.decode(index),
            PageBackend::Document(document) => document.decode(index),
        }
    }
}
