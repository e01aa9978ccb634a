//! Paginated document backend.
//!
//! Pages are rasterized through a [`PageRasterizer`] and composited onto an
//! opaque white background, so transparent PDF pages render like paper.
//!
//! The production rasterizer uses PDFium via `pdfium-render`. PDFium keeps
//! global state, so every call into it (bind, load, render, drop) happens
//! under one process-wide lock. Each operation loads the document afresh,
//! which keeps no PDFium objects alive between calls.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::{OpenError, PageError};

use super::decoder::DecodedImage;

/// Rasterization width for document pages, in pixels.
pub const RENDER_TARGET_WIDTH: i32 = 1600;

/// Rasterized pages never exceed this height, in pixels.
pub const RENDER_MAX_HEIGHT: i32 = 2400;

// =============================================================================
// PageRasterizer
// =============================================================================

/// Renders document pages to RGBA pixels.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render one page. May return pixels with transparency.
    fn rasterize(&self, index: usize) -> Result<RgbaImage, PageError>;
}

// =============================================================================
// PaginatedDocument
// =============================================================================

/// A document source: rasterizer output flattened onto white.
pub struct PaginatedDocument {
    rasterizer: Box<dyn PageRasterizer>,
}

impl PaginatedDocument {
    pub fn new(rasterizer: impl PageRasterizer + 'static) -> Self {
        Self {
            rasterizer: Box::new(rasterizer),
        }
    }

    pub fn page_count(&self) -> usize {
        self.rasterizer.page_count()
    }

    pub fn decode(&self, index: usize) -> Result<DecodedImage, PageError> {
        let rgba = self.rasterizer.rasterize(index)?;
        Ok(DecodedImage::new(DynamicImage::ImageRgb8(
            composite_on_white(&rgba),
        )))
    }
}

/// Alpha-blend an RGBA image over an opaque white background.
pub fn composite_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

// =============================================================================
// PDFium
// =============================================================================

static PDFIUM_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// PDF rasterizer backed by the system PDFium library.
pub struct PdfiumRasterizer {
    path: PathBuf,
    page_count: usize,
}

impl PdfiumRasterizer {
    /// Load the document once to validate it and count its pages.
    ///
    /// A missing PDFium library makes every PDF unsupported.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let page_count = with_document(path, |document| Ok(document.pages().len() as usize))
            .map_err(|e| OpenError::unsupported(format!("{}: {}", path.display(), e)))?;
        debug!(document = %path.display(), pages = page_count, "Opened PDF document");
        Ok(Self {
            path: path.to_path_buf(),
            page_count,
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(&self, index: usize) -> Result<RgbaImage, PageError> {
        let page_index = PdfPageIndex::try_from(index)
            .map_err(|_| PageError::broken(index, "page index exceeds PDF limits"))?;

        let (width, height, pixels) = with_document(&self.path, |document| {
            let page = document.pages().get(page_index)?;
            let config = PdfRenderConfig::new()
                .set_target_width(RENDER_TARGET_WIDTH)
                .set_maximum_height(RENDER_MAX_HEIGHT);
            let bitmap = page.render_with_config(&config)?;
            Ok((
                bitmap.width() as u32,
                bitmap.height() as u32,
                bitmap.as_rgba_bytes(),
            ))
        })
        .map_err(|e| render_failure(&self.path, index, e))?;

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| PageError::broken(index, "rendered bitmap has unexpected size"))
    }
}

/// A render failure on a document that can no longer be read is the file's
/// fault, not the page's.
fn render_failure(path: &Path, index: usize, err: PdfiumError) -> PageError {
    match std::fs::File::open(path) {
        Ok(_) => PageError::broken(index, err),
        Err(io) => PageError::ResourceUnavailable {
            index,
            reason: format!("{}: {}", path.display(), io),
        },
    }
}

fn with_document<T>(
    path: &Path,
    f: impl FnOnce(&PdfDocument<'_>) -> Result<T, PdfiumError>,
) -> Result<T, PdfiumError> {
    let _guard = PDFIUM_LOCK.lock();
    let pdfium = Pdfium::new(Pdfium::bind_to_system_library()?);
    let document = pdfium.load_pdf_from_file(path, None)?;
    f(&document)
}
