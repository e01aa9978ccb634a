//! JPEG encoding for served pages and thumbnails.
//!
//! Pages are downsampled to fit a bounding box, preserving aspect ratio and
//! never upscaling, then flattened to RGB and encoded as JPEG.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::error::ServeError;
use crate::source::DecodedImage;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Default bounding box edge for served pages.
pub const DEFAULT_PAGE_MAX_SIZE: u32 = 1024;

/// Thumbnail bounding box.
pub const THUMBNAIL_MAX_WIDTH: u32 = 220;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 340;

const DEFAULT_THUMBNAIL_GRAY: u8 = 0xd8;

// =============================================================================
// Fitting
// =============================================================================

/// Largest size with the same aspect ratio that fits `(max_width, max_height)`.
///
/// Images already inside the box keep their size.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let fitted_width = ((f64::from(width) * scale).round() as u32).clamp(1, max_width);
    let fitted_height = ((f64::from(height) * scale).round() as u32).clamp(1, max_height);
    (fitted_width, fitted_height)
}

// =============================================================================
// PageEncoder
// =============================================================================

/// Encodes decoded pages for network delivery.
#[derive(Debug, Clone, Copy)]
pub struct PageEncoder {
    quality: u8,
    max_width: u32,
    max_height: u32,
}

impl Default for PageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY, DEFAULT_PAGE_MAX_SIZE, DEFAULT_PAGE_MAX_SIZE)
    }
}

impl PageEncoder {
    /// Quality is clamped to 1-100; zero box edges are raised to 1.
    pub fn new(quality: u8, max_width: u32, max_height: u32) -> Self {
        Self {
            quality: quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY),
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn max_size(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    /// Fit a page into the page box and encode it.
    pub fn encode_page(&self, page: &DecodedImage) -> Result<Bytes, ServeError> {
        self.encode_fitted(page.as_image(), self.max_width, self.max_height)
    }

    /// Fit a page into the thumbnail box and encode it.
    pub fn encode_thumbnail(&self, page: &DecodedImage) -> Result<Bytes, ServeError> {
        self.encode_fitted(page.as_image(), THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT)
    }

    /// Plain placeholder served for books without a thumbnail.
    pub fn default_thumbnail(&self) -> Result<Bytes, ServeError> {
        let gray = Rgb([DEFAULT_THUMBNAIL_GRAY; 3]);
        let image = RgbImage::from_pixel(THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT, gray);
        self.encode_rgb(&image)
    }

    fn encode_fitted(
        &self,
        image: &DynamicImage,
        max_width: u32,
        max_height: u32,
    ) -> Result<Bytes, ServeError> {
        let (width, height) = fit_within(image.width(), image.height(), max_width, max_height);
        let rgb = if (width, height) == (image.width(), image.height()) {
            image.to_rgb8()
        } else {
            image
                .resize_exact(width, height, FilterType::Triangle)
                .to_rgb8()
        };
        self.encode_rgb(&rgb)
    }

    fn encode_rgb(&self, image: &RgbImage) -> Result<Bytes, ServeError> {
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(image)
            .map_err(|e| ServeError::EncodeError {
                message: e.to_string(),
            })?;
        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Tests
// =============================================================================
