//! Format detection for book files.
//!
//! A book's container variant is resolved from its file extension first. When
//! the extension is missing or unknown, the leading bytes are checked for the
//! ZIP local-file-header or PDF signatures.
//!
//! Unsupported files yield [`OpenError::FormatUnsupported`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::OpenError;

// =============================================================================
// SourceFormat
// =============================================================================

/// Container variant a book is read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// ZIP / CBZ archive of page images
    ImageArchive,

    /// Paginated document (PDF)
    Document,
}

impl SourceFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            SourceFormat::ImageArchive => "Image archive",
            SourceFormat::Document => "PDF document",
        }
    }

    /// Number of decodes allowed to run at once against one source.
    ///
    /// ZIP extraction shares one reader and must not overlap.
    pub const fn decode_concurrency(&self) -> usize {
        match self {
            SourceFormat::ImageArchive => 1,
            SourceFormat::Document => 2,
        }
    }

    /// Resolve the format from a file extension, ignoring case.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "zip" | "cbz" => Some(SourceFormat::ImageArchive),
            "pdf" => Some(SourceFormat::Document),
            _ => None,
        }
    }

    /// Resolve the format from a path's extension alone.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

// =============================================================================
// Format Detection
// =============================================================================

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const PDF_MAGIC: &[u8] = b"%PDF";

/// Classify leading file bytes.
pub fn sniff_format(header: &[u8]) -> Option<SourceFormat> {
    if header.starts_with(ZIP_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
        Some(SourceFormat::ImageArchive)
    } else if header.starts_with(PDF_MAGIC) {
        Some(SourceFormat::Document)
    } else {
        None
    }
}

/// Detect the format of a book file.
///
/// The extension wins when it is recognized; otherwise the first bytes of the
/// file are read and matched against known signatures.
pub fn detect_format(path: &Path) -> Result<SourceFormat, OpenError> {
    if let Some(format) = SourceFormat::from_path(path) {
        return Ok(format);
    }

    let mut header = [0u8; 4];
    let mut file =
        File::open(path).map_err(|e| OpenError::unavailable(path.display().to_string(), e))?;
    let read = file
        .read(&mut header)
        .map_err(|e| OpenError::unavailable(path.display().to_string(), e))?;

    sniff_format(&header[..read]).ok_or_else(|| {
        OpenError::unsupported(format!(
            "{} is neither an image archive nor a PDF document",
            path.display()
        ))
    })
}

// =============================================================================
// Tests
// =============================================================================
