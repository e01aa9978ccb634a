//! ZIP / CBZ image archive backend.
//!
//! The central directory is read once at open time and reduced to the sorted
//! page list. Each decode extracts one entry under the archive lock and
//! decodes the image bytes after the lock is released.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{OpenError, PageError};
use crate::format::{select_pages, ArchiveEntry};

use super::decoder::DecodedImage;

/// Upper bound for the read buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// An opened image archive.
pub struct ImageArchive {
    archive: Mutex<ZipArchive<File>>,
    pages: Vec<ArchiveEntry>,
}

impl ImageArchive {
    /// Open an archive and index its pages.
    pub fn open(path: &Path) -> Result<Self, OpenError> {
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| OpenError::unavailable(&label, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| match e {
            ZipError::Io(e) => OpenError::unavailable(&label, e),
            other => OpenError::unsupported(format!("{}: {}", label, other)),
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            match archive.by_index_raw(index) {
                Ok(file) => entries.push(ArchiveEntry {
                    name: file.name().to_string(),
                    index,
                    size: file.size(),
                }),
                Err(e) => warn!(archive = %label, entry = index, error = %e, "Skipping unreadable archive entry"),
            }
        }

        let pages = select_pages(entries);
        debug!(archive = %label, pages = pages.len(), "Indexed image archive");

        Ok(Self {
            archive: Mutex::new(archive),
            pages,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Entry paths of the pages, in reading order.
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.name.as_str())
    }

    /// Extract and decode one page.
    pub fn decode(&self, index: usize) -> Result<DecodedImage, PageError> {
        let entry = self
            .pages
            .get(index)
            .ok_or_else(|| PageError::broken(index, "page index out of range"))?;

        let data = {
            let mut archive = self.archive.lock();
            let mut file = archive
                .by_index(entry.index)
                .map_err(|e| zip_page_error(index, e))?;
            let mut data = Vec::with_capacity(entry.size.min(MAX_PREALLOCATION) as usize);
            file.read_to_end(&mut data)
                .map_err(|e| io_page_error(index, e))?;
            data
        };

        let image = image::load_from_memory(&data)
            .map_err(|e| PageError::broken(index, format!("{}: {}", entry.name, e)))?;
        Ok(DecodedImage::new(image))
    }
}

fn zip_page_error(index: usize, err: ZipError) -> PageError {
    match err {
        ZipError::Io(e) => io_page_error(index, e),
        other => PageError::broken(index, other),
    }
}

/// Corrupt compressed data surfaces as `InvalidData`; anything else means the
/// file itself could not be read.
fn io_page_error(index: usize, err: io::Error) -> PageError {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => PageError::broken(index, err),
        _ => PageError::ResourceUnavailable {
            index,
            reason: err.to_string(),
        },
    }
}
