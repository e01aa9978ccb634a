//! Page selection for image archives.
//!
//! An archive's pages are its image entries in natural order. Entries that
//! are empty, belong to OS metadata (`__MACOSX/` resource forks, AppleDouble
//! `._` companions, Finder and Explorer caches) or are not images are skipped.

use super::natural::natural_cmp;

/// File suffixes treated as page images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

const METADATA_DIRECTORY: &str = "__MACOSX/";
const METADATA_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// One entry of a ZIP central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive
    pub name: String,

    /// Position in the archive's central directory
    pub index: usize,

    /// Uncompressed size in bytes
    pub size: u64,
}

/// Whether a path ends in a page-image suffix, ignoring case.
pub fn is_image_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Whether a path is OS bookkeeping rather than content.
pub fn is_metadata_path(path: &str) -> bool {
    if path.contains(METADATA_DIRECTORY) {
        return true;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.starts_with("._") || METADATA_FILES.contains(&file_name)
}

/// Filter entries down to pages and sort them in reading order.
pub fn select_pages(entries: impl IntoIterator<Item = ArchiveEntry>) -> Vec<ArchiveEntry> {
    let mut pages: Vec<ArchiveEntry> = entries
        .into_iter()
        .filter(|e| e.size > 0)
        .filter(|e| !is_metadata_path(&e.name))
        .filter(|e| is_image_path(&e.name))
        .collect();
    pages.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    pages
}
