//! Container format handling.
//!
//! - [`detect`]: resolves a file to one of the two supported container variants
//! - [`entries`]: chooses and orders the page images inside an archive
//! - [`natural`]: the natural path ordering used for archive pages

pub mod detect;
pub mod entries;
pub mod natural;

pub use detect::{detect_format, sniff_format, SourceFormat};
pub use entries::{is_image_path, is_metadata_path, select_pages, ArchiveEntry, IMAGE_EXTENSIONS};
pub use natural::natural_cmp;
