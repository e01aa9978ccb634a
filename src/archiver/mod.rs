//! Opened-book lifecycle.
//!
//! - [`ArchiverCache`] keeps a small number of opened [`PageSource`](crate::source::PageSource)s
//! - [`ResourceHandle`] is the file access bound to each cached source
//! - [`BookSource`] grants handles and opens sources; [`LocalBookSource`]
//!   does so for the local filesystem
//!
//! An evicted entry is retired in two steps: its decode queue is drained,
//! then its handle is released.

pub mod cache;
pub mod handle;

pub use cache::{ArchiverCache, DEFAULT_BOOK_CACHE_CAPACITY, DEFAULT_DECODE_WORKERS};
pub use handle::{BookSource, LocalBookSource, ResourceHandle};
