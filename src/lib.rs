//! # Folio
//!
//! A reader core and page server for comic archives (ZIP/CBZ) and PDF
//! documents.
//!
//! Books are opened on demand, kept in a small cache of open sources, and
//! decoded page by page on bounded per-book queues. Pages can be read through
//! a two-page spread controller or fetched over HTTP as fitted JPEGs.
//!
//! ## Features
//!
//! - **Two container formats**: image archives (pages in natural filename
//!   order, metadata entries filtered out) and PDFs rendered through pdfium
//! - **Bounded decoding**: one decode at a time per archive, two per PDF, and a
//!   global cap across all books
//! - **Drain-then-release caching**: an evicted book finishes its in-flight
//!   decodes before its file is closed
//! - **Latest-wins spreads**: rapid page changes only ever deliver the spread
//!   for the last request
//!
//! ## Architecture
//!
//! - [`mod@format`] - format detection, archive entry selection, natural sort
//! - [`source`] - page sources and their decode queues
//! - [`archiver`] - cache of open sources and file handle ownership
//! - [`spread`] - spread navigation state and the spread controller
//! - [`catalog`] - book metadata collaborator
//! - [`serve`] - page service facade and JPEG encoding
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use folio::{ArchiverCache, LocalBookSource, MemoryCatalog, PageService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = MemoryCatalog::scan("/srv/books".as_ref())?;
//!     let service = PageService::new(ArchiverCache::new(LocalBookSource::new()), Arc::new(catalog));
//!
//!     for book in service.books().await {
//!         let cover = service.page(&book.id, 0).await?;
//!         println!("{}: {} byte cover", book.name, cover.data.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod archiver;
pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod serve;
pub mod server;
pub mod source;
pub mod spread;

// Re-export commonly used types
pub use archiver::{ArchiverCache, BookSource, LocalBookSource, ResourceHandle};
pub use catalog::{
    book_id_for, BookCatalog, BookRecord, CollectionRecord, MemoryCatalog, ViewerState,
};
pub use config::{CheckConfig, Cli, Command, ServeConfig, SpreadsConfig};
pub use error::{OpenError, PageError, ServeError};
pub use format::{detect_format, natural_cmp, select_pages, SourceFormat};
pub use serve::{ImageResponse, PageEncoder, PageService};
pub use server::{create_router, create_shared_router, AppState, ErrorResponse, RouterConfig};
pub use source::{DecodeTicket, DecodedImage, PageBackend, PageSource};
pub use spread::{PageOrder, Spread, SpreadController, SpreadEvents, SpreadState};
