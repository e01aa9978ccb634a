//! Page sources over the supported container formats.
//!
//! This module provides:
//! - [`PageSource`] - an opened book with an immutable page count
//! - [`PageBackend`] - the two container variants (image archive, PDF)
//! - [`DecodePool`] - the per-source FIFO decode queue
//! - [`DecodeTicket`] - the pending result of one decode request
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     PageSource                       │
//! │   identity · format · page_count · decode_page(i)   │
//! │                          │                           │
//! │                    DecodePool                        │
//! │        FIFO queue · N workers · global permit        │
//! │                          │                           │
//! │                    PageBackend                       │
//! │   ┌──────────────────┐      ┌─────────────────────┐  │
//! │   │  ImageArchive    │      │  PaginatedDocument  │  │
//! │   │  (zip, 1 worker) │      │  (pdfium, 2 workers)│  │
//! │   └──────────────────┘      └─────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod archive;
pub mod decoder;
pub mod document;
pub mod page_source;
pub mod pool;

pub use archive::ImageArchive;
pub use decoder::{DecodedImage, PageBackend};
pub use document::{composite_on_white, PageRasterizer, PaginatedDocument, PdfiumRasterizer};
pub use page_source::PageSource;
pub use pool::{DecodePool, DecodeTicket};
