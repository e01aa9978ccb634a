//! HTTP server layer.
//!
//! Exposes the catalog and page images over a small JSON + JPEG API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                          │
//! │   /api/v1/{books,collections}/...  /images/books/{id}/...   │
//! │                                                             │
//! │  ┌──────────────────────┐   ┌────────────────────────────┐  │
//! │  │       handlers       │   │           routes           │  │
//! │  │ (requests, errors)   │   │  (CORS, tracing, nesting)  │  │
//! │  └──────────────────────┘   └────────────────────────────┘  │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │
//!                           PageService
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    book_handler, books_handler, collection_handler, collections_handler, health_handler,
    page_handler, thumbnail_handler, AppState, BookResponse, BooksResponse, CollectionResponse,
    CollectionsResponse, ErrorResponse, HealthResponse, PagePathParams,
};
pub use routes::{create_router, create_shared_router, RouterConfig};
