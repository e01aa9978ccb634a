//! Router configuration for the book server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                  - Health check
//! /api/v1/books                            - List books
//! /api/v1/books/{book_id}                  - Book details
//! /api/v1/collections                      - List collections
//! /api/v1/collections/{collection_id}      - Collection details
//! /images/books/{book_id}/thumbnail        - Thumbnail JPEG
//! /images/books/{book_id}/pages/{page}     - Page JPEG
//! ```
//!
//! # Example
//!
//! ```ignore
//! use folio::server::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    book_handler, books_handler, collection_handler, collections_handler, health_handler,
    page_handler, thumbnail_handler, AppState,
};
use crate::archiver::BookSource;
use crate::serve::PageService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Any CORS origin, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router around a page service.
pub fn create_router<S>(service: PageService<S>, config: RouterConfig) -> Router
where
    S: BookSource + 'static,
{
    create_shared_router(Arc::new(service), config)
}

/// Create the router around a service that is also held elsewhere.
///
/// The binary keeps its own handle so it can shut the cache down after the
/// server stops.
pub fn create_shared_router<S>(service: Arc<PageService<S>>, config: RouterConfig) -> Router
where
    S: BookSource + 'static,
{
    let app_state = AppState::from_shared(service);
    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/books", get(books_handler::<S>))
        .route("/books/{book_id}", get(book_handler::<S>))
        .route("/collections", get(collections_handler::<S>))
        .route("/collections/{collection_id}", get(collection_handler::<S>));

    let image_routes = Router::new()
        .route("/{book_id}/thumbnail", get(thumbnail_handler::<S>))
        .route("/{book_id}/pages/{page}", get(page_handler::<S>));

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_routes)
        .nest("/images/books", image_routes)
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
