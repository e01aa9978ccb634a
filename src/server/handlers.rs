//! HTTP request handlers for the book API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/v1/books` - List books
//! - `GET /api/v1/books/{book_id}` - One book, with a refreshed page count
//! - `GET /api/v1/collections` - List collections
//! - `GET /api/v1/collections/{collection_id}` - One collection
//! - `GET /images/books/{book_id}/thumbnail` - Thumbnail JPEG
//! - `GET /images/books/{book_id}/pages/{page}` - Page JPEG

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::archiver::BookSource;
use crate::catalog::{BookRecord, CollectionRecord};
use crate::error::{OpenError, PageError, ServeError};
use crate::format::SourceFormat;
use crate::serve::{ImageResponse, PageService, LISTING_CACHE_CONTROL};
use crate::spread::PageOrder;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the page service.
pub struct AppState<S: BookSource> {
    pub service: Arc<PageService<S>>,
}

impl<S: BookSource> AppState<S> {
    pub fn new(service: PageService<S>) -> Self {
        Self::from_shared(Arc::new(service))
    }

    /// Share a service that other components also hold.
    pub fn from_shared(service: Arc<PageService<S>>) -> Self {
        Self { service }
    }
}

impl<S: BookSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for page requests.
///
/// Extracted from `/images/books/{book_id}/pages/{page}` where `page` is
/// `3` or `3.jpg`.
#[derive(Debug, serde::Deserialize)]
pub struct PagePathParams {
    pub book_id: String,
    pub page: String,
}

impl PagePathParams {
    /// Parse the zero-based page index, stripping any .jpg extension.
    pub fn index(&self) -> Result<usize, ServeError> {
        let raw = self.page.strip_suffix(".jpg").unwrap_or(&self.page);
        raw.parse().map_err(|_| ServeError::InvalidPageNumber {
            value: self.page.clone(),
        })
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "decode_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// One book as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: String,
    pub name: String,

    /// Container format, when the file extension identifies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SourceFormat>,

    /// Page count; zero until the book has been opened once
    pub page_count: usize,

    pub last_page_index: usize,
    pub page_order: PageOrder,
    pub created_at: u64,
    pub has_thumbnail: bool,
    pub thumbnail_url: String,
}

impl From<&BookRecord> for BookResponse {
    fn from(book: &BookRecord) -> Self {
        Self {
            id: book.id.clone(),
            name: book.name.clone(),
            format: SourceFormat::from_path(&book.locator),
            page_count: book.page_count,
            last_page_index: book.last_page_index,
            page_order: book.page_order,
            created_at: book.created_at,
            has_thumbnail: book.has_thumbnail(),
            thumbnail_url: format!("/images/books/{}/thumbnail", book.id),
        }
    }
}

/// Response from the books list endpoint.
#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub id: String,
    pub name: String,

    /// Member book ids in reading order
    pub book_ids: Vec<String>,
}

impl From<&CollectionRecord> for CollectionResponse {
    fn from(collection: &CollectionRecord) -> Self {
        Self {
            id: collection.id.clone(),
            name: collection.name.clone(),
            book_ids: collection.book_ids.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionResponse>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServeError to an HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other client errors at WARN.
impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ServeError::BookNotFound { .. } | ServeError::CollectionNotFound { .. } => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ServeError::PageOutOfRange { .. } => (StatusCode::NOT_FOUND, "page_not_found"),
            ServeError::InvalidPageNumber { .. } => (StatusCode::BAD_REQUEST, "invalid_page"),
            ServeError::Open(OpenError::FormatUnsupported { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_format")
            }
            ServeError::Open(OpenError::ResourceUnavailable { .. })
            | ServeError::Page(PageError::ResourceUnavailable { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "resource_unavailable")
            }
            ServeError::Page(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
            ServeError::EncodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

fn image_response(image: ImageResponse) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, image.cache_control),
        ],
        image.data,
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List every book in catalog order.
///
/// `GET /api/v1/books`, sent with `Cache-Control: no-cache`.
pub async fn books_handler<S: BookSource>(State(state): State<AppState<S>>) -> Response {
    let books = state.service.books().await;
    let body = BooksResponse {
        books: books.iter().map(BookResponse::from).collect(),
    };
    (
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(body),
    )
        .into_response()
}

/// Describe one book.
///
/// `GET /api/v1/books/{book_id}`. Opens the book so the page count is
/// accurate.
///
/// # Errors
///
/// - `404 Not Found`: unknown book id
/// - `500 Internal Server Error`: the file cannot be opened
pub async fn book_handler<S: BookSource>(
    State(state): State<AppState<S>>,
    Path(book_id): Path<String>,
) -> Result<Response, ServeError> {
    let book = state.service.book(&book_id).await?;
    let source = state.service.open_book(&book).await?;

    let mut body = BookResponse::from(&book);
    body.page_count = source.page_count();
    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(body),
    )
        .into_response())
}

/// List every collection.
///
/// `GET /api/v1/collections`, sent with `Cache-Control: no-cache`.
pub async fn collections_handler<S: BookSource>(State(state): State<AppState<S>>) -> Response {
    let collections = state.service.collections().await;
    let body = CollectionsResponse {
        collections: collections.iter().map(CollectionResponse::from).collect(),
    };
    (
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(body),
    )
        .into_response()
}

/// `GET /api/v1/collections/{collection_id}`
pub async fn collection_handler<S: BookSource>(
    State(state): State<AppState<S>>,
    Path(collection_id): Path<String>,
) -> Result<Response, ServeError> {
    let collection = state.service.collection(&collection_id).await?;
    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(CollectionResponse::from(&collection)),
    )
        .into_response())
}

/// `GET /images/books/{book_id}/thumbnail`
///
/// Books without a stored thumbnail get a placeholder with a short max-age.
pub async fn thumbnail_handler<S: BookSource>(
    State(state): State<AppState<S>>,
    Path(book_id): Path<String>,
) -> Result<Response, ServeError> {
    let thumbnail = state.service.thumbnail(&book_id).await?;
    Ok(image_response(thumbnail))
}

/// Serve one page as JPEG.
///
/// `GET /images/books/{book_id}/pages/{page}`
///
/// # Errors
///
/// - `400 Bad Request`: `page` is not a number
/// - `404 Not Found`: unknown book or page past the end
/// - `500 Internal Server Error`: open, decode or encode failure
pub async fn page_handler<S: BookSource>(
    State(state): State<AppState<S>>,
    Path(params): Path<PagePathParams>,
) -> Result<Response, ServeError> {
    let index = params.index()?;
    let page = state.service.page(&params.book_id, index).await?;
    Ok(image_response(page))
}

// =============================================================================
// Tests
// =============================================================================
