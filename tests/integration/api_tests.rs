//! API integration tests for the book and image routes.
//!
//! Tests verify:
//! - Book listing and details
//! - Collections derived from library subdirectories
//! - Page retrieval, fitting and cache headers
//! - Thumbnails before and after the cover is decoded
//! - Error responses (unknown book, page out of range, bad page number, broken page)

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use folio::archiver::{ArchiverCache, LocalBookSource};
use folio::catalog::{book_id_for, collection_id_for, MemoryCatalog};
use folio::serve::{
    PageEncoder, PageService, DEFAULT_THUMBNAIL_CACHE_CONTROL, IMAGE_CACHE_CONTROL,
    LISTING_CACHE_CONTROL,
};
use folio::{create_router, RouterConfig};

use super::test_utils::{is_valid_jpeg, page_width, TestLibrary, PAGE_HEIGHT};

fn router_for(library: &TestLibrary) -> Router {
    router_with_encoder(library, PageEncoder::default())
}

fn router_with_encoder(library: &TestLibrary, encoder: PageEncoder) -> Router {
    let catalog = MemoryCatalog::scan(library.path()).unwrap();
    let service = PageService::with_shared_cache(
        Arc::new(ArchiverCache::new(LocalBookSource::new())),
        Arc::new(catalog),
        encoder,
    );
    create_router(service, RouterConfig::new().with_tracing(false))
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let library = TestLibrary::new();
    let router = router_for(&library);

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Books
// =============================================================================

#[tokio::test]
async fn test_books_listing() {
    let library = TestLibrary::new();
    library.add_book("vol10.cbz", 2);
    library.add_book("vol2.cbz", 2);
    library.add_file("notes.txt", b"not a book");

    let router = router_for(&library);
    let response = get(&router, "/api/v1/books").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        LISTING_CACHE_CONTROL
    );

    let json = body_json(response).await;
    let books = json["books"].as_array().unwrap();
    let names: Vec<&str> = books.iter().map(|b| b["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["vol2", "vol10"]);
    assert_eq!(books[0]["format"], "image_archive");
    assert_eq!(books[0]["page_count"], 0);
    assert_eq!(books[0]["has_thumbnail"], false);
}

#[tokio::test]
async fn test_book_details_refresh_page_count() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 5);
    let id = book_id_for(&path);

    let router = router_for(&library);
    let response = get(&router, &format!("/api/v1/books/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["page_count"], 5);

    let listing = body_json(get(&router, "/api/v1/books").await).await;
    assert_eq!(listing["books"][0]["page_count"], 5);
}

#[tokio::test]
async fn test_unknown_book() {
    let library = TestLibrary::new();
    let router = router_for(&library);

    let response = get(&router, "/api/v1/books/0000000000000000").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

// =============================================================================
// Collections
// =============================================================================

#[tokio::test]
async fn test_collections_listing() {
    let library = TestLibrary::new();
    library.add_book("loose.cbz", 1);
    let first = library.add_book("saga/part1.cbz", 1);
    let second = library.add_book("saga/part2.cbz", 1);
    library.add_book("shorts/one.cbz", 1);

    let router = router_for(&library);
    let response = get(&router, "/api/v1/collections").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        LISTING_CACHE_CONTROL
    );

    let json = body_json(response).await;
    let collections = json["collections"].as_array().unwrap();
    let names: Vec<&str> = collections
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["saga", "shorts"]);
    assert_eq!(
        collections[0]["book_ids"],
        serde_json::json!([book_id_for(&first), book_id_for(&second)])
    );
}

#[tokio::test]
async fn test_collection_details() {
    let library = TestLibrary::new();
    let book = library.add_book("saga/part1.cbz", 1);
    let id = collection_id_for(&library.path().join("saga"));

    let router = router_for(&library);
    let response = get(&router, &format!("/api/v1/collections/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        LISTING_CACHE_CONTROL
    );

    let json = body_json(response).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["name"], "saga");
    assert_eq!(json["book_ids"], serde_json::json!([book_id_for(&book)]));
}

#[tokio::test]
async fn test_unknown_collection() {
    let library = TestLibrary::new();
    let router = router_for(&library);

    let response = get(&router, "/api/v1/collections/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_page_retrieval() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 3);
    let id = book_id_for(&path);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/1", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        IMAGE_CACHE_CONTROL
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));

    // Pages inside the box are not resized
    let image = image::load_from_memory(&body).unwrap();
    assert_eq!((image.width(), image.height()), (page_width(1), PAGE_HEIGHT));
}

#[tokio::test]
async fn test_page_with_jpg_suffix() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 1);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/0.jpg", book_id_for(&path))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_page_fitted_to_box() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 1);
    let router = router_with_encoder(&library, PageEncoder::new(80, 20, 20));

    let response = get(&router, &format!("/images/books/{}/pages/0", book_id_for(&path))).await;
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let image = image::load_from_memory(&body).unwrap();

    // 40x60 fitted into 20x20
    assert_eq!(image.height(), 20);
    assert!(image.width() <= 20);
}

#[tokio::test]
async fn test_page_out_of_range() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 2);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/2", book_id_for(&path))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "page_not_found");
}

#[tokio::test]
async fn test_invalid_page_number() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 2);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/first", book_id_for(&path))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_page");
}

#[tokio::test]
async fn test_broken_page_is_internal_error() {
    let library = TestLibrary::new();
    let path = library.add_book_with_broken_page("book.cbz", 3, 1);
    let id = book_id_for(&path);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/1", id)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "decode_error");

    // Neighbouring pages are unaffected
    let response = get(&router, &format!("/images/books/{}/pages/2", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_file_is_internal_error() {
    let library = TestLibrary::new();
    let path = library.add_file("fake.cbz", b"this is not an archive at all");
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/pages/0", book_id_for(&path))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "unsupported_format");
}

// =============================================================================
// Thumbnails
// =============================================================================

#[tokio::test]
async fn test_thumbnail_default_then_recorded() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 2);
    let id = book_id_for(&path);
    let router = router_for(&library);

    let response = get(&router, &format!("/images/books/{}/thumbnail", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        DEFAULT_THUMBNAIL_CACHE_CONTROL
    );

    // Serving the cover records the thumbnail
    let response = get(&router, &format!("/images/books/{}/pages/0", id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, &format!("/images/books/{}/thumbnail", id)).await;
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        IMAGE_CACHE_CONTROL
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let image = image::load_from_memory(&body).unwrap();
    assert_eq!((image.width(), image.height()), (page_width(0), PAGE_HEIGHT));

    let listing = body_json(get(&router, "/api/v1/books").await).await;
    assert_eq!(listing["books"][0]["has_thumbnail"], true);
}

#[tokio::test]
async fn test_thumbnail_unknown_book() {
    let library = TestLibrary::new();
    let router = router_for(&library);

    let response = get(&router, "/images/books/ffffffffffffffff/thumbnail").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
