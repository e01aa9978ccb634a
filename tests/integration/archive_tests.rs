//! Image archive integration tests.
//!
//! Tests verify:
//! - Page selection and natural ordering inside real ZIP files
//! - Format resolution by extension and by signature
//! - Open failures for unsupported and missing files
//! - Decoding through the page source queue
//! - One extraction at a time per archive under concurrent requests

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::sync::Semaphore;

use folio::error::{OpenError, PageError};
use folio::format::SourceFormat;
use folio::source::{ImageArchive, PageSource};

use super::test_utils::{png_bytes, write_zip, TestLibrary};

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

async fn open(path: &Path) -> Result<PageSource, OpenError> {
    PageSource::open(path, Arc::new(Semaphore::new(4))).await
}

#[tokio::test]
async fn test_pages_filtered_and_naturally_sorted() {
    let library = TestLibrary::new();
    let path = library.path().join("mixed.cbz");
    write_zip(
        &path,
        &[
            ("b.png", png_bytes(20, 10, [0, 0, 0])),
            ("a.jpg", jpeg_bytes(10, 10)),
            ("__MACOSX/a.jpg", jpeg_bytes(10, 10)),
            ("c.txt", b"credits".to_vec()),
        ],
    );

    let archive = ImageArchive::open(&path).unwrap();
    let names: Vec<&str> = archive.page_names().collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);

    let source = open(&path).await.unwrap();
    assert_eq!(source.format(), SourceFormat::ImageArchive);
    assert_eq!(source.page_count(), 2);

    let first = source.decode_page(0).await.unwrap();
    let second = source.decode_page(1).await.unwrap();
    assert_eq!(first.dimensions(), (10, 10));
    assert_eq!(second.dimensions(), (20, 10));
}

#[tokio::test]
async fn test_numbered_pages_in_reading_order() {
    let library = TestLibrary::new();
    let path = library.add_book("long.cbz", 12);

    let archive = ImageArchive::open(&path).unwrap();
    let names: Vec<&str> = archive.page_names().collect();
    assert_eq!(names.len(), 12);
    assert_eq!(names[0], "page1.png");
    assert_eq!(names[1], "page2.png");
    assert_eq!(names[9], "page10.png");
    assert_eq!(names[11], "page12.png");
}

#[tokio::test]
async fn test_empty_and_nested_entries() {
    let library = TestLibrary::new();
    let path = library.path().join("nested.zip");
    write_zip(
        &path,
        &[
            ("chapter 1/001.png", png_bytes(8, 8, [9, 9, 9])),
            ("chapter 1/empty.png", Vec::new()),
            ("chapter 1/.DS_Store", vec![0; 16]),
            ("chapter 1/._001.png", vec![0; 16]),
            ("chapter 2/001.png", png_bytes(8, 8, [9, 9, 9])),
        ],
    );

    let archive = ImageArchive::open(&path).unwrap();
    let names: Vec<&str> = archive.page_names().collect();
    assert_eq!(names, vec!["chapter 1/001.png", "chapter 2/001.png"]);
}

#[tokio::test]
async fn test_archive_without_pages() {
    let library = TestLibrary::new();
    let path = library.path().join("text.cbz");
    write_zip(&path, &[("readme.txt", b"no pages".to_vec())]);

    let source = open(&path).await.unwrap();
    assert_eq!(source.page_count(), 0);

    let err = source.decode_page(0).await.unwrap_err();
    assert!(matches!(err, PageError::BrokenPage { index: 0, .. }));
}

#[tokio::test]
async fn test_archive_detected_by_signature() {
    let library = TestLibrary::new();
    let path = library.path().join("book");
    write_zip(&path, &[("1.png", png_bytes(4, 4, [0, 0, 0]))]);

    let source = open(&path).await.unwrap();
    assert_eq!(source.format(), SourceFormat::ImageArchive);
    assert_eq!(source.page_count(), 1);
}

#[tokio::test]
async fn test_archive_decodes_one_at_a_time() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 2);

    let source = open(&path).await.unwrap();
    assert_eq!(source.decode_concurrency(), 1);
}

#[tokio::test]
async fn test_unsupported_files() {
    let library = TestLibrary::new();

    let text = library.add_file("notes.txt", b"hello");
    assert!(matches!(
        open(&text).await.unwrap_err(),
        OpenError::FormatUnsupported { .. }
    ));

    let corrupt = library.add_file("corrupt.cbz", &[b'x'; 256]);
    assert!(matches!(
        open(&corrupt).await.unwrap_err(),
        OpenError::FormatUnsupported { .. }
    ));
}

#[tokio::test]
async fn test_missing_file_is_unavailable() {
    let library = TestLibrary::new();
    let missing = library.path().join("gone.cbz");

    assert!(matches!(
        open(&missing).await.unwrap_err(),
        OpenError::ResourceUnavailable { .. }
    ));
}

#[tokio::test]
async fn test_corrupt_page_does_not_affect_others() {
    let library = TestLibrary::new();
    let path = library.add_book_with_broken_page("book.cbz", 3, 0);

    let source = open(&path).await.unwrap();
    let broken = source.decode_page(0);
    let good = source.decode_page(2);

    assert!(matches!(
        broken.await.unwrap_err(),
        PageError::BrokenPage { index: 0, .. }
    ));
    assert!(good.await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_extract_one_at_a_time() {
    const PERMITS: usize = 8;
    const PAGES: usize = 16;

    let library = TestLibrary::new();
    let path = library.path().join("large.cbz");
    let names: Vec<String> = (0..PAGES).map(|i| format!("{:02}.png", i)).collect();
    let entries: Vec<(&str, Vec<u8>)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), png_bytes(1200 + i as u32, 1200, [i as u8, 0, 0])))
        .collect();
    write_zip(&path, &entries);

    // Every running decode holds one permit of the shared limit
    let limit = Arc::new(Semaphore::new(PERMITS));
    let source = Arc::new(PageSource::open(&path, Arc::clone(&limit)).await.unwrap());

    let done = Arc::new(AtomicBool::new(false));
    let most_in_use = Arc::new(AtomicUsize::new(0));
    let sampler = {
        let limit = Arc::clone(&limit);
        let done = Arc::clone(&done);
        let most_in_use = Arc::clone(&most_in_use);
        tokio::spawn(async move {
            while !done.load(Ordering::SeqCst) {
                let in_use = PERMITS - limit.available_permits();
                most_in_use.fetch_max(in_use, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_micros(100)).await;
            }
        })
    };

    let requests: Vec<_> = (0..PAGES)
        .map(|i| {
            let source = Arc::clone(&source);
            tokio::spawn(async move { source.decode_page(i).await })
        })
        .collect();
    for (i, request) in requests.into_iter().enumerate() {
        let page = request.await.unwrap().unwrap();
        assert_eq!(page.dimensions(), (1200 + i as u32, 1200));
    }

    done.store(true, Ordering::SeqCst);
    sampler.await.unwrap();

    assert_eq!(source.decode_concurrency(), 1);
    assert!(most_in_use.load(Ordering::SeqCst) <= 1);
    assert_eq!(source.pending_decodes(), 0);
}
