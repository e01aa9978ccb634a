//! Spread controller integration tests against real archives.
//!
//! Tests verify:
//! - A full walk through an odd-length book
//! - Latest-wins delivery under rapid index changes
//! - Broken pages are left out of their spread
//! - Preloads cover the pages after the spread, up to the end of the book
//! - Reader position is handed back to the catalog

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::timeout;

use folio::catalog::{BookCatalog, BookRecord, MemoryCatalog};
use folio::source::PageSource;
use folio::spread::{PageOrder, Spread, SpreadController, SpreadEvents};

use super::test_utils::{page_width, TestLibrary};

async fn next(events: &mut SpreadEvents) -> Spread {
    timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for spread")
        .expect("event channel closed")
}

async fn activate(
    path: &std::path::Path,
    record: BookRecord,
) -> (SpreadController, SpreadEvents, Arc<MemoryCatalog>) {
    let source = PageSource::open(path, Arc::new(Semaphore::new(4))).await.unwrap();
    let catalog = Arc::new(MemoryCatalog::new(vec![record.clone()]));
    let (controller, events) = SpreadController::activate(&record, Arc::new(source), catalog.clone());
    (controller, events, catalog)
}

#[tokio::test]
async fn test_walk_odd_book() {
    let library = TestLibrary::new();
    let path = library.add_book("five.cbz", 5);
    let (mut controller, mut events, _) = activate(&path, BookRecord::from_path(&path)).await;

    assert_eq!(next(&mut events).await.page_indices(), vec![0]);

    assert!(controller.forward());
    assert_eq!(next(&mut events).await.page_indices(), vec![1, 2]);

    assert!(controller.forward());
    let spread = next(&mut events).await;
    assert_eq!(spread.page_indices(), vec![3, 4]);
    assert_eq!(spread.pages[1].image.width(), page_width(4));

    // The last page of an odd book is only reachable by a single step
    assert!(!controller.forward());
    assert!(controller.forward_single());
    assert_eq!(next(&mut events).await.page_indices(), vec![4]);
    assert!(!controller.can_forward());

    assert!(controller.backward());
    assert_eq!(next(&mut events).await.page_indices(), vec![2, 3]);
}

#[tokio::test]
async fn test_rapid_changes_deliver_latest() {
    let library = TestLibrary::new();
    let path = library.add_book("ten.cbz", 10);
    let (mut controller, mut events, _) = activate(&path, BookRecord::from_path(&path)).await;
    next(&mut events).await;

    controller.show_page(2);
    controller.show_page(4);

    let spread = next(&mut events).await;
    assert_eq!(spread.index, 4);
    assert_eq!(spread.page_indices(), vec![4, 5]);

    let extra = timeout(Duration::from_millis(300), events.recv()).await;
    assert!(extra.is_err(), "a superseded spread was delivered");
}

#[tokio::test]
async fn test_broken_page_left_out() {
    let library = TestLibrary::new();
    let path = library.add_book_with_broken_page("broken.cbz", 4, 2);
    let mut record = BookRecord::from_path(&path);
    record.last_page_index = 1;
    let (_controller, mut events, _) = activate(&path, record).await;

    let spread = next(&mut events).await;
    assert_eq!(spread.index, 1);
    assert_eq!(spread.page_indices(), vec![1]);
}

#[tokio::test]
async fn test_resume_and_save_position() {
    let library = TestLibrary::new();
    let path = library.add_book("book.cbz", 8);
    let mut record = BookRecord::from_path(&path);
    record.last_page_index = 5;
    record.page_order = PageOrder::LeftToRight;
    let id = record.id.clone();
    let (mut controller, mut events, catalog) = activate(&path, record).await;

    let spread = next(&mut events).await;
    assert_eq!(spread.index, 5);
    let shown: Vec<usize> = spread
        .in_display_order(controller.page_order())
        .iter()
        .map(|p| p.index)
        .collect();
    assert_eq!(shown, vec![5, 6]);

    controller.backward();
    controller.set_page_order(PageOrder::RightToLeft);
    let state = controller.deactivate().await;
    assert_eq!(state.last_page_index, 3);
    assert!(state.right_to_left);

    let stored = catalog.book(&id).await.unwrap();
    assert_eq!(stored.last_page_index, 3);
    assert_eq!(stored.page_order, PageOrder::RightToLeft);
}

#[tokio::test]
async fn test_resume_index_clamped() {
    let library = TestLibrary::new();
    let path = library.add_book("short.cbz", 3);
    let mut record = BookRecord::from_path(&path);
    record.last_page_index = 40;
    let (controller, mut events, _) = activate(&path, record).await;

    assert_eq!(controller.current_page_index(), 2);
    assert_eq!(next(&mut events).await.page_indices(), vec![2]);
}

#[tokio::test]
async fn test_preloads_stop_at_end_of_book() {
    let library = TestLibrary::new();
    let path = library.add_book("seven.cbz", 7);
    let (mut controller, mut events, _) = activate(&path, BookRecord::from_path(&path)).await;

    next(&mut events).await;
    assert_eq!(controller.preloaded_pages(), vec![1, 2]);

    controller.show_page(3);
    assert_eq!(next(&mut events).await.page_indices(), vec![3, 4]);
    assert_eq!(controller.preloaded_pages(), vec![5, 6]);

    // Pages held as preloads come back as the next spread
    assert!(controller.forward());
    let spread = next(&mut events).await;
    assert_eq!(spread.page_indices(), vec![5, 6]);
    assert_eq!(spread.pages[1].image.width(), page_width(6));
    assert!(controller.preloaded_pages().is_empty());
}
