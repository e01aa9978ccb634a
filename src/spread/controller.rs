//! Spread controller: navigation driving page decodes.
//!
//! Every index change bumps a generation counter, requests decodes for the
//! new spread and preloads for a few pages after it, and spawns a delivery
//! task. The delivery task waits for the spread's pages, drops the ones that
//! failed, and publishes a [`Spread`] only if no newer request has been made
//! since. [`SpreadEvents::recv`] checks the generation again, so a spread that
//! was published just before the index moved is never handed to the consumer.
//!
//! Preload tickets stay with the controller. A later spread that needs one of
//! those pages takes the ticket over instead of decoding again; tickets
//! outside the new preload window are dropped, which removes them from the
//! source's queue if they have not started.
//!
//! ```text
//!  forward() ─► state ─► generation += 1 ─► spread pages (held preload or new decode) ─┐
//!                                        └► preload pages (kept in the controller)      │
//!                                                                                       ▼
//!  SpreadEvents::recv() ◄── mpsc ◄── generation still current? ◄──────────── delivery task
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::catalog::{BookCatalog, BookRecord, ViewerState};
use crate::serve::{record_thumbnail, PageEncoder};
use crate::source::{DecodeTicket, DecodedImage, PageSource};

use super::state::{spread_layout, PageOrder, SpreadLayout, SpreadState};

// =============================================================================
// Spread
// =============================================================================

/// One decoded page of a spread.
#[derive(Debug, Clone)]
pub struct SpreadPage {
    pub index: usize,
    pub image: DecodedImage,
}

/// A ready spread: the pages at one index that decoded successfully.
#[derive(Debug, Clone)]
pub struct Spread {
    /// Index the spread was requested for
    pub index: usize,

    /// Decoded pages in increasing index order
    pub pages: Vec<SpreadPage>,

    generation: u64,
}

impl Spread {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Page indices present in this spread.
    pub fn page_indices(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.index).collect()
    }

    /// Pages from left to right on screen.
    ///
    /// Right-to-left books put the lower index on the right.
    pub fn in_display_order(&self, order: PageOrder) -> Vec<&SpreadPage> {
        let mut pages: Vec<&SpreadPage> = self.pages.iter().collect();
        if order.is_right_to_left() {
            pages.reverse();
        }
        pages
    }

    pub fn layout(&self, manual_view_height: Option<f64>) -> SpreadLayout {
        let dimensions: Vec<(u32, u32)> = self.pages.iter().map(|p| p.image.dimensions()).collect();
        spread_layout(&dimensions, manual_view_height)
    }
}

// =============================================================================
// SpreadEvents
// =============================================================================

/// Receiving side of a controller's ready-spread notifications.
pub struct SpreadEvents {
    receiver: mpsc::UnboundedReceiver<Spread>,
    generation: Arc<AtomicU64>,
}

impl SpreadEvents {
    /// Wait for the next current spread, skipping superseded ones.
    ///
    /// Returns `None` once the controller is gone and no events remain.
    pub async fn recv(&mut self) -> Option<Spread> {
        loop {
            let spread = self.receiver.recv().await?;
            if self.is_current(&spread) {
                return Some(spread);
            }
            debug!(index = spread.index, "Dropping superseded spread");
        }
    }

    /// Take a current spread if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Spread> {
        while let Ok(spread) = self.receiver.try_recv() {
            if self.is_current(&spread) {
                return Some(spread);
            }
        }
        None
    }

    fn is_current(&self, spread: &Spread) -> bool {
        spread.generation == self.generation.load(Ordering::SeqCst)
    }
}

// =============================================================================
// SpreadController
// =============================================================================

/// Owns the reading state of one open book.
///
/// Navigation methods are synchronous and return whether the index changed.
/// Decodes run on the runtime captured at activation.
pub struct SpreadController {
    book_id: String,
    source: Arc<PageSource>,
    catalog: Arc<dyn BookCatalog>,
    encoder: PageEncoder,
    state: SpreadState,
    generation: Arc<AtomicU64>,
    needs_thumbnail: Arc<AtomicBool>,
    preloads: HashMap<usize, DecodeTicket>,
    events: mpsc::UnboundedSender<Spread>,
    runtime: Handle,
}

impl SpreadController {
    /// Open the reader for `book` at its last viewed page.
    ///
    /// Must be called from within a tokio runtime. The first spread is
    /// requested immediately.
    pub fn activate(
        book: &BookRecord,
        source: Arc<PageSource>,
        catalog: Arc<dyn BookCatalog>,
    ) -> (Self, SpreadEvents) {
        let state = SpreadState::new(source.page_count(), book.page_order)
            .with_current_page(book.last_page_index);
        let generation = Arc::new(AtomicU64::new(0));
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut controller = Self {
            book_id: book.id.clone(),
            source,
            catalog,
            encoder: PageEncoder::default(),
            state,
            generation: Arc::clone(&generation),
            needs_thumbnail: Arc::new(AtomicBool::new(!book.has_thumbnail())),
            preloads: HashMap::new(),
            events: sender,
            runtime: Handle::current(),
        };
        controller.request_spread();

        (
            controller,
            SpreadEvents {
                receiver,
                generation,
            },
        )
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn state(&self) -> &SpreadState {
        &self.state
    }

    pub fn current_page_index(&self) -> usize {
        self.state.current_page_index()
    }

    pub fn page_count(&self) -> usize {
        self.state.page_count()
    }

    pub fn page_order(&self) -> PageOrder {
        self.state.page_order()
    }

    pub fn can_forward(&self) -> bool {
        self.state.can_forward()
    }

    pub fn can_backward(&self) -> bool {
        self.state.can_backward()
    }

    pub fn forward(&mut self) -> bool {
        let moved = self.state.forward();
        self.after_move(moved)
    }

    pub fn backward(&mut self) -> bool {
        let moved = self.state.backward();
        self.after_move(moved)
    }

    pub fn forward_single(&mut self) -> bool {
        let moved = self.state.forward_single();
        self.after_move(moved)
    }

    pub fn backward_single(&mut self) -> bool {
        let moved = self.state.backward_single();
        self.after_move(moved)
    }

    /// Jump to a page, clamped into range.
    pub fn show_page(&mut self, index: usize) -> bool {
        let moved = self.state.show_page(index);
        self.after_move(moved)
    }

    /// Change the reading direction. The index and pending spread are unaffected.
    pub fn set_page_order(&mut self, order: PageOrder) {
        self.state.set_page_order(order);
    }

    pub fn set_manual_view_height(&mut self, height: Option<f64>) {
        self.state.set_manual_view_height(height);
    }

    /// Close the reader and hand its position to the catalog.
    ///
    /// Spreads still in flight are discarded, queued preloads are dropped.
    pub async fn deactivate(self) -> ViewerState {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let state = ViewerState {
            book_id: self.book_id.clone(),
            last_page_index: self.state.current_page_index(),
            right_to_left: self.state.page_order().is_right_to_left(),
        };
        self.catalog.store_viewer_state(state.clone()).await;
        debug!(
            book_id = %state.book_id,
            page = state.last_page_index,
            "Saved reader position"
        );
        state
    }

    /// Pages with a preload held for the next spreads, in ascending order.
    pub fn preloaded_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.preloads.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    fn after_move(&mut self, moved: bool) -> bool {
        if moved {
            self.request_spread();
        }
        moved
    }

    fn request_spread(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let index = self.state.current_page_index();
        let mut held = std::mem::take(&mut self.preloads);

        let tickets: Vec<DecodeTicket> = self
            .state
            .spread_pages()
            .into_iter()
            .map(|page| {
                held.remove(&page)
                    .unwrap_or_else(|| self.source.decode_page(page))
            })
            .collect();
        if tickets.is_empty() {
            return;
        }

        for page in self.state.preload_pages() {
            let ticket = held
                .remove(&page)
                .unwrap_or_else(|| self.source.preload_page(page));
            self.preloads.insert(page, ticket);
        }
        if !held.is_empty() {
            debug!(
                book_id = %self.book_id,
                dropped = held.len(),
                "Dropping preloads outside the window"
            );
        }

        let delivery = Delivery {
            book_id: self.book_id.clone(),
            index,
            generation,
            current: Arc::clone(&self.generation),
            needs_thumbnail: Arc::clone(&self.needs_thumbnail),
            catalog: Arc::clone(&self.catalog),
            encoder: self.encoder,
            events: self.events.clone(),
        };
        self.runtime.spawn(delivery.run(tickets));
    }
}

struct Delivery {
    book_id: String,
    index: usize,
    generation: u64,
    current: Arc<AtomicU64>,
    needs_thumbnail: Arc<AtomicBool>,
    catalog: Arc<dyn BookCatalog>,
    encoder: PageEncoder,
    events: mpsc::UnboundedSender<Spread>,
}

impl Delivery {
    async fn run(self, tickets: Vec<DecodeTicket>) {
        let mut pages = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let index = ticket.index();
            match ticket.await {
                Ok(image) => {
                    if index == 0 && self.needs_thumbnail.swap(false, Ordering::SeqCst) {
                        tokio::spawn(capture_thumbnail(
                            Arc::clone(&self.catalog),
                            self.encoder,
                            self.book_id.clone(),
                            image.clone(),
                            Arc::clone(&self.needs_thumbnail),
                        ));
                    }
                    pages.push(SpreadPage { index, image });
                }
                Err(e) => {
                    warn!(book_id = %self.book_id, page = index, error = %e, "Skipping broken page");
                }
            }
        }

        if pages.is_empty() {
            return;
        }
        if self.current.load(Ordering::SeqCst) != self.generation {
            debug!(book_id = %self.book_id, index = self.index, "Discarding stale spread");
            return;
        }

        let spread = Spread {
            index: self.index,
            pages,
            generation: self.generation,
        };
        if self.events.send(spread).is_err() {
            debug!(book_id = %self.book_id, "Spread receiver closed");
        }
    }
}

/// Store a thumbnail from the cover, allowing another attempt on the next
/// cover decode if none ends up stored.
async fn capture_thumbnail(
    catalog: Arc<dyn BookCatalog>,
    encoder: PageEncoder,
    book_id: String,
    cover: DecodedImage,
    needs_thumbnail: Arc<AtomicBool>,
) {
    if record_thumbnail(catalog.as_ref(), encoder, &book_id, &cover).await {
        return;
    }
    let stored = catalog
        .book(&book_id)
        .await
        .is_some_and(|book| book.has_thumbnail());
    if !stored {
        needs_thumbnail.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
