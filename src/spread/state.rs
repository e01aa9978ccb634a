//! Spread navigation state.
//!
//! Page 0 (the cover) is shown alone. Every later spread starts at an odd
//! index and pairs it with the following page:
//!
//! ```text
//! index:   0 │ 1 2 │ 3 4 │ 5 6 │ ...
//! spread:  ─ │ ─── │ ─── │ ─── │
//! ```
//!
//! `forward`/`backward` move by spreads and `forward_single`/`backward_single`
//! by one page, which shifts the pairing. In a book with an odd number of
//! pages the last page is only reachable with a single step: from index 3 of
//! a five-page book, `forward` would need index 5 and does nothing.

use serde::{Deserialize, Serialize};

/// Number of pages beyond the active spread that are preloaded.
pub const PRELOAD_PAGE_COUNT: usize = 2;

// =============================================================================
// PageOrder
// =============================================================================

/// Reading direction of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrder {
    LeftToRight,
    #[default]
    RightToLeft,
}

impl PageOrder {
    pub fn from_right_to_left(right_to_left: bool) -> Self {
        if right_to_left {
            PageOrder::RightToLeft
        } else {
            PageOrder::LeftToRight
        }
    }

    pub fn is_right_to_left(self) -> bool {
        self == PageOrder::RightToLeft
    }
}

// =============================================================================
// SpreadState
// =============================================================================

/// Current position and presentation of an open book.
///
/// `current_page_index` is always in `[0, page_count)` unless the book is
/// empty, in which case it is 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadState {
    current_page_index: usize,
    page_order: PageOrder,
    page_count: usize,
    manual_view_height: Option<f64>,
}

impl SpreadState {
    pub fn new(page_count: usize, page_order: PageOrder) -> Self {
        Self {
            current_page_index: 0,
            page_order,
            page_count,
            manual_view_height: None,
        }
    }

    /// Start at `index`, clamped into range.
    pub fn with_current_page(mut self, index: usize) -> Self {
        self.show_page(index);
        self
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    pub fn page_order(&self) -> PageOrder {
        self.page_order
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn manual_view_height(&self) -> Option<f64> {
        self.manual_view_height
    }

    pub fn can_forward(&self) -> bool {
        self.current_page_index + 1 < self.page_count
    }

    pub fn can_backward(&self) -> bool {
        self.current_page_index >= 1
    }

    /// Move one spread forward. Returns whether the index changed.
    pub fn forward(&mut self) -> bool {
        let next = if self.current_page_index == 0 {
            1
        } else {
            self.current_page_index + 2
        };
        self.move_to_if_valid(next)
    }

    /// Move one spread backward. Returns whether the index changed.
    pub fn backward(&mut self) -> bool {
        let previous = match self.current_page_index {
            1 => Some(0),
            i => i.checked_sub(2),
        };
        match previous {
            Some(index) => self.move_to_if_valid(index),
            None => false,
        }
    }

    pub fn forward_single(&mut self) -> bool {
        if !self.can_forward() {
            return false;
        }
        self.current_page_index += 1;
        true
    }

    pub fn backward_single(&mut self) -> bool {
        if !self.can_backward() {
            return false;
        }
        self.current_page_index -= 1;
        true
    }

    /// Jump to `index`, clamped into range. Returns whether the index changed.
    pub fn show_page(&mut self, index: usize) -> bool {
        let clamped = index.min(self.page_count.saturating_sub(1));
        let changed = clamped != self.current_page_index;
        self.current_page_index = clamped;
        changed
    }

    pub fn set_page_order(&mut self, order: PageOrder) {
        self.page_order = order;
    }

    /// Record a user-chosen view height, or `None` to fit the window.
    pub fn set_manual_view_height(&mut self, height: Option<f64>) {
        self.manual_view_height = height.filter(|h| h.is_finite() && *h > 0.0);
    }

    /// Pages shown at the current index, in increasing order.
    pub fn spread_pages(&self) -> Vec<usize> {
        spread_pages_at(self.current_page_index, self.page_count)
    }

    /// Pages worth decoding ahead of the next `forward`.
    pub fn preload_pages(&self) -> Vec<usize> {
        let start = match self.spread_pages().last() {
            Some(last) => last + 1,
            None => return Vec::new(),
        };
        let end = (start + PRELOAD_PAGE_COUNT).min(self.page_count);
        (start..end).collect()
    }

    fn move_to_if_valid(&mut self, index: usize) -> bool {
        if index < self.page_count {
            self.current_page_index = index;
            true
        } else {
            false
        }
    }
}

/// Pages making up the spread anchored at `index`.
pub fn spread_pages_at(index: usize, page_count: usize) -> Vec<usize> {
    if index >= page_count {
        Vec::new()
    } else if index == 0 || index + 1 >= page_count {
        vec![index]
    } else {
        vec![index, index + 1]
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Content size of a spread and the scale applied to fit a manual height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadLayout {
    pub content_width: f64,
    pub content_height: f64,
    pub scale: f64,
}

/// Lay out pages side by side in cells as wide as the widest page.
pub fn spread_layout(dimensions: &[(u32, u32)], manual_view_height: Option<f64>) -> SpreadLayout {
    let max_width = dimensions.iter().map(|(w, _)| *w).max().unwrap_or(0);
    let max_height = dimensions.iter().map(|(_, h)| *h).max().unwrap_or(0);

    let content_width = f64::from(max_width) * dimensions.len() as f64;
    let content_height = f64::from(max_height);
    let scale = match manual_view_height {
        Some(height) if content_height > 0.0 => height / content_height,
        _ => 1.0,
    };

    SpreadLayout {
        content_width,
        content_height,
        scale,
    }
}
