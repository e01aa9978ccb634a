//! Two-page spread navigation.
//!
//! - [`SpreadState`] - the pure index arithmetic (cover alone, then odd/even pairs)
//! - [`SpreadController`] - drives decodes for the current spread and preloads
//! - [`SpreadEvents`] - delivers only the spread for the latest request

pub mod controller;
pub mod state;

pub use controller::{Spread, SpreadController, SpreadEvents, SpreadPage};
pub use state::{
    spread_layout, spread_pages_at, PageOrder, SpreadLayout, SpreadState, PRELOAD_PAGE_COUNT,
};
