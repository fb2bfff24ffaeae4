//! Infinite-scroll list engine.
//!
//! This module holds everything that happens between a virtualized renderer
//! and a page provider:
//!
//! - **Items**: data rows plus header/footer/loading sentinels
//! - **State**: the ordered item store, paging flags and scroll memory
//! - **Loading**: one page at a time, end-of-data detection
//! - **Sorting**: stable in-place reordering that leaves sentinels alone
//! - **Controller**: the mounted list, its renderer contract and the
//!   imperative handle a parent drives it through
//!
//! # Lifecycle
//!
//! ```text
//! Empty ──load──▶ Loading(1) ──full page──▶ Idle ──load──▶ Loading(n) ─┐
//!                      │                      ▲                        │
//!                      │                      └──────full page─────────┘
//!                      └────short page────▶ Loaded (terminal)
//! reset: any state ──▶ Empty
//! ```

mod controller;
mod item;
mod loader;
mod scroll;
mod sort;
mod state;

use thiserror::Error;

use crate::cache::CacheError;

pub use controller::{
    item_key, InfiniteList, ItemKey, ListHandle, ListOptions, LoadFuture, ScrollCallback,
    ScrollChangeCallback, SortOutcome, ViewportCommand, VirtualSource,
};
pub use item::{Alignment, DisplayType, Item, LayoutDescriptor, UnknownViewFlag, ViewFlag};
pub use loader::{
    FailurePolicy, Page, PageOutcome, PageProvider, PageRequest, PageTicket, ProviderError,
};
pub use scroll::{ScrollDirection, ScrollEvent};
pub use sort::{compare_values, sort_items};
pub use state::{format_items, ListState};

/// Errors surfaced by list operations.
#[derive(Debug, Error)]
pub enum ListError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
