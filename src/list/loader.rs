//! Page loading: the provider contract and the state transitions around one fetch.
//!
//! A fetch is split into three synchronous steps so the at-most-one-in-flight
//! rule can be enforced without holding a lock across the await:
//!
//! 1. [`reserve`] refuses if the list is loading or finished, otherwise marks it
//!    loading, appends the tail placeholder and commits the next page number.
//! 2. The caller awaits [`PageProvider::load_items`] with no lock held.
//! 3. [`apply_page`] or [`apply_failure`] folds the result back into the state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::controller::ListOptions;
use super::item::{Item, LayoutDescriptor};
use super::state::ListState;

// ============================================================================
// Error Types
// ============================================================================

/// Errors a page provider can report.
///
/// The list never retries; transient-failure handling belongs to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid page payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Provider Contract
// ============================================================================

/// Arguments for one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    /// Column order; negative means descending.
    pub order_index: Option<i32>,
}

impl PageRequest {
    /// Row offset of the first record on this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of records as returned by a provider.
///
/// `data`, `layouts` and `records` are only read from page 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub items: Vec<Item>,
    pub data: Option<Value>,
    pub layouts: Option<Vec<LayoutDescriptor>>,
    pub records: Option<u64>,
}

impl Page {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_layouts(mut self, layouts: Vec<LayoutDescriptor>) -> Self {
        self.layouts = Some(layouts);
        self
    }

    pub fn with_records(mut self, records: u64) -> Self {
        self.records = Some(records);
        self
    }
}

/// Supplies pages of records to a list.
///
/// Must return fewer than `page_size` items if and only if no further pages
/// exist.
#[async_trait]
pub trait PageProvider: Send + Sync {
    async fn load_items(&self, request: PageRequest) -> Result<Page, ProviderError>;
}

// ============================================================================
// Failure Policy
// ============================================================================

/// What a rejected fetch leaves behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stay `loading` with the placeholder visible. Further loads are refused
    /// until the list is reset.
    #[default]
    Latch,
    /// Drop the placeholder, give the page number back and clear `loading`,
    /// so the next load retries the same page.
    Rewind,
}

// ============================================================================
// State Transitions
// ============================================================================

/// A reserved page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub request: PageRequest,
    /// State generation at reservation time.
    pub generation: u64,
}

/// Result of folding a resolved fetch into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Rows were appended.
    Appended {
        page: u32,
        received: usize,
        /// This was the terminal page.
        loaded: bool,
    },
    /// The list was reset while the fetch was in flight; rows were discarded.
    Stale { page: u32 },
}

/// Reserve the next page, or `None` if a fetch is running or the list is done.
pub(crate) fn reserve(state: &mut ListState, options: &ListOptions) -> Option<PageTicket> {
    if state.loaded || state.loading {
        return None;
    }

    state.loading = true;
    state.push_placeholder();
    state.page = state.page.saturating_add(1);

    let ticket = PageTicket {
        request: PageRequest {
            page: state.page,
            page_size: options.page_size,
            order_index: state.order_index,
        },
        generation: state.generation,
    };
    tracing::debug!(
        page = ticket.request.page,
        page_size = ticket.request.page_size,
        order_index = ?ticket.request.order_index,
        "Reserved page"
    );
    Some(ticket)
}

/// Fold a successful fetch into the state.
pub(crate) fn apply_page(
    state: &mut ListState,
    ticket: PageTicket,
    page: Page,
    options: &ListOptions,
) -> PageOutcome {
    let page_no = ticket.request.page;
    if ticket.generation != state.generation {
        tracing::debug!(page = page_no, "Discarding page that resolved after a reset");
        return PageOutcome::Stale { page: page_no };
    }

    state.remove_trailing_placeholder();

    let Page {
        items,
        data,
        layouts,
        records,
    } = page;

    if page_no == 1 {
        state.data = data;
        state.layouts = layouts;
        state.records = records;
    }

    let received = items.len();
    state.items.extend(items);
    state.loaded = received < options.page_size as usize;
    state.loading = false;

    if state.loaded {
        let header_rows = usize::from(options.has_header);
        let total = state.items.len().saturating_sub(header_rows);
        state.records = Some(total as u64);
        if options.has_footer {
            state.items.push(Item::footer());
        }
        tracing::info!(page = page_no, records = total, "All pages loaded");
    } else {
        tracing::debug!(page = page_no, received, "Page appended");
    }

    PageOutcome::Appended {
        page: page_no,
        received,
        loaded: state.loaded,
    }
}

/// Fold a rejected fetch into the state according to the failure policy.
pub(crate) fn apply_failure(
    state: &mut ListState,
    ticket: PageTicket,
    error: &ProviderError,
    policy: FailurePolicy,
) {
    let page_no = ticket.request.page;
    if ticket.generation != state.generation {
        tracing::debug!(page = page_no, error = %error, "Ignoring failure of a stale page");
        return;
    }

    match policy {
        FailurePolicy::Latch => {
            tracing::warn!(
                page = page_no,
                error = %error,
                "Page fetch failed; list stays loading until reset"
            );
        }
        FailurePolicy::Rewind => {
            state.remove_trailing_placeholder();
            state.page = page_no.saturating_sub(1);
            state.loading = false;
            tracing::warn!(
                page = page_no,
                error = %error,
                "Page fetch failed; page released for retry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(page_size: u32, has_header: bool, has_footer: bool) -> ListOptions {
        ListOptions {
            page_size,
            has_header,
            has_footer,
            ..ListOptions::default()
        }
    }

    fn rows(start: i64, count: usize) -> Vec<Item> {
        (0..count as i64)
            .map(|i| Item::default().with("id", start + i))
            .collect()
    }

    #[test]
    fn test_reserve_commits_page_and_placeholder() {
        let opts = options(20, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        assert_eq!(ticket.request.page, 1);
        assert_eq!(ticket.request.page_size, 20);
        assert!(state.loading);
        assert_eq!(state.page, 1);
        assert_eq!(state.items, vec![Item::loading_placeholder()]);
    }

    #[test]
    fn test_reserve_refused_while_loading_or_loaded() {
        let opts = options(20, false, false);
        let mut state = ListState::blank(false);

        assert!(reserve(&mut state, &opts).is_some());
        assert!(reserve(&mut state, &opts).is_none());
        assert_eq!(state.page, 1);

        state.loading = false;
        state.loaded = true;
        assert!(reserve(&mut state, &opts).is_none());
    }

    #[test]
    fn test_full_page_keeps_loading_open() {
        let opts = options(3, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        let outcome = apply_page(&mut state, ticket, Page::new(rows(0, 3)), &opts);

        assert_eq!(
            outcome,
            PageOutcome::Appended {
                page: 1,
                received: 3,
                loaded: false
            }
        );
        assert_eq!(state.items.len(), 3);
        assert!(!state.loading);
        assert!(!state.loaded);
        assert_eq!(state.item_count(), 4);
    }

    #[test]
    fn test_first_page_metadata_captured_once() {
        let opts = options(2, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        let first = Page::new(rows(0, 2))
            .with_data(json!({"sum": 10}))
            .with_layouts(vec![LayoutDescriptor::new("id", "Id")])
            .with_records(99);
        apply_page(&mut state, ticket, first, &opts);
        assert_eq!(state.records, Some(99));

        let ticket = reserve(&mut state, &opts).unwrap();
        let second = Page::new(rows(2, 2)).with_data(json!({"sum": 0}));
        apply_page(&mut state, ticket, second, &opts);

        assert_eq!(state.data, Some(json!({"sum": 10})));
        assert_eq!(state.layouts.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_terminal_page_computes_total_and_footer() {
        let opts = options(20, true, true);
        let mut state = ListState::blank(true);

        let ticket = reserve(&mut state, &opts).unwrap();
        apply_page(&mut state, ticket, Page::new(rows(0, 20)), &opts);
        let ticket = reserve(&mut state, &opts).unwrap();
        let outcome = apply_page(&mut state, ticket, Page::new(rows(20, 5)), &opts);

        assert!(matches!(outcome, PageOutcome::Appended { loaded: true, .. }));
        assert_eq!(state.records, Some(25));
        assert!(state.items[0].is_header());
        assert!(state.items.last().unwrap().is_footer());
        assert_eq!(state.items.len(), 27);
        assert_eq!(state.item_count(), state.items.len());
    }

    #[test]
    fn test_stale_ticket_discarded() {
        let opts = options(5, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        state.clear(false);
        let outcome = apply_page(&mut state, ticket, Page::new(rows(0, 5)), &opts);

        assert_eq!(outcome, PageOutcome::Stale { page: 1 });
        assert!(state.items.is_empty());
        assert_eq!(state.page, 0);
    }

    #[test]
    fn test_latch_policy_keeps_loading() {
        let opts = options(5, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        let error = ProviderError::HttpStatus(500);
        apply_failure(&mut state, ticket, &error, FailurePolicy::Latch);

        assert!(state.loading);
        assert_eq!(state.page, 1);
        assert!(reserve(&mut state, &opts).is_none());
    }

    #[test]
    fn test_rewind_policy_releases_page() {
        let opts = options(5, false, false);
        let mut state = ListState::blank(false);

        let ticket = reserve(&mut state, &opts).unwrap();
        let error = ProviderError::Timeout;
        apply_failure(&mut state, ticket, &error, FailurePolicy::Rewind);

        assert!(!state.loading);
        assert_eq!(state.page, 0);
        assert!(state.items.is_empty());

        let retry = reserve(&mut state, &opts).unwrap();
        assert_eq!(retry.request.page, 1);
    }

    #[test]
    fn test_page_payload_deserializes_with_defaults() {
        let page: Page = serde_json::from_value(json!({"items": [{"id": 1}]})).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.records.is_none());
        assert!(page.layouts.is_none());
    }

    #[test]
    fn test_request_offset() {
        let request = PageRequest {
            page: 3,
            page_size: 20,
            order_index: None,
        };
        assert_eq!(request.offset(), 40);
    }
}
