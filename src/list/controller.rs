//! The mounted list: owns one [`ListState`] and exposes the renderer contract
//! and the imperative handle a parent uses to drive it.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use super::item::{DisplayType, Item, LayoutDescriptor};
use super::loader::{self, FailurePolicy, PageOutcome, PageProvider};
use super::scroll::{self, ScrollEvent};
use super::sort::sort_items;
use super::state::{format_items, ListState};
use super::ListError;
use crate::cache::{self, ListCache};
use crate::config::Config;
use crate::context::ListContext;

// ============================================================================
// Options
// ============================================================================

/// Per-list settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Overrides the derived `infinitelist<id-or-name>` component key.
    pub cache_key: Option<String>,
    pub page_size: u32,
    pub has_header: bool,
    pub has_footer: bool,
    /// Opt in to session caching of this list.
    pub cache: bool,
    pub failure_policy: FailurePolicy,
    /// Field used to derive stable row keys.
    pub id_field: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            cache_key: None,
            page_size: 20,
            has_header: false,
            has_footer: false,
            cache: false,
            failure_policy: FailurePolicy::Latch,
            id_field: "id".to_string(),
        }
    }
}

impl ListOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            has_header: config.has_header,
            has_footer: config.has_footer,
            cache: config.cache,
            failure_policy: config.failure_policy,
            id_field: config.id_field.clone(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn component_key(&self) -> String {
        self.cache_key
            .clone()
            .unwrap_or_else(|| cache::component_key(self.id.as_deref(), self.name.as_deref()))
    }
}

// ============================================================================
// Renderer-facing Types
// ============================================================================

/// Commands for the virtualization layer that owns the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportCommand {
    /// Forget which rows were already reported as loaded.
    ClearLoadedCache,
    ScrollTo { top: u32, left: u32 },
    /// Start over from the first page.
    Refetch,
}

/// Stable key for a rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Id(String),
    Index(usize),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Id(id) => f.write_str(id),
            ItemKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Row key: the item's id field when it has one, otherwise its index.
pub fn item_key(index: usize, item: Option<&Item>, id_field: &str) -> ItemKey {
    match item.and_then(|item| item.get(id_field)) {
        Some(serde_json::Value::String(id)) => ItemKey::Id(id.clone()),
        Some(serde_json::Value::Number(id)) => ItemKey::Id(id.to_string()),
        _ => ItemKey::Index(index),
    }
}

/// A pending page fetch handed to the renderer.
pub type LoadFuture = BoxFuture<'static, Result<PageOutcome, ListError>>;

/// Called with `true` when the viewport leaves the top, `false` when it returns.
pub type ScrollChangeCallback = Box<dyn Fn(bool) + Send + Sync>;
/// Called for every scroll event.
pub type ScrollCallback = Box<dyn Fn(&ScrollEvent) + Send + Sync>;

/// What the virtualized renderer needs from a list.
pub trait VirtualSource {
    /// Virtual row count, including the "more may exist" slot.
    fn item_count(&self) -> usize;

    fn is_item_loaded(&self, index: usize) -> bool;

    /// Ask for more rows. `None` means the request was refused because a
    /// fetch is already running or everything is loaded.
    fn load_more_items(&self, start_index: usize, stop_index: usize) -> Option<LoadFuture>;

    fn item_key(&self, index: usize) -> ItemKey;
}

/// Commands a parent component can send to a list.
pub trait ListHandle {
    fn clear_cache(&self);

    fn get_item(&self, index: usize) -> Option<Item>;

    fn reset(&self) -> Result<(), ListError>;

    /// Set the selection flag on every data row; returns how many changed.
    fn select_all(&self, selected: bool) -> usize;

    fn select_item(&self, index: usize) -> Option<Item>;

    fn sort(
        &self,
        field: &str,
        display_type: DisplayType,
        order_index: i32,
    ) -> Result<SortOutcome, ListError>;
}

/// How a sort request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOutcome {
    /// Everything was loaded; rows were reordered locally.
    InPlace,
    /// Only part of the data was loaded; the list was reset and will refetch
    /// with the new order index.
    Refetch,
}

// ============================================================================
// Infinite List
// ============================================================================

fn lock(state: &Mutex<ListState>) -> MutexGuard<'_, ListState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One mounted list instance.
///
/// State is created blank or rehydrated from the session cache at mount, and
/// written back when the list is dropped. The cache key is derived from the
/// location captured at mount, because by the time a list is torn down the
/// host has usually already navigated elsewhere.
pub struct InfiniteList {
    state: Arc<Mutex<ListState>>,
    provider: Arc<dyn PageProvider>,
    options: Arc<ListOptions>,
    cache: Arc<ListCache>,
    key: String,
    restored: bool,
    viewport: Option<mpsc::UnboundedSender<ViewportCommand>>,
    on_scroll_change: Option<ScrollChangeCallback>,
    on_scroll: Option<ScrollCallback>,
}

impl InfiniteList {
    /// Mount a list at `location`.
    ///
    /// When caching is enabled and an entry exists for the derived key, it
    /// becomes the initial state and the first fetch is skipped. A corrupt
    /// entry is logged and ignored. A page size of zero is raised to one,
    /// since a zero-row page could never be recognised as the last.
    pub fn mount(
        context: &ListContext,
        mut options: ListOptions,
        provider: Arc<dyn PageProvider>,
        location: &str,
    ) -> Self {
        if options.page_size == 0 {
            tracing::warn!(name = ?options.name, "Page size 0 is not usable, using 1");
            options.page_size = 1;
        }
        let cache = context.cache();
        let key = cache::cache_key(location, &options.component_key());

        let cached = if options.cache {
            cache.claim(&key);
            match cache.read(&key) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring unreadable cached list state");
                    None
                }
            }
        } else {
            None
        };

        let restored = cached.is_some();
        let state = match cached {
            Some(mut state) => {
                // A fetch that was in flight when this was written will never
                // resolve into this instance.
                if state.loading {
                    state.remove_trailing_placeholder();
                    state.page = state.page.saturating_sub(1);
                    state.loading = false;
                }
                format_items(&mut state.items, options.has_header, options.has_footer);
                tracing::debug!(
                    key = %key,
                    items = state.items.len(),
                    page = state.page,
                    "Mounted list from cache"
                );
                state
            }
            None => ListState::blank(options.has_header),
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            provider,
            options: Arc::new(options),
            cache,
            key,
            restored,
            viewport: None,
            on_scroll_change: None,
            on_scroll: None,
        }
    }

    /// Attach the viewport command channel.
    ///
    /// A list restored from cache immediately asks to scroll back to its
    /// remembered offsets.
    pub fn with_viewport(mut self, viewport: mpsc::UnboundedSender<ViewportCommand>) -> Self {
        self.viewport = Some(viewport);
        if self.restored {
            let (top, left) = {
                let state = self.lock();
                (state.scroll_top, state.scroll_left)
            };
            self.send(ViewportCommand::ScrollTo { top, left });
        }
        self
    }

    pub fn on_scroll_change(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_scroll_change = Some(Box::new(callback));
        self
    }

    pub fn on_scroll(mut self, callback: impl Fn(&ScrollEvent) + Send + Sync + 'static) -> Self {
        self.on_scroll = Some(Box::new(callback));
        self
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        lock(&self.state)
    }

    fn send(&self, command: ViewportCommand) {
        if let Some(viewport) = &self.viewport {
            if viewport.send(command).is_err() {
                tracing::debug!(?command, "Viewport receiver dropped");
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    /// Storage key this list persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The initial state came from the session cache.
    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ListState {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn page(&self) -> u32 {
        self.lock().page
    }

    pub fn records(&self) -> Option<u64> {
        self.lock().records
    }

    pub fn layouts(&self) -> Option<Vec<LayoutDescriptor>> {
        self.lock().layouts.clone()
    }

    pub fn data(&self) -> Option<serde_json::Value> {
        self.lock().data.clone()
    }

    pub fn order_index(&self) -> Option<i32> {
        self.lock().order_index
    }

    /// Number of data rows loaded so far (sentinels excluded).
    pub fn data_len(&self) -> usize {
        self.lock().data_len()
    }

    pub fn selected_items(&self) -> Vec<Item> {
        self.lock()
            .items
            .iter()
            .filter(|item| item.selected && !item.is_sentinel())
            .cloned()
            .collect()
    }

    /// Run `f` over the current rows without copying them out.
    pub fn with_items<R>(&self, f: impl FnOnce(&[Item]) -> R) -> R {
        f(&self.lock().items)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Reserve and start the next page fetch.
    ///
    /// Returns `None` immediately when a fetch is already in flight or the
    /// terminal page has been seen. Otherwise the page number is committed
    /// before anything is awaited, so concurrent callers can never request
    /// the same page twice.
    ///
    /// # Errors
    ///
    /// The returned future fails with [`ListError::Provider`] when the
    /// provider rejects the request. It is not retried; see
    /// [`FailurePolicy`] for what the state looks like afterwards.
    pub fn load_more_items(&self) -> Option<LoadFuture> {
        let ticket = loader::reserve(&mut self.lock(), &self.options)?;

        let state = Arc::clone(&self.state);
        let provider = Arc::clone(&self.provider);
        let options = Arc::clone(&self.options);

        Some(
            async move {
                let result = provider.load_items(ticket.request).await;
                let mut state = lock(&state);
                match result {
                    Ok(page) => Ok(loader::apply_page(&mut state, ticket, page, &options)),
                    Err(e) => {
                        loader::apply_failure(&mut state, ticket, &e, options.failure_policy);
                        Err(ListError::Provider(e))
                    }
                }
            }
            .boxed(),
        )
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Set the selection flag of one data row. Sentinels and out-of-range
    /// indices yield `None`.
    pub fn set_selected(&self, index: usize, selected: bool) -> Option<Item> {
        let mut state = self.lock();
        let item = state.items.get_mut(index)?;
        if item.is_sentinel() {
            return None;
        }
        item.selected = selected;
        Some(item.clone())
    }

    /// Flip the selection flag of one data row.
    pub fn toggle_selected(&self, index: usize) -> Option<Item> {
        let current = self.lock().items.get(index).map(|item| item.selected)?;
        self.set_selected(index, !current)
    }

    // ========================================================================
    // Scrolling
    // ========================================================================

    /// Feed scroll telemetry from the renderer.
    ///
    /// The scroll-change callback only fires on top/away transitions; the
    /// raw callback sees every event.
    pub fn handle_scroll(&self, event: &ScrollEvent) {
        let transition = scroll::track(&mut self.lock(), event);

        if let (Some(callback), Some(scrolled_away)) = (&self.on_scroll_change, transition) {
            callback(scrolled_away);
        }
        if let Some(callback) = &self.on_scroll {
            callback(event);
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the current state to the session cache (when caching is on).
    pub fn persist(&self) -> Result<(), ListError> {
        if !self.options.cache {
            return Ok(());
        }
        let state = self.lock();
        self.cache.write(&self.key, &state)?;
        Ok(())
    }

    /// Persist and tear down. Equivalent to dropping the list.
    pub fn unmount(self) {
        drop(self);
    }
}

impl VirtualSource for InfiniteList {
    fn item_count(&self) -> usize {
        self.lock().item_count()
    }

    fn is_item_loaded(&self, index: usize) -> bool {
        self.lock().is_item_loaded(index)
    }

    fn load_more_items(&self, _start_index: usize, _stop_index: usize) -> Option<LoadFuture> {
        InfiniteList::load_more_items(self)
    }

    fn item_key(&self, index: usize) -> ItemKey {
        item_key(index, self.lock().items.get(index), &self.options.id_field)
    }
}

impl ListHandle for InfiniteList {
    fn clear_cache(&self) {
        self.send(ViewportCommand::ClearLoadedCache);
    }

    fn get_item(&self, index: usize) -> Option<Item> {
        self.lock().items.get(index).cloned()
    }

    /// Back to the empty state: rows, paging flags and scroll memory are
    /// cleared, the cleared state is persisted and the viewport is sent to
    /// the origin and told to refetch from page 1.
    fn reset(&self) -> Result<(), ListError> {
        let page = {
            let mut state = self.lock();
            let page = state.page;
            state.clear(self.options.has_header);
            page
        };
        tracing::info!(key = %self.key, discarded_pages = page, "List reset");

        let persisted = self.persist();
        self.send(ViewportCommand::ScrollTo { top: 0, left: 0 });
        self.send(ViewportCommand::ClearLoadedCache);
        self.send(ViewportCommand::Refetch);
        persisted
    }

    fn select_all(&self, selected: bool) -> usize {
        let mut state = self.lock();
        let mut changed = 0;
        for item in state.items.iter_mut().filter(|item| !item.is_sentinel()) {
            if item.selected != selected {
                item.selected = selected;
                changed += 1;
            }
        }
        changed
    }

    fn select_item(&self, index: usize) -> Option<Item> {
        self.set_selected(index, true)
    }

    /// Sort by `field`. A negative `order_index` sorts descending.
    ///
    /// With every page loaded the rows are reordered in place and the result
    /// persisted. Otherwise sorting a partial set would be misleading, so the
    /// list is reset and the next fetches carry the new order index to the
    /// provider.
    fn sort(
        &self,
        field: &str,
        display_type: DisplayType,
        order_index: i32,
    ) -> Result<SortOutcome, ListError> {
        let ascending = order_index >= 0;
        {
            let mut state = self.lock();
            state.order_index = Some(order_index);
            if state.loaded {
                sort_items(&mut state.items, field, display_type, ascending);
                tracing::debug!(field = %field, ascending, "Sorted loaded rows in place");
            } else {
                drop(state);
                tracing::debug!(field = %field, order_index, "Partial data; resetting for server-side sort");
                self.reset()?;
                return Ok(SortOutcome::Refetch);
            }
        }
        self.persist()?;
        Ok(SortOutcome::InPlace)
    }
}

impl Drop for InfiniteList {
    fn drop(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!(key = %self.key, error = %e, "Failed to persist list state on unmount");
        }
        if self.options.cache {
            self.cache.release(&self.key);
        }
    }
}

impl fmt::Debug for InfiniteList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfiniteList")
            .field("key", &self.key)
            .field("options", &self.options)
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}
