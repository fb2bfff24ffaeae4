//! Demo application state: one mounted list inside a terminal viewport.
//!
//! The `App` plays the part of the virtualization layer. It keeps the cursor
//! and the first visible row, asks the list which rows are loaded, requests
//! more pages when the viewport reaches the unloaded tail and obeys the
//! [`ViewportCommand`]s the list sends back.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use infinilist::context::ListContext;
use infinilist::list::{
    FailurePolicy, InfiniteList, LayoutDescriptor, ListHandle, PageOutcome, PageProvider,
    ScrollEvent, SortOutcome, ViewportCommand, VirtualSource,
};

/// Rows past the bottom of the viewport that still trigger a page request.
pub const LOAD_THRESHOLD: usize = 5;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Events
// ============================================================================

/// Results of background work, delivered to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A page fetch started by [`App::request_visible_pages`] finished.
    PageLoaded(Result<PageOutcome, String>),
}

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The list is mounted.
    List,
    /// Simulated navigation away; the list is unmounted.
    Elsewhere,
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub context: ListContext,
    provider: Arc<dyn PageProvider>,
    /// List name, also used as the route.
    pub entity: String,
    pub screen: Screen,
    pub list: Option<InfiniteList>,

    viewport_tx: mpsc::UnboundedSender<ViewportCommand>,
    viewport_rx: mpsc::UnboundedReceiver<ViewportCommand>,

    /// Row under the cursor.
    pub cursor: usize,
    /// First visible row.
    pub offset: usize,
    /// Rows that fit in the grid, updated on every draw.
    pub viewport_height: usize,
    /// Column the next sort applies to (index into the layouts).
    pub sort_column: usize,
    /// Last sort applied, as `(column label, descending)`.
    pub sorted_by: Option<(String, bool)>,

    /// First unloaded row already handed to `load_more_items`. Forgotten on
    /// `ClearLoadedCache`.
    requested: Option<usize>,
    load_handle: Option<JoinHandle<()>>,

    /// Set by the list's scroll-change callback.
    scrolled_away: Arc<AtomicBool>,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub spinner_frame: usize,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(context: ListContext, provider: Arc<dyn PageProvider>, entity: impl Into<String>) -> Self {
        let (viewport_tx, viewport_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            context,
            provider,
            entity: entity.into(),
            screen: Screen::List,
            list: None,
            viewport_tx,
            viewport_rx,
            cursor: 0,
            offset: 0,
            viewport_height: 20,
            sort_column: 0,
            sorted_by: None,
            requested: None,
            load_handle: None,
            scrolled_away: Arc::new(AtomicBool::new(false)),
            status_message: None,
            spinner_frame: 0,
            needs_redraw: true,
        };
        app.mount_list();
        app
    }

    /// Route the list is mounted at; part of its cache key.
    pub fn location(&self) -> String {
        format!("/{}", self.entity)
    }

    fn mount_list(&mut self) {
        let options = self.context.options(&self.entity);
        let flag = Arc::clone(&self.scrolled_away);
        flag.store(false, Ordering::Relaxed);

        let list = InfiniteList::mount(
            &self.context,
            options,
            Arc::clone(&self.provider),
            &self.location(),
        )
        .on_scroll_change(move |away| flag.store(away, Ordering::Relaxed))
        .with_viewport(self.viewport_tx.clone());

        if list.is_restored() {
            self.set_status(format!("Restored {} rows from session cache", list.len()));
        }
        self.list = Some(list);
        self.cursor = 0;
        self.offset = 0;
        self.requested = None;
        self.screen = Screen::List;
    }

    /// Toggle between the list and another screen. Leaving unmounts the list
    /// (persisting it); coming back mounts a fresh instance.
    pub fn navigate(&mut self) {
        match self.screen {
            Screen::List => {
                if let Some(list) = self.list.take() {
                    tracing::info!(key = %list.key(), "Navigating away from list");
                    list.unmount();
                }
                self.abort_load();
                self.screen = Screen::Elsewhere;
            }
            Screen::Elsewhere => self.mount_list(),
        }
        self.needs_redraw = true;
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    /// The viewport has left the first row (drives the scroll-to-top hint).
    pub fn is_scrolled_away(&self) -> bool {
        self.scrolled_away.load(Ordering::Relaxed)
    }

    pub fn is_fetching(&self) -> bool {
        self.load_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Column layouts from the first page, or one text column per field of
    /// the first data row when the provider sent none.
    pub fn columns(&self) -> Vec<LayoutDescriptor> {
        let Some(list) = &self.list else {
            return Vec::new();
        };
        if let Some(layouts) = list.layouts().filter(|l| !l.is_empty()) {
            return layouts;
        }
        list.with_items(|items| {
            items
                .iter()
                .find(|item| !item.is_sentinel())
                .map(|item| {
                    item.fields
                        .keys()
                        .map(|field| LayoutDescriptor::new(field, field))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    // ========================================================================
    // Cursor & Scrolling
    // ========================================================================

    fn row_count(&self) -> usize {
        self.list.as_ref().map_or(0, |list| list.item_count())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.row_count().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.scroll_into_view();
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
        self.scroll_into_view();
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.row_count().saturating_sub(1);
        self.scroll_into_view();
    }

    /// Adjust the first visible row so the cursor is on screen.
    pub fn scroll_into_view(&mut self) {
        let height = self.viewport_height.max(1);
        let offset = if self.cursor < self.offset {
            self.cursor
        } else if self.cursor >= self.offset + height {
            self.cursor + 1 - height
        } else {
            self.offset
        };
        self.set_offset(offset);
    }

    fn set_offset(&mut self, offset: usize) {
        if offset == self.offset {
            return;
        }
        let previous = self.offset;
        self.offset = offset;
        if let Some(list) = &self.list {
            let top = u32::try_from(offset).unwrap_or(u32::MAX);
            let previous = u32::try_from(previous).unwrap_or(u32::MAX);
            list.handle_scroll(&ScrollEvent::vertical(top, previous));
        }
    }

    // ========================================================================
    // Viewport Commands
    // ========================================================================

    /// Apply every command the list has sent since the last call.
    pub fn drain_viewport_commands(&mut self) {
        while let Ok(command) = self.viewport_rx.try_recv() {
            self.apply_viewport_command(command);
        }
    }

    fn apply_viewport_command(&mut self, command: ViewportCommand) {
        tracing::debug!(?command, "Viewport command");
        self.needs_redraw = true;
        match command {
            ViewportCommand::ClearLoadedCache => self.requested = None,
            ViewportCommand::ScrollTo { top, left } => {
                let top = (top as usize).min(self.row_count().saturating_sub(1));
                let previous = std::mem::replace(&mut self.offset, top);
                self.cursor = top;
                if let Some(list) = &self.list {
                    let to = u32::try_from(top).unwrap_or(u32::MAX);
                    let from = u32::try_from(previous).unwrap_or(u32::MAX);
                    list.handle_scroll(&ScrollEvent {
                        left,
                        requested: true,
                        ..ScrollEvent::vertical(to, from)
                    });
                }
                self.scrolled_away.store(top > 0, Ordering::Relaxed);
            }
            ViewportCommand::Refetch => {
                self.abort_load();
                self.requested = None;
            }
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// First row in (or just below) the viewport that is not loaded yet.
    pub fn first_unloaded_visible(&self) -> Option<usize> {
        let list = self.list.as_ref()?;
        let end = (self.offset + self.viewport_height + LOAD_THRESHOLD).min(list.item_count());
        (self.offset..end).find(|&index| !list.is_item_loaded(index))
    }

    /// Ask the list for more rows when the viewport reaches unloaded ones.
    ///
    /// A row that was already requested is not asked for again until the
    /// list clears the loaded cache.
    pub fn request_visible_pages(&mut self, event_tx: &mpsc::Sender<AppEvent>) {
        let Some(start) = self.first_unloaded_visible() else {
            return;
        };
        if self.requested == Some(start) {
            return;
        }
        let Some(list) = &self.list else {
            return;
        };

        self.requested = Some(start);
        let stop = start + list.options().page_size as usize - 1;
        let Some(load) = VirtualSource::load_more_items(list, start, stop) else {
            tracing::debug!(start, "Load refused by list");
            return;
        };

        let tx = event_tx.clone();
        self.load_handle = Some(tokio::spawn(async move {
            let result = load.await.map_err(|e| e.to_string());
            if let Err(e) = tx.send(AppEvent::PageLoaded(result)).await {
                tracing::warn!(error = %e, "Failed to deliver page result (receiver dropped)");
            }
        }));
        self.needs_redraw = true;
    }

    fn abort_load(&mut self) {
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
        }
    }

    /// A failed page can be asked for again without a reset.
    fn can_retry(&self) -> bool {
        self.list
            .as_ref()
            .is_some_and(|list| list.options().failure_policy == FailurePolicy::Rewind)
    }

    /// Forget the last request so the tail is asked for again.
    ///
    /// Under the latch policy a failed list refuses further loads, so only a
    /// reset helps.
    pub fn retry_load(&mut self) {
        if !self.can_retry() {
            self.set_status("Loading is blocked after a failure; press [r] to reset");
            return;
        }
        self.requested = None;
        self.needs_redraw = true;
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        self.needs_redraw = true;
        match event {
            AppEvent::PageLoaded(Ok(PageOutcome::Appended { loaded: true, .. })) => {
                let records = self.list.as_ref().and_then(InfiniteList::records).unwrap_or(0);
                self.set_status(format!("All {records} records loaded"));
            }
            AppEvent::PageLoaded(Ok(PageOutcome::Appended { page, received, .. })) => {
                tracing::debug!(page, received, "Page arrived");
            }
            AppEvent::PageLoaded(Ok(PageOutcome::Stale { page })) => {
                tracing::debug!(page, "Stale page dropped");
            }
            AppEvent::PageLoaded(Err(e)) => {
                let hint = if self.can_retry() {
                    "[R] retry, [r] reset"
                } else {
                    "[r] reset"
                };
                self.set_status(format!("Load failed: {e} ({hint})"));
            }
        }
    }

    // ========================================================================
    // List Commands
    // ========================================================================

    pub fn toggle_selection(&mut self) {
        let Some(list) = &self.list else { return };
        if list.toggle_selected(self.cursor).is_none() {
            self.set_status("Only data rows can be selected");
        }
    }

    /// Select every loaded row, or clear the selection if all are selected.
    pub fn toggle_select_all(&mut self) {
        let Some(list) = &self.list else { return };
        let data_rows = list.data_len();
        let all_selected = list.selected_items().len() == data_rows;
        let changed = list.select_all(!all_selected);
        let total = list.selected_items().len();
        self.set_status(format!("{changed} rows changed, {total} selected"));
    }

    pub fn sort(&mut self, descending: bool) {
        let columns = self.columns();
        let Some(column) = columns.get(self.sort_column) else {
            self.set_status("Nothing to sort yet");
            return;
        };
        let Some(list) = &self.list else { return };

        let position = i32::try_from(self.sort_column + 1).unwrap_or(i32::MAX);
        let order_index = if descending { -position } else { position };
        let outcome = list.sort(&column.field, column.display_type, order_index);
        let rows = list.len();
        match outcome {
            Ok(SortOutcome::InPlace) => {
                self.set_status(format!("Sorted {rows} rows by {}", column.label));
            }
            Ok(SortOutcome::Refetch) => {
                self.set_status(format!("Reloading sorted by {}", column.label));
            }
            Err(e) => self.set_status(format!("Sort failed: {e}")),
        }
        self.sorted_by = Some((column.label.clone(), descending));
    }

    pub fn cycle_sort_column(&mut self, delta: isize) {
        let count = self.columns().len();
        if count == 0 {
            return;
        }
        let next = (self.sort_column as isize + delta).rem_euclid(count as isize);
        self.sort_column = next as usize;
    }

    pub fn reset(&mut self) {
        let Some(list) = &self.list else { return };
        match list.reset() {
            Ok(()) => self.set_status("List reset"),
            Err(e) => self.set_status(format!("Reset failed to persist: {e}")),
        }
        self.sorted_by = None;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.load_handle.take() {
            handle.abort();
            tracing::debug!("Aborted page load task on App drop");
        }
    }
}
