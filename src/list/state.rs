use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::item::{Item, LayoutDescriptor};

// ============================================================================
// List State
// ============================================================================

/// Complete state of one mounted list instance.
///
/// This is exactly what gets written to session storage, so a remounted list
/// can skip its first fetch and restore scroll position. Field names follow
/// the camelCase keys the cache has always used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListState {
    /// Display-ordered rows including header/footer/placeholder sentinels.
    pub items: Vec<Item>,
    /// Column metadata, set once from the first page.
    pub layouts: Option<Vec<LayoutDescriptor>>,
    /// Opaque side-channel payload from the first page.
    pub data: Option<Value>,
    /// Total record count, trusted once the terminal page has been fetched.
    pub records: Option<u64>,
    /// A page fetch is in flight.
    pub loading: bool,
    /// A page returned fewer rows than requested; no further fetches.
    pub loaded: bool,
    /// Last reserved page number (1-based, 0 = nothing requested yet).
    pub page: u32,
    /// Sort order forwarded to the provider. Sign encodes direction.
    pub order_index: Option<i32>,
    pub scroll_last: u32,
    pub scroll_top: u32,
    pub scroll_left: u32,
    /// Bumped by every reset so late fetch results can be recognised.
    #[serde(skip)]
    pub generation: u64,
}

impl ListState {
    /// A blank state with the header sentinel applied when requested.
    pub fn blank(has_header: bool) -> Self {
        let mut state = Self::default();
        format_items(&mut state.items, has_header, false);
        state
    }

    /// Number of virtual rows exposed to the renderer.
    ///
    /// While more pages may exist one extra slot is reported so the
    /// virtualization layer keeps asking for rows past the end.
    pub fn item_count(&self) -> usize {
        if self.loaded {
            self.items.len()
        } else {
            self.items.len() + 1
        }
    }

    pub fn is_item_loaded(&self, index: usize) -> bool {
        self.loaded || index < self.items.len()
    }

    /// Number of data rows (sentinels excluded).
    pub fn data_len(&self) -> usize {
        self.items.iter().filter(|item| !item.is_sentinel()).count()
    }

    /// Drop everything loaded so far, keeping the sort order.
    ///
    /// The generation counter moves forward so any fetch still in flight is
    /// recognised as stale when it resolves.
    pub fn clear(&mut self, has_header: bool) {
        let generation = self.generation.wrapping_add(1);
        let order_index = self.order_index;
        *self = Self::blank(has_header);
        self.order_index = order_index;
        self.generation = generation;
    }

    /// Remove the tail loading placeholder if present.
    pub(crate) fn remove_trailing_placeholder(&mut self) {
        if self.items.last().is_some_and(Item::is_placeholder) {
            self.items.pop();
        }
    }

    /// Append the tail loading placeholder unless one is already there.
    pub(crate) fn push_placeholder(&mut self) {
        if !self.items.last().is_some_and(Item::is_placeholder) {
            self.items.push(Item::loading_placeholder());
        }
    }
}

// ============================================================================
// Sentinel Formatting
// ============================================================================

/// Make header/footer sentinel placement agree with the requested flags.
///
/// - Inserts a header row at index 0 when one is requested and missing.
/// - Removes leading header rows when none is requested.
/// - Removes trailing footer rows when none is requested. Footers are only
///   ever appended by the page loader once the total is known, never here.
///
/// Idempotent: a second call with the same flags changes nothing.
pub fn format_items(items: &mut Vec<Item>, has_header: bool, has_footer: bool) {
    if has_header {
        if !items.first().is_some_and(Item::is_header) {
            items.insert(0, Item::header());
        }
    } else {
        while items.first().is_some_and(Item::is_header) {
            items.remove(0);
        }
    }

    if !has_footer {
        while items.last().is_some_and(Item::is_footer) {
            items.pop();
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_item() -> impl Strategy<Value = Item> {
        prop_oneof![
            any::<i64>().prop_map(|id| Item::default().with("id", id)),
            Just(Item::header()),
            Just(Item::footer()),
            Just(Item::loading_placeholder()),
        ]
    }

    proptest! {
        #[test]
        fn format_items_is_idempotent(
            mut items in proptest::collection::vec(arb_item(), 0..12),
            has_header in any::<bool>(),
            has_footer in any::<bool>(),
        ) {
            format_items(&mut items, has_header, has_footer);
            let once = items.clone();
            format_items(&mut items, has_header, has_footer);
            prop_assert_eq!(items, once);
        }

        #[test]
        fn header_presence_matches_flag(
            mut items in proptest::collection::vec(arb_item(), 0..12),
            has_footer in any::<bool>(),
        ) {
            format_items(&mut items, true, has_footer);
            prop_assert!(items[0].is_header());
        }
    }
}
