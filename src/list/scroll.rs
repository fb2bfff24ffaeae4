use super::state::ListState;

/// Which way the viewport moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Raw scroll telemetry reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollEvent {
    pub top: u32,
    pub left: u32,
    pub direction: ScrollDirection,
    /// The scroll was caused programmatically (e.g. a restore), not by the user.
    pub requested: bool,
}

impl ScrollEvent {
    pub fn vertical(top: u32, previous_top: u32) -> Self {
        Self {
            top,
            left: 0,
            direction: if top >= previous_top {
                ScrollDirection::Forward
            } else {
                ScrollDirection::Backward
            },
            requested: false,
        }
    }
}

/// Record the new offsets and report a top/away transition.
///
/// Returns `Some(true)` when the viewport just left the top, `Some(false)`
/// when it just returned to it, and `None` for any other movement.
pub(crate) fn track(state: &mut ListState, event: &ScrollEvent) -> Option<bool> {
    let was_at_top = state.scroll_last == 0;
    let is_at_top = event.top == 0;

    state.scroll_top = event.top;
    state.scroll_left = event.left;
    state.scroll_last = event.top;

    (was_at_top != is_at_top).then_some(!is_at_top)
}
