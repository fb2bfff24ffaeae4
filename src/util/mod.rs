//! Unicode-aware text helpers for drawing list cells in a terminal.

mod text;

pub use text::{display_width, fit_cell, pad_to_width, sanitize_cell, truncate_to_width};
