//! Terminal renderer for the demo binary.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Screen layout and the virtualized row window
//! - `grid` - Cell formatting per display type
//! - `status` - Status bar widget

mod grid;
mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};
