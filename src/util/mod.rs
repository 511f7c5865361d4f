//! Text utilities for terminal rendering.
//!
//! Task and topic titles come straight from the server, so before they hit
//! a ratatui cell they get control characters stripped and are truncated to
//! the column budget with Unicode-aware widths.

mod text;

pub use text::{display_width, strip_control_chars, truncate_to_width};
