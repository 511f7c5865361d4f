//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Frame layout dispatch
//! - `topics` - Topic sidebar widget
//! - `tasks` - Task list widget with pagination footer
//! - `auth` - Login/registration overlay
//! - `status` - Header and status bar widgets

mod auth;
mod input;
mod loop_runner;
mod render;
mod status;
mod tasks;
mod topics;

pub use loop_runner::{run, Action};
