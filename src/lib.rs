pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod download;
pub mod session;
pub mod ui;
pub mod util;
