//! Calavera chat client.
//!
//! The chat state machines (`session`, `toast`, `lightbox`, `typing`) are
//! plain types that run without a renderer; `ui` and `views` wire them to
//! Dioxus components.

pub mod api;
pub mod attachment;
pub mod config;
pub mod context;
pub mod format;
pub mod history;
pub mod lightbox;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod storage;
pub mod toast;
pub mod types;
pub mod typing;
pub mod ui;
pub mod views;
