//! # quill-core
//!
//! Core types, settings, and error types for the quill query builder.
//! This crate has no database dependencies and provides the foundation for
//! all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`utils`] - Naming-convention text helpers
//! - [`settings`] - Logging and database settings
//! - [`settings_loader`] - TOML and environment loading for settings
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{QuillError, QuillResult};
pub use settings::{DatabaseSettings, Settings};
