//! Utility functions for quill.
//!
//! - [`text`]: naming-convention helpers (`snake_case`, `camel_case`).

pub mod text;
