//! # quill-db-backends
//!
//! Drivers implementing [`quill_db::Connection`]. Each driver lives behind a
//! cargo feature so applications only compile the ones they use.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#![allow(clippy::doc_markdown)]

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteStatement};
