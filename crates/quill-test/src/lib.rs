//! # quill-test
//!
//! Testing utilities for quill. Provides [`TestDatabase`], an in-memory
//! SQLite connection that records every statement it prepares, and the
//! [`assert_num_queries`] / [`assert_max_queries`] helpers built on it for
//! catching N+1 relation loading.

pub mod assert_queries;
pub mod test_database;

pub use assert_queries::{assert_max_queries, assert_num_queries};
pub use test_database::{RecordedQuery, TestDatabase};
