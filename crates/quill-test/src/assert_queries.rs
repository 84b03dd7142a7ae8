//! Query counting assertions for database tests.
//!
//! [`assert_num_queries`] counts the statements prepared on a
//! [`TestDatabase`] while a closure runs and asserts the count matches. This
//! is how relation loading is checked for N+1 behavior: each included
//! relation costs one query per parent row.
//!
//! ## Example
//!
//! ```
//! use quill_test::{assert_num_queries, TestDatabase};
//!
//! let db = TestDatabase::new();
//! db.execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT)")
//!     .unwrap();
//!
//! let affected = assert_num_queries(&db, 1, || {
//!     quill_db::QueryBuilder::into(&db.query_builder(), "t")
//!         .set("val", "x")
//!         .insert()
//!         .unwrap()
//! });
//! assert_eq!(affected, 1);
//! ```

use crate::test_database::TestDatabase;

/// Asserts that exactly `expected_count` statements are prepared while `f`
/// runs, and returns what `f` returned.
///
/// Resets the statement log on the [`TestDatabase`] first. On failure the
/// message lists the recorded SQL.
///
/// # Panics
///
/// Panics if the number of queries does not match `expected_count`.
pub fn assert_num_queries<F, R>(db: &TestDatabase, expected_count: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    db.reset_query_count();
    let result = f();
    let actual = db.query_count();
    assert_eq!(
        actual,
        expected_count,
        "Expected {expected_count} SQL queries, but {actual} were executed:\n{}",
        recorded_sql(db)
    );
    result
}

/// Asserts that at most `max_count` statements are prepared while `f` runs,
/// and returns what `f` returned.
///
/// Useful when the exact count is not important but you want to prevent query
/// count regression.
///
/// # Panics
///
/// Panics if more than `max_count` queries are executed.
pub fn assert_max_queries<F, R>(db: &TestDatabase, max_count: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    db.reset_query_count();
    let result = f();
    let actual = db.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} SQL queries, but {actual} were executed:\n{}",
        recorded_sql(db)
    );
    result
}

fn recorded_sql(db: &TestDatabase) -> String {
    db.queries()
        .iter()
        .map(|q| format!("  {}", q.sql))
        .collect::<Vec<_>>()
        .join("\n")
}
