//! Test database utilities for quill.
//!
//! Provides [`TestDatabase`], an in-memory SQLite database for use in tests.
//! It implements [`Connection`] by delegating to a [`SqliteConnection`] and
//! recording every statement it prepares, so tests can inspect the SQL the
//! builders produced and count round trips.
//!
//! ## Example
//!
//! ```
//! use quill_test::TestDatabase;
//!
//! let db = TestDatabase::new();
//! db.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
//!     .unwrap();
//! let count: Option<i64> = db
//!     .query_builder()
//!     .select_sql("COUNT(*)")
//!     .from("users")
//!     .first_as()
//!     .unwrap();
//! assert_eq!(count, Some(0));
//! assert_eq!(db.query_count(), 2);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use quill_core::QuillResult;
use quill_db::model::{Mapping, Model};
use quill_db::naming::column_for;
use quill_db::{Connection, Dialect, QueryBuilder, QueryBuilderBase, Statement, Value};
use quill_db_backends::SqliteConnection;

/// One statement prepared through a [`TestDatabase`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    /// The SQL text.
    pub sql: String,
    /// The bound parameters, in placeholder order.
    pub params: Vec<Value>,
}

/// An in-memory SQLite database for testing.
///
/// Clones share the database and the statement log. Each
/// `TestDatabase::new()` call creates a fresh database, so tests are fully
/// isolated from each other.
#[derive(Clone)]
pub struct TestDatabase {
    conn: Arc<SqliteConnection>,
    log: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl TestDatabase {
    /// Creates a new in-memory SQLite test database.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be created.
    pub fn new() -> Self {
        let conn =
            SqliteConnection::memory().expect("Failed to create in-memory SQLite database");
        Self {
            conn: Arc::new(conn),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A root builder whose statements run on, and are recorded by, this
    /// database.
    ///
    /// # Panics
    ///
    /// Never in practice: SQLite always maps to a dialect.
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(Arc::new(self.clone())).expect("SQLite maps to a dialect")
    }

    /// Creates the table for `M` from its field table.
    ///
    /// Plain members become untyped columns (SQLite keeps each value's
    /// storage class), an `id` member becomes `INTEGER PRIMARY KEY`, and
    /// belongs-to members become `INTEGER` foreign key columns. Relations
    /// held by other tables and ignored members get no column.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn setup_table<M: Model>(&self) -> QuillResult<()> {
        let sql = Self::create_table_sql::<M>();
        self.execute_raw(&sql)
    }

    /// Drops all user-created tables in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn teardown(&self) -> QuillResult<()> {
        let tables: Vec<String> = self
            .query_builder()
            .where_sql("type = 'table' AND name NOT LIKE 'sqlite_%'", Vec::new())
            .columns(["name"])
            .from("sqlite_master")
            .all_as()?;

        for table in tables {
            self.execute_raw(&format!(
                "DROP TABLE IF EXISTS {}",
                Dialect::Sql99.escape(&table)
            ))?;
        }
        Ok(())
    }

    /// Executes raw SQL with no parameters. The batch is recorded as one
    /// statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn execute_raw(&self, sql: &str) -> QuillResult<()> {
        self.record(sql, Vec::new());
        self.conn.execute_batch(sql)
    }

    /// Every statement prepared so far, oldest first.
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.log.lock().expect("query log lock poisoned").clone()
    }

    /// The SQL of the most recent statement.
    pub fn last_sql(&self) -> Option<String> {
        self.log
            .lock()
            .expect("query log lock poisoned")
            .last()
            .map(|q| q.sql.clone())
    }

    /// Returns the current query count.
    pub fn query_count(&self) -> usize {
        self.log.lock().expect("query log lock poisoned").len()
    }

    /// Clears the statement log.
    pub fn reset_query_count(&self) {
        self.log.lock().expect("query log lock poisoned").clear();
    }

    /// Returns a reference to the inner `SqliteConnection`.
    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    fn record(&self, sql: &str, params: Vec<Value>) {
        tracing::trace!(sql, "recording statement");
        self.log
            .lock()
            .expect("query log lock poisoned")
            .push(RecordedQuery {
                sql: sql.to_string(),
                params,
            });
    }

    /// Generates a `CREATE TABLE IF NOT EXISTS` statement from model metadata.
    fn create_table_sql<M: Model>() -> String {
        let dialect = Dialect::Sql99;
        let meta = M::meta();
        let mut seen = HashSet::new();
        let mut col_defs: Vec<String> = Vec::new();

        for field in meta.fields() {
            if meta.is_only_declared() && !field.is_declared() {
                continue;
            }
            let type_str = match field.mapping() {
                Mapping::Value => "",
                Mapping::BelongsTo => " INTEGER",
                Mapping::HasOne | Mapping::HasMany | Mapping::Ignore => continue,
            };
            let column = column_for(field);
            if !seen.insert(column.clone()) {
                continue;
            }
            let type_str = if column == "id" {
                " INTEGER PRIMARY KEY"
            } else {
                type_str
            };
            col_defs.push(format!("{}{type_str}", dialect.escape(&column)));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            dialect.escape(&M::table_name()),
            col_defs.join(", ")
        )
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for TestDatabase {
    fn product_name(&self) -> QuillResult<String> {
        self.conn.product_name()
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        params: Vec<Value>,
    ) -> QuillResult<Box<dyn Statement + 'c>> {
        let stmt = self.conn.prepare(sql, params.clone())?;
        self.record(sql, params);
        Ok(stmt)
    }
}
