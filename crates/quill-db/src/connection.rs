//! Connection and statement traits.
//!
//! This is the bridge between the query builders (`quill-db`) and concrete
//! drivers (`quill-db-backends`). Builders hold an `Arc<dyn Connection>` and
//! hand it rendered SQL plus positional parameters; the driver returns a
//! [`Statement`] whose resources are released when it is dropped.

use quill_core::QuillResult;

use crate::row::ResultSet;
use crate::value::Value;

/// A live database connection.
///
/// All access is synchronous. Implementations must be shareable across
/// threads because builders are `Send + Sync` values.
pub trait Connection: Send + Sync {
    /// The product name the database reports about itself (e.g. `SQLite`,
    /// `PostgreSQL`). Used to select the dialect.
    fn product_name(&self) -> QuillResult<String>;

    /// Prepares `sql`, binding `params` positionally in list order.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`](quill_core::QuillError::DatabaseError) if
    /// the statement cannot be prepared.
    fn prepare<'c>(&'c self, sql: &str, params: Vec<Value>) -> QuillResult<Box<dyn Statement + 'c>>;
}

/// A prepared statement with its parameters bound.
///
/// Dropping the statement closes it, on every exit path.
pub trait Statement {
    /// The SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    /// The bound parameters.
    fn params(&self) -> &[Value];

    /// Runs the statement as a query and fetches every row.
    fn query(&mut self) -> QuillResult<ResultSet>;

    /// Runs the statement for its side effect and returns the number of
    /// affected rows.
    fn execute(&mut self) -> QuillResult<u64>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! A recording connection for builder unit tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use quill_core::{QuillError, QuillResult};

    use super::{Connection, Statement};
    use crate::row::ResultSet;
    use crate::value::Value;

    /// Records every prepared statement and answers queries from a queue of
    /// canned result sets (empty once the queue runs dry).
    #[derive(Default)]
    pub struct RecordingConnection {
        pub product: String,
        pub log: Mutex<Vec<(String, Vec<Value>)>>,
        pub results: Mutex<VecDeque<ResultSet>>,
    }

    impl RecordingConnection {
        pub fn new(product: &str) -> Arc<Self> {
            Arc::new(Self {
                product: product.to_string(),
                ..Self::default()
            })
        }

        pub fn push_result(&self, rs: ResultSet) {
            self.results.lock().unwrap().push_back(rs);
        }

        pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Connection for RecordingConnection {
        fn product_name(&self) -> QuillResult<String> {
            Ok(self.product.clone())
        }

        fn prepare<'c>(
            &'c self,
            sql: &str,
            params: Vec<Value>,
        ) -> QuillResult<Box<dyn Statement + 'c>> {
            if sql.contains("FAIL") {
                return Err(QuillError::DatabaseError(format!("cannot prepare {sql}")));
            }
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), params.clone()));
            Ok(Box::new(RecordedStatement {
                conn: self,
                sql: sql.to_string(),
                params,
            }))
        }
    }

    pub struct RecordedStatement<'c> {
        conn: &'c RecordingConnection,
        sql: String,
        params: Vec<Value>,
    }

    impl Statement for RecordedStatement<'_> {
        fn sql(&self) -> &str {
            &self.sql
        }

        fn params(&self) -> &[Value] {
            &self.params
        }

        fn query(&mut self) -> QuillResult<ResultSet> {
            Ok(self
                .conn
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        fn execute(&mut self) -> QuillResult<u64> {
            Ok(1)
        }
    }

    #[test]
    fn test_connection_is_object_safe() {
        let conn: Arc<dyn Connection> = RecordingConnection::new("SQLite");
        assert_eq!(conn.product_name().unwrap(), "SQLite");
        let mut stmt = conn.prepare("SELECT 1", vec![Value::Int(1)]).unwrap();
        assert_eq!(stmt.sql(), "SELECT 1");
        assert_eq!(stmt.params(), &[Value::Int(1)]);
        assert!(stmt.query().unwrap().is_empty());
    }
}
