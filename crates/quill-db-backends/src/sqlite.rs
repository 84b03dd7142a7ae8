//! SQLite driver using `rusqlite`.
//!
//! [`SqliteConnection`] implements [`Connection`] over a single
//! `rusqlite::Connection` guarded by a `Mutex`. Statements are validated
//! when prepared and compiled through rusqlite's statement cache when run,
//! so repeated builder queries reuse the compiled statement.
//!
//! Features:
//! - In-memory database support via the `:memory:` path (used by the tests)
//! - WAL journal mode and foreign key enforcement on file databases
//! - Extra `PRAGMA`s from [`DatabaseSettings::options`]

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use quill_core::logging::statement_span;
use quill_core::{DatabaseSettings, QuillError, QuillResult};
use quill_db::{Connection, ResultSet, Statement, Value};
use rusqlite::types::ValueRef;

const MEMORY: &str = ":memory:";

/// A connection to one SQLite database.
pub struct SqliteConnection {
    path: PathBuf,
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Opens the database at `path`, creating the file if needed.
    ///
    /// The path `:memory:` opens a private in-memory database. File
    /// databases get WAL journaling; every database enforces foreign keys.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::OperationalError`] if the database cannot be
    /// opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> QuillResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(MEMORY);
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| QuillError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| QuillError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "opened SQLite database");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> QuillResult<Self> {
        Self::open(MEMORY)
    }

    /// Opens the database named by `settings`.
    ///
    /// Each entry of `settings.options` is applied as `PRAGMA key=value`
    /// after the defaults, so options can override them.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::ImproperlyConfigured`] if the settings name a
    /// product other than SQLite, otherwise any error from [`Self::open`] or
    /// from applying the options.
    pub fn from_settings(settings: &DatabaseSettings) -> QuillResult<Self> {
        if !settings.product_name.eq_ignore_ascii_case("sqlite") {
            return Err(QuillError::ImproperlyConfigured(format!(
                "SQLite driver cannot open a {} database",
                settings.product_name
            )));
        }
        let connection = Self::open(&settings.name)?;

        let mut options: Vec<_> = settings.options.iter().collect();
        options.sort();
        for (key, value) in options {
            if !is_pragma_name(key) {
                return Err(QuillError::ImproperlyConfigured(format!(
                    "invalid SQLite option name: {key}"
                )));
            }
            if !is_pragma_value(value) {
                return Err(QuillError::ImproperlyConfigured(format!(
                    "invalid SQLite option value for {key}: {value}"
                )));
            }
            connection
                .execute_batch(&format!("PRAGMA {key}={value};"))
                .map_err(|e| match e {
                    QuillError::DatabaseError(msg) => QuillError::ImproperlyConfigured(format!(
                        "SQLite option {key}={value} rejected: {msg}"
                    )),
                    other => other,
                })?;
        }
        Ok(connection)
    }

    /// The database file path, or `:memory:`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one or more `;`-separated statements without parameters. Used
    /// for schema setup.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::DatabaseError`] if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> QuillResult<()> {
        tracing::debug!(sql, "executing batch");
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| QuillError::DatabaseError(format!("{e}")))
    }

    /// The rowid of the most recent successful INSERT on this connection.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::OperationalError`] if the connection lock is
    /// poisoned.
    pub fn last_insert_rowid(&self) -> QuillResult<i64> {
        Ok(self.lock()?.last_insert_rowid())
    }

    fn lock(&self) -> QuillResult<MutexGuard<'_, rusqlite::Connection>> {
        self.conn.lock().map_err(|_| {
            QuillError::OperationalError("SQLite connection lock poisoned".to_string())
        })
    }

    /// Compiles `sql` through the statement cache and binds `params`.
    fn with_statement<T>(
        &self,
        sql: &str,
        params: &[Value],
        run: impl FnOnce(&mut rusqlite::Statement<'_>) -> QuillResult<T>,
    ) -> QuillResult<T> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| QuillError::DatabaseError(format!("{e}")))?;
        bind_params(&mut stmt, params)?;
        run(&mut *stmt)
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Connection for SqliteConnection {
    fn product_name(&self) -> QuillResult<String> {
        Ok("SQLite".to_string())
    }

    fn prepare<'c>(&'c self, sql: &str, params: Vec<Value>) -> QuillResult<Box<dyn Statement + 'c>> {
        {
            let conn = self.lock()?;
            let stmt = conn
                .prepare_cached(sql)
                .map_err(|e| QuillError::DatabaseError(format!("{e}")))?;
            if stmt.parameter_count() != params.len() {
                return Err(QuillError::DatabaseError(format!(
                    "statement expects {} parameters, got {}: {sql}",
                    stmt.parameter_count(),
                    params.len()
                )));
            }
        }
        Ok(Box::new(SqliteStatement {
            conn: self,
            sql: sql.to_string(),
            params,
        }))
    }
}

/// A statement prepared on a [`SqliteConnection`].
///
/// The compiled form lives in the connection's statement cache, so dropping
/// this value releases nothing but the SQL text and parameters.
pub struct SqliteStatement<'c> {
    conn: &'c SqliteConnection,
    sql: String,
    params: Vec<Value>,
}

impl fmt::Debug for SqliteStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Statement for SqliteStatement<'_> {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &[Value] {
        &self.params
    }

    fn query(&mut self) -> QuillResult<ResultSet> {
        let _span = statement_span("SQLite", &self.sql).entered();
        self.conn.with_statement(&self.sql, &self.params, |stmt| {
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.raw_query();
            let mut values = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| QuillError::DatabaseError(format!("{e}")))?
            {
                values.push(convert_row(row, columns.len())?);
            }
            tracing::trace!(rows = values.len(), "query returned");
            Ok(ResultSet::new(columns, values))
        })
    }

    fn execute(&mut self) -> QuillResult<u64> {
        let _span = statement_span("SQLite", &self.sql).entered();
        self.conn.with_statement(&self.sql, &self.params, |stmt| {
            let affected = stmt
                .raw_execute()
                .map_err(|e| QuillError::DatabaseError(format!("{e}")))?;
            tracing::trace!(affected, "statement executed");
            Ok(affected as u64)
        })
    }
}

/// PRAGMA names are plain identifiers.
fn is_pragma_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// PRAGMA values are a keyword or an optionally negative integer.
fn is_pragma_value(value: &str) -> bool {
    is_pragma_name(value.strip_prefix('-').unwrap_or(value))
}

/// Binds quill values to a `rusqlite` statement, one-based.
///
/// SQLite has no calendar, UUID or JSON storage classes; those bind as text
/// in the formats the quill `FromValue` conversions read back.
fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> QuillResult<()> {
    for (i, param) in params.iter().enumerate() {
        let idx = i + 1;
        match param {
            Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
            Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
            Value::Int(v) => stmt.raw_bind_parameter(idx, v),
            Value::Float(v) => stmt.raw_bind_parameter(idx, v),
            Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
            Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
            Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string()),
            Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string()),
            Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339()),
            Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string()),
            Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string()),
            Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string()),
            Value::List(_) => {
                return Err(QuillError::UnsupportedOperation(
                    "arrays are not supported by SQLite".to_string(),
                ))
            }
        }
        .map_err(|e| QuillError::DatabaseError(format!("Bind error: {e}")))?;
    }
    Ok(())
}

/// Converts one `rusqlite` row by storage class.
fn convert_row(row: &rusqlite::Row<'_>, width: usize) -> QuillResult<Vec<Value>> {
    (0..width)
        .map(|i| {
            let value = row
                .get_ref(i)
                .map_err(|e| QuillError::DatabaseError(format!("{e}")))?;
            Ok(match value {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Int(v),
                ValueRef::Real(v) => Value::Float(v),
                ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
            })
        })
        .collect()
}
