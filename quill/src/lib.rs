//! # quill
//!
//! A dialect-aware, immutable SQL builder with a small convention-driven ORM
//! on top.
//!
//! This is the facade crate that re-exports the sub-crates for convenient
//! access. Depend on `quill` to get everything, or on individual crates for
//! finer-grained control.
//!
//! ```
//! use quill::prelude::*;
//!
//! let db = QueryBuilder::with_dialect(Dialect::PostgreSql);
//! let sql = db
//!     .where_eq("screenname", "Mathias")
//!     .from("users")
//!     .order_by(&[desc("id")])
//!     .limit(3)
//!     .to_sql()
//!     .unwrap();
//! assert_eq!(
//!     sql,
//!     r#"SELECT "users".* FROM "users" WHERE ("users"."screenname" = ?) ORDER BY "users"."id" DESC LIMIT 3"#
//! );
//! ```

/// Settings, logging and error types.
pub use quill_core as core;

/// Dialects, builders, values and the model layer.
pub use quill_db as db;

/// Database drivers.
pub use quill_db_backends as db_backends;

// Third-party crates whose types appear in quill's API.
pub use chrono;
pub use serde_json;
pub use uuid;

/// Testing utilities: recording in-memory database and query-count
/// assertions.
#[cfg(feature = "testing")]
pub use quill_test as test;

pub use quill_core::{QuillError, QuillResult, Settings};

/// Everything needed to build queries and describe models.
pub mod prelude {
    pub use quill_core::{QuillError, QuillResult};
    pub use quill_db::model::{Field, Model, ModelMeta};
    pub use quill_db::{
        args, asc, desc, name, Connection, Dialect, FromRow, FromValue, Order, QueryBuilder,
        QueryBuilderBase, ResultSet, Row, SelectBuilder, UpdateArgs, Value, ValueMap,
    };

    #[cfg(feature = "sqlite")]
    pub use quill_db_backends::SqliteConnection;
}

/// Opens the database named in `settings` and returns a root builder for it.
///
/// # Errors
///
/// Returns [`QuillError::ImproperlyConfigured`] if no compiled-in driver
/// handles `settings.database.product_name`, and any error from opening the
/// database.
pub fn connect(settings: &Settings) -> QuillResult<quill_db::QueryBuilder> {
    let database = &settings.database;
    tracing::debug!(
        product = %database.product_name,
        name = %database.name,
        "connecting"
    );
    #[cfg(feature = "sqlite")]
    if database.product_name.eq_ignore_ascii_case("sqlite") {
        let conn = quill_db_backends::SqliteConnection::from_settings(database)?;
        return quill_db::QueryBuilder::new(std::sync::Arc::new(conn));
    }
    Err(QuillError::ImproperlyConfigured(format!(
        "no driver for database product {}",
        database.product_name
    )))
}
