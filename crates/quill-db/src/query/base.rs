//! Behavior shared by every builder: WHERE composition, rendering and
//! statement preparation.
//!
//! Builders are immutable. Each call returns a new value that shares the
//! previous builder's condition list and adds one node on top, so earlier
//! builders can keep being used (and extended differently) afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quill_core::{QuillError, QuillResult};

use super::fragment::{Arg, ColumnName, QueryFragment};
use crate::connection::{Connection, Statement};
use crate::dialect::Dialect;
use crate::value::Value;

/// A persistent, append-only list of WHERE fragments.
///
/// Appending allocates one node and shares the rest with the original list.
#[derive(Clone, Default)]
pub struct Conditions {
    head: Option<Arc<Node>>,
}

struct Node {
    fragment: QueryFragment,
    prev: Option<Arc<Node>>,
    len: usize,
}

impl Conditions {
    /// Returns a new list with `fragment` appended.
    #[must_use]
    pub fn push(&self, fragment: QueryFragment) -> Self {
        let len = self.len() + 1;
        Self {
            head: Some(Arc::new(Node {
                fragment,
                prev: self.head.clone(),
                len,
            })),
        }
    }

    /// Returns the number of fragments.
    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    /// Returns `true` if there are no fragments.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the fragments in the order they were added.
    pub fn fragments(&self) -> Vec<&QueryFragment> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            out.push(&node.fragment);
            cursor = node.prev.as_deref();
        }
        out.reverse();
        out
    }

    /// Appends ` WHERE (a) AND (b) ...` to `out`. Nothing is written for an
    /// empty list.
    pub(crate) fn render(
        &self,
        dialect: Dialect,
        table: Option<&str>,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> QuillResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        out.push_str(" WHERE (");
        for (i, fragment) in self.fragments().into_iter().enumerate() {
            if i > 0 {
                out.push_str(") AND (");
            }
            fragment.generate(dialect, table, out, params)?;
        }
        out.push(')');
        Ok(())
    }
}

impl fmt::Debug for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fragments()).finish()
    }
}

/// The connection, dialect and WHERE list every builder carries.
#[derive(Clone, Default)]
pub struct BuilderState {
    pub(crate) conn: Option<Arc<dyn Connection>>,
    pub(crate) dialect: Dialect,
    pub(crate) conditions: Conditions,
}

impl BuilderState {
    /// The same connection and dialect with an empty WHERE list.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            dialect: self.dialect,
            conditions: Conditions::default(),
        }
    }

    pub(crate) fn connection(&self) -> QuillResult<&Arc<dyn Connection>> {
        self.conn.as_ref().ok_or_else(|| {
            QuillError::ImproperlyConfigured(
                "builder has no connection; it can only render SQL".to_string(),
            )
        })
    }

    /// Prepares `sql` on the attached connection.
    pub(crate) fn prepare(
        &self,
        sql: &str,
        params: Vec<Value>,
    ) -> QuillResult<Box<dyn Statement + '_>> {
        let conn = self.connection()?;
        tracing::debug!(
            dialect = self.dialect.name(),
            params = params.len(),
            "prepare: {sql}"
        );
        conn.prepare(sql, params)
    }
}

impl fmt::Debug for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderState")
            .field("connected", &self.conn.is_some())
            .field("dialect", &self.dialect)
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// Operations shared by [`QueryBuilder`](super::QueryBuilder) and
/// [`SelectBuilder`](super::SelectBuilder).
///
/// Every method takes `&self` and returns a new builder; the receiver is
/// never changed.
pub trait QueryBuilderBase: Sized {
    /// The shared builder state.
    fn state(&self) -> &BuilderState;

    /// Returns a copy of this builder with a different WHERE list.
    #[must_use]
    fn with_conditions(&self, conditions: Conditions) -> Self;

    /// Renders the statement, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// Returns construction errors (undefined table, argument count
    /// mismatch) and dialect capability errors.
    fn to_sql_with(&self, params: &mut Vec<Value>) -> QuillResult<String>;

    /// The dialect SQL is rendered for.
    fn dialect(&self) -> Dialect {
        self.state().dialect
    }

    /// Appends a WHERE fragment.
    #[must_use]
    fn filter(&self, fragment: QueryFragment) -> Self {
        self.with_conditions(self.state().conditions.push(fragment))
    }

    /// Appends a WHERE fragment with positional `?` placeholders.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_db::args;
    /// use quill_db::dialect::Dialect;
    /// use quill_db::query::{QueryBuilder, QueryBuilderBase};
    ///
    /// let q = QueryBuilder::with_dialect(Dialect::Sql99)
    ///     .from("users")
    ///     .where_sql("id > ? AND id < ?", args![1, 10]);
    /// assert_eq!(
    ///     q.to_sql().unwrap(),
    ///     "SELECT \"users\".* FROM \"users\" WHERE (id > ? AND id < ?)"
    /// );
    /// ```
    #[must_use]
    fn where_sql(&self, sql: &str, args: Vec<Arg>) -> Self {
        self.filter(QueryFragment::positional(sql, args))
    }

    /// Appends a WHERE fragment with `:name` placeholders.
    #[must_use]
    fn where_named(&self, sql: &str, args: HashMap<String, Arg>) -> Self {
        self.filter(QueryFragment::named(sql, args))
    }

    /// Starts a named-argument fragment; finish it with [`NamedArgs::done`].
    fn named(&self, sql: &str) -> NamedArgs<'_, Self> {
        NamedArgs {
            builder: self,
            sql: sql.to_string(),
            args: HashMap::new(),
        }
    }

    /// Appends `<column> = ?`, or `<column> IS NULL` when `value` is NULL.
    /// The column is qualified with the builder's table.
    #[must_use]
    fn where_eq(&self, column: &str, value: impl Into<Arg>) -> Self {
        let value = value.into();
        let column = Arg::Column(ColumnName::new(column));
        if value.is_null() {
            self.where_sql("? IS NULL", vec![column])
        } else {
            self.where_sql("? = ?", vec![column, value])
        }
    }

    /// Renders the statement text only.
    ///
    /// # Errors
    ///
    /// See [`to_sql_with`](QueryBuilderBase::to_sql_with).
    fn to_sql(&self) -> QuillResult<String> {
        self.to_sql_with(&mut Vec::new())
    }

    /// Renders the statement and prepares it on the attached connection.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::ImproperlyConfigured`] if the builder has no
    /// connection, rendering errors, and driver errors.
    fn prepare(&self) -> QuillResult<Box<dyn Statement + '_>> {
        let mut params = Vec::new();
        let sql = self.to_sql_with(&mut params)?;
        self.state().prepare(&sql, params)
    }
}

/// A named-argument fragment being assembled.
///
/// # Examples
///
/// ```
/// use quill_db::dialect::Dialect;
/// use quill_db::query::{QueryBuilder, QueryBuilderBase};
///
/// let q = QueryBuilder::with_dialect(Dialect::Sql99)
///     .from("topics")
///     .named("name = :name")
///     .set("name", "news")
///     .done();
/// let mut params = Vec::new();
/// q.to_sql_with(&mut params).unwrap();
/// assert_eq!(params.len(), 1);
/// ```
#[must_use]
pub struct NamedArgs<'b, B> {
    builder: &'b B,
    sql: String,
    args: HashMap<String, Arg>,
}

impl<B: QueryBuilderBase> NamedArgs<'_, B> {
    /// Binds `key`. A later `set` of the same key replaces the earlier one.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Appends the fragment to the builder it was started from.
    pub fn done(self) -> B {
        self.builder.where_named(&self.sql, self.args)
    }
}
