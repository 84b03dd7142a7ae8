//! Query fragments and argument expansion.
//!
//! A [`QueryFragment`] is a piece of SQL text with either positional (`?`)
//! or named (`:name`) placeholders. Expanding a fragment writes the final SQL
//! and appends the bound values, applying one rule to every argument:
//!
//! - NULL: one placeholder bound to NULL;
//! - a list: one comma-joined placeholder per element in IN-list mode, or the
//!   dialect's array literal otherwise;
//! - a [`Name`] or [`ColumnName`]: an escaped identifier, nothing bound;
//! - anything else: one placeholder bound to the value.
//!
//! Values never reach the SQL text.

use std::collections::HashMap;
use std::fmt;

use quill_core::{QuillError, QuillResult};

use crate::dialect::{push_placeholders, Dialect};
use crate::value::Value;

/// An identifier rendered verbatim (escaped) into the SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    /// Creates a new name token.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A column identifier qualified with the builder's table when rendered,
/// e.g. `"users"."id"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName(pub String);

impl ColumnName {
    /// Creates a new column name token.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One argument to a fragment or one value of an UPDATE/INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A bound value.
    Value(Value),
    /// An escaped identifier.
    Name(Name),
    /// An escaped, table-qualified column identifier.
    Column(ColumnName),
}

impl Arg {
    /// Returns the bound value, if this argument is one.
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Name(_) | Self::Column(_) => None,
        }
    }

    /// Returns `true` for a NULL value.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }
}

impl From<Name> for Arg {
    fn from(v: Name) -> Self {
        Self::Name(v)
    }
}

impl From<ColumnName> for Arg {
    fn from(v: ColumnName) -> Self {
        Self::Column(v)
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Self::Value(v.into())
    }
}

impl<T> From<Vec<T>> for Arg
where
    Value: From<Vec<T>>,
{
    fn from(v: Vec<T>) -> Self {
        Self::Value(v.into())
    }
}

impl<T, const N: usize> From<[T; N]> for Arg
where
    Value: From<[T; N]>,
{
    fn from(v: [T; N]) -> Self {
        Self::Value(v.into())
    }
}

impl<'a, T> From<&'a [T]> for Arg
where
    Value: From<&'a [T]>,
{
    fn from(v: &'a [T]) -> Self {
        Self::Value(v.into())
    }
}

macro_rules! arg_from_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

arg_from_scalar!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &str,
    &String,
    uuid::Uuid,
    serde_json::Value,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::NaiveTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
);

/// Builds a `Vec<Arg>` from heterogeneous values.
///
/// # Examples
///
/// ```
/// use quill_db::args;
/// use quill_db::query::{Arg, ColumnName};
///
/// let a = args![ColumnName::new("id"), 42, "x", None::<i64>];
/// assert_eq!(a.len(), 4);
/// assert!(a[3].is_null());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::query::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::query::Arg::from($arg)),+]
    };
}

/// Appends one argument to `out`/`params` following the expansion rule.
///
/// `in_list` selects IN-list expansion for lists; otherwise lists render as
/// the dialect's array literal. `table` qualifies [`ColumnName`] tokens; with
/// no table the column renders unqualified.
///
/// # Errors
///
/// Returns [`QuillError::UnsupportedOperation`] when a list must be rendered
/// as a literal and the dialect has no array syntax.
pub fn push_arg(
    dialect: Dialect,
    table: Option<&str>,
    out: &mut String,
    params: &mut Vec<Value>,
    arg: &Arg,
    in_list: bool,
) -> QuillResult<()> {
    match arg {
        Arg::Value(Value::List(items)) => {
            if in_list {
                push_placeholders(items.len(), out);
            } else {
                dialect.array_literal(items.len(), out)?;
            }
            params.extend(items.iter().cloned());
        }
        Arg::Value(value) => {
            out.push('?');
            params.push(value.clone());
        }
        Arg::Name(name) => dialect.escape_identifier(&name.0, out),
        Arg::Column(column) => {
            if let Some(table) = table {
                dialect.escape_identifier(table, out);
                out.push('.');
            }
            dialect.escape_identifier(&column.0, out);
        }
    }
    Ok(())
}

/// A piece of SQL with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFragment {
    /// Each `?` consumes the next argument. The placeholder count must equal
    /// the argument count.
    Positional {
        /// The SQL template.
        sql: String,
        /// The arguments, in placeholder order.
        args: Vec<Arg>,
    },
    /// Each `:name` (a run of ASCII letters, digits and `_`) is looked up in
    /// the map. Absent names bind NULL.
    Named {
        /// The SQL template.
        sql: String,
        /// The arguments by name.
        args: HashMap<String, Arg>,
    },
}

impl QueryFragment {
    /// Creates a positional fragment. Argument count is checked when the
    /// fragment is expanded.
    pub fn positional(sql: impl Into<String>, args: Vec<Arg>) -> Self {
        Self::Positional {
            sql: sql.into(),
            args,
        }
    }

    /// Creates a named fragment.
    pub fn named(sql: impl Into<String>, args: HashMap<String, Arg>) -> Self {
        Self::Named {
            sql: sql.into(),
            args,
        }
    }

    /// Returns the SQL template.
    pub fn sql(&self) -> &str {
        match self {
            Self::Positional { sql, .. } | Self::Named { sql, .. } => sql,
        }
    }

    /// Expands this fragment into `out`, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::InvalidArgument`] if a positional fragment has
    /// more or fewer arguments than placeholders, and propagates dialect
    /// errors from [`push_arg`].
    pub fn generate(
        &self,
        dialect: Dialect,
        table: Option<&str>,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> QuillResult<()> {
        match self {
            Self::Positional { sql, args } => {
                generate_positional(sql, args, dialect, table, out, params)
            }
            Self::Named { sql, args } => generate_named(sql, args, dialect, table, out, params),
        }
    }
}

fn generate_positional(
    sql: &str,
    args: &[Arg],
    dialect: Dialect,
    table: Option<&str>,
    out: &mut String,
    params: &mut Vec<Value>,
) -> QuillResult<()> {
    let mut args_iter = args.iter();
    let mut pieces = sql.split('?');
    if let Some(head) = pieces.next() {
        out.push_str(head);
    }
    let mut placeholders = 0usize;
    for piece in pieces {
        placeholders += 1;
        let arg = args_iter.next().ok_or_else(|| {
            QuillError::invalid(format!(
                "not enough arguments for query fragment ({} given): {sql}",
                args.len()
            ))
        })?;
        push_arg(dialect, table, out, params, arg, true)?;
        out.push_str(piece);
    }
    if placeholders != args.len() {
        return Err(QuillError::invalid(format!(
            "too many arguments for query fragment ({} given, {placeholders} placeholders): {sql}",
            args.len()
        )));
    }
    Ok(())
}

const fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn generate_named(
    sql: &str,
    args: &HashMap<String, Arg>,
    dialect: Dialect,
    table: Option<&str>,
    out: &mut String,
    params: &mut Vec<Value>,
) -> QuillResult<()> {
    let null = Arg::Value(Value::Null);
    let bytes = sql.as_bytes();
    let mut prev = 0;
    while let Some(offset) = sql[prev..].find(':') {
        let colon = prev + offset;
        out.push_str(&sql[prev..colon]);
        let begin = colon + 1;
        let end = bytes[begin..]
            .iter()
            .position(|b| !is_name_byte(*b))
            .map_or(bytes.len(), |n| begin + n);
        let arg = args.get(&sql[begin..end]).unwrap_or(&null);
        push_arg(dialect, table, out, params, arg, true)?;
        prev = end;
    }
    out.push_str(&sql[prev..]);
    Ok(())
}
