//! UPDATE and INSERT rendering, the ordered value map, and staged
//! column/value arguments.

use std::fmt;

use quill_core::{QuillError, QuillResult};

use super::base::QueryBuilderBase;
use super::builder::QueryBuilder;
use super::fragment::{push_arg, Arg};
use crate::value::Value;

/// Column/value pairs in insertion order.
///
/// Column order is the order of the rendered SET and VALUES lists.
///
/// # Examples
///
/// ```
/// use quill_db::query::ValueMap;
///
/// let values = ValueMap::new().set("name", "ada").set("age", 36);
/// assert_eq!(values.len(), 2);
/// assert!(values.get("age").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(String, Arg)>,
}

impl ValueMap {
    /// Creates an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`insert`](ValueMap::insert).
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets `column`, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Arg>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Sets `column` only if it is not present yet. Returns `true` if the
    /// value was stored.
    pub fn insert_if_absent(&mut self, column: impl Into<String>, value: impl Into<Arg>) -> bool {
        let column = column.into();
        if self.contains(&column) {
            return false;
        }
        self.entries.push((column, value.into()));
        true
    }

    /// Removes `column`, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<Arg> {
        let index = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(index).1)
    }

    /// The value of `column`.
    pub fn get(&self, column: &str) -> Option<&Arg> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Returns `true` if `column` is present.
    pub fn contains(&self, column: &str) -> bool {
        self.entries.iter().any(|(c, _)| c == column)
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Copies every pair of `other` into this map, replacing existing
    /// columns.
    pub fn merge(&mut self, other: &Self) {
        for (column, value) in other.iter() {
            self.insert(column, value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Arg>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Arg>> Extend<(K, V)> for ValueMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (column, value) in iter {
            self.insert(column, value);
        }
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

impl QueryBuilder {
    /// Renders `UPDATE "table" SET "c" = ?, ... [WHERE ...]`, appending
    /// bound values to `params`. Lists render as array literals.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::InvalidArgument`] if `values` is empty, and
    /// dialect errors for list values the dialect cannot render.
    pub fn to_update_sql_with(
        &self,
        table: &str,
        values: &ValueMap,
        params: &mut Vec<Value>,
    ) -> QuillResult<String> {
        if values.is_empty() {
            return Err(QuillError::invalid("no UPDATE values supplied"));
        }
        let dialect = self.dialect();
        let mut sql = String::from("UPDATE ");
        dialect.escape_identifier(table, &mut sql);
        sql.push_str(" SET ");
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            dialect.escape_identifier(column, &mut sql);
            sql.push_str(" = ");
            push_arg(dialect, Some(table), &mut sql, params, value, false)?;
        }
        self.state()
            .conditions
            .render(dialect, Some(table), &mut sql, params)?;
        Ok(sql)
    }

    /// Renders `INSERT INTO "table" ("c", ...) VALUES (?, ...)`, appending
    /// bound values to `params`.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::InvalidArgument`] if `values` is empty or the
    /// builder carries WHERE fragments, and dialect errors for list values.
    pub fn to_insert_sql_with(
        &self,
        table: &str,
        values: &ValueMap,
        params: &mut Vec<Value>,
    ) -> QuillResult<String> {
        if values.is_empty() {
            return Err(QuillError::invalid("no INSERT values supplied"));
        }
        if !self.state().conditions.is_empty() {
            return Err(QuillError::invalid("INSERT has no WHERE clause"));
        }
        let dialect = self.dialect();
        let mut sql = String::from("INSERT INTO ");
        dialect.escape_identifier(table, &mut sql);
        sql.push_str(" (");
        for (i, (column, _)) in values.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            dialect.escape_identifier(column, &mut sql);
        }
        sql.push_str(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            push_arg(dialect, Some(table), &mut sql, params, value, false)?;
        }
        sql.push(')');
        Ok(sql)
    }

    /// UPDATE statement text only.
    ///
    /// # Errors
    ///
    /// See [`to_update_sql_with`](QueryBuilder::to_update_sql_with).
    pub fn to_update_sql(&self, table: &str, values: &ValueMap) -> QuillResult<String> {
        self.to_update_sql_with(table, values, &mut Vec::new())
    }

    /// INSERT statement text only.
    ///
    /// # Errors
    ///
    /// See [`to_insert_sql_with`](QueryBuilder::to_insert_sql_with).
    pub fn to_insert_sql(&self, table: &str, values: &ValueMap) -> QuillResult<String> {
        self.to_insert_sql_with(table, values, &mut Vec::new())
    }

    /// Runs an UPDATE and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Rendering errors, [`QuillError::ImproperlyConfigured`] without a
    /// connection, and driver errors.
    pub fn update(&self, table: &str, values: &ValueMap) -> QuillResult<u64> {
        let mut params = Vec::new();
        let sql = self.to_update_sql_with(table, values, &mut params)?;
        self.state().prepare(&sql, params)?.execute()
    }

    /// Runs an INSERT and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// As [`update`](QueryBuilder::update).
    pub fn insert(&self, table: &str, values: &ValueMap) -> QuillResult<u64> {
        let mut params = Vec::new();
        let sql = self.to_insert_sql_with(table, values, &mut params)?;
        self.state().prepare(&sql, params)?.execute()
    }
}

// ── Staged arguments ───────────────────────────────────────────────────

/// Column/value pairs staged for one table, committed with
/// [`update`](UpdateArgs::update) or [`insert`](UpdateArgs::insert).
///
/// # Examples
///
/// ```
/// use quill_db::dialect::Dialect;
/// use quill_db::query::{QueryBuilder, QueryBuilderBase};
///
/// let sql = QueryBuilder::into(&QueryBuilder::with_dialect(Dialect::Sql99), "users")
///     .set("screenname", "ada")
///     .to_insert_sql()
///     .unwrap();
/// assert_eq!(sql, "INSERT INTO \"users\" (\"screenname\") VALUES (?)");
/// ```
#[must_use]
pub struct UpdateArgs {
    builder: QueryBuilder,
    table: String,
    values: ValueMap,
}

impl UpdateArgs {
    pub(crate) const fn new(builder: QueryBuilder, table: String) -> Self {
        Self {
            builder,
            table,
            values: ValueMap::new(),
        }
    }

    /// Stages `column`. A later `set` of the same column replaces it.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.values.insert(column, value);
        self
    }

    /// The target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The staged values.
    pub const fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Runs the UPDATE.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update`].
    pub fn update(&self) -> QuillResult<u64> {
        self.builder.update(&self.table, &self.values)
    }

    /// Runs the INSERT.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert`].
    pub fn insert(&self) -> QuillResult<u64> {
        self.builder.insert(&self.table, &self.values)
    }

    /// Merges `values` into the staged values, then runs the UPDATE.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update`].
    pub fn update_with(mut self, values: &ValueMap) -> QuillResult<u64> {
        self.values.merge(values);
        self.update()
    }

    /// Merges `values` into the staged values, then runs the INSERT.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert`].
    pub fn insert_with(mut self, values: &ValueMap) -> QuillResult<u64> {
        self.values.merge(values);
        self.insert()
    }

    /// UPDATE statement text for the staged values.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_update_sql_with`].
    pub fn to_update_sql(&self) -> QuillResult<String> {
        self.builder.to_update_sql(&self.table, &self.values)
    }

    /// UPDATE statement text, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_update_sql_with`].
    pub fn to_update_sql_with(&self, params: &mut Vec<Value>) -> QuillResult<String> {
        self.builder.to_update_sql_with(&self.table, &self.values, params)
    }

    /// INSERT statement text for the staged values.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_insert_sql_with`].
    pub fn to_insert_sql(&self) -> QuillResult<String> {
        self.builder.to_insert_sql(&self.table, &self.values)
    }

    /// INSERT statement text, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_insert_sql_with`].
    pub fn to_insert_sql_with(&self, params: &mut Vec<Value>) -> QuillResult<String> {
        self.builder.to_insert_sql_with(&self.table, &self.values, params)
    }
}

impl fmt::Debug for UpdateArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateArgs")
            .field("table", &self.table)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::query::Name;

    fn sql99() -> QueryBuilder {
        QueryBuilder::with_dialect(Dialect::Sql99)
    }

    #[test]
    fn test_value_map_order_and_replace() {
        let mut values = ValueMap::new().set("b", 1).set("a", 2);
        values.insert("b", 3);
        let cols: Vec<&str> = values.iter().map(|(c, _)| c).collect();
        assert_eq!(cols, vec!["b", "a"]);
        assert_eq!(values.get("b"), Some(&Arg::Value(Value::Int(3))));

        assert!(!values.insert_if_absent("a", 9));
        assert!(values.insert_if_absent("c", 9));
        assert_eq!(values.remove("a"), Some(Arg::Value(Value::Int(2))));
        assert_eq!(values.len(), 2);
        assert!(values.remove("zzz").is_none());
    }

    #[test]
    fn test_value_map_from_iter() {
        let values: ValueMap = [("x", 1), ("y", 2), ("x", 3)].into_iter().collect();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("x"), Some(&Arg::Value(Value::Int(3))));
    }

    #[test]
    fn test_update_sql() {
        let values = ValueMap::new().set("name", "ada").set("age", 36);
        let mut params = Vec::new();
        let sql = sql99()
            .where_eq("id", 1)
            .where_sql("age < ?", vec![Arg::from(40)])
            .to_update_sql_with("users", &values, &mut params)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"name\" = ?, \"age\" = ? \
             WHERE (\"users\".\"id\" = ?) AND (age < ?)"
        );
        assert_eq!(
            params,
            vec![Value::from("ada"), Value::Int(36), Value::Int(1), Value::Int(40)]
        );
    }

    #[test]
    fn test_update_requires_values() {
        let err = sql99().to_update_sql("users", &ValueMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "no UPDATE values supplied");
    }

    #[test]
    fn test_insert_sql() {
        let values = ValueMap::new()
            .set("name", "ada")
            .set("deleted_at", None::<i64>)
            .set("copied_from", Name::new("name"));
        let mut params = Vec::new();
        let sql = sql99()
            .to_insert_sql_with("users", &values, &mut params)
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"name\", \"deleted_at\", \"copied_from\") VALUES (?, ?, \"name\")"
        );
        assert_eq!(params, vec![Value::from("ada"), Value::Null]);
    }

    #[test]
    fn test_insert_errors() {
        let err = sql99().to_insert_sql("users", &ValueMap::new()).unwrap_err();
        assert_eq!(err.to_string(), "no INSERT values supplied");

        let values = ValueMap::new().set("a", 1);
        let err = sql99()
            .where_eq("id", 1)
            .to_insert_sql("users", &values)
            .unwrap_err();
        assert!(matches!(err, QuillError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "INSERT has no WHERE clause");
    }

    #[test]
    fn test_list_values_use_array_literal() {
        let values = ValueMap::new().set("tags", vec!["a", "b"]);
        let mut params = Vec::new();
        let sql = QueryBuilder::with_dialect(Dialect::PostgreSql)
            .to_update_sql_with("posts", &values, &mut params)
            .unwrap();
        assert_eq!(sql, "UPDATE \"posts\" SET \"tags\" = ARRAY[?, ?]");
        assert_eq!(params.len(), 2);

        let err = sql99().to_update_sql("posts", &values).unwrap_err();
        assert!(matches!(err, QuillError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_mssql_escaping() {
        let values = ValueMap::new().set("a]b", 1);
        let sql = QueryBuilder::with_dialect(Dialect::MsSqlServer)
            .to_insert_sql("t", &values)
            .unwrap();
        assert_eq!(sql, "INSERT INTO [t] ([a]]b]) VALUES (?)");
    }

    #[test]
    fn test_update_args_staging() {
        let args = crate::query::QueryBuilder::into(&sql99().where_eq("id", 7), "users")
            .set("name", "x")
            .set("name", "y")
            .set("age", 3);
        assert_eq!(args.table(), "users");
        assert_eq!(args.values().len(), 2);
        assert_eq!(
            args.to_update_sql().unwrap(),
            "UPDATE \"users\" SET \"name\" = ?, \"age\" = ? WHERE (\"users\".\"id\" = ?)"
        );
        assert!(args.to_insert_sql().is_err());
    }
}
