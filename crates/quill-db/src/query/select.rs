//! SELECT statements and entity materialization.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use quill_core::{QuillError, QuillResult};

use super::base::{BuilderState, Conditions, QueryBuilderBase};
use super::fragment::{Arg, ColumnName};
use crate::load::LoadContext;
use crate::model::Model;
use crate::row::{FromRow, ResultSet, Row};
use crate::value::Value;

/// One ORDER BY entry: a column of the builder's table and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    /// The column name.
    pub column: String,
    /// `true` for ascending.
    pub ascending: bool,
}

impl Order {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// An entry of an explicit column list. `All` renders as `"table".*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    /// Every column of the table.
    All,
    /// One named column of the table.
    Named(String),
}

impl From<&str> for SelectColumn {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for SelectColumn {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl<T: Into<Self>> From<Option<T>> for SelectColumn {
    fn from(name: Option<T>) -> Self {
        name.map_or(Self::All, Into::into)
    }
}

#[derive(Debug, Clone)]
enum SelectItem {
    Raw(String),
    Column(SelectColumn),
}

#[derive(Debug, Clone)]
enum OrderClause {
    Raw(String),
    Columns(Vec<String>),
    Orders(Vec<Order>),
}

#[derive(Debug, Clone)]
struct ModelInfo {
    table: String,
    type_name: &'static str,
}

/// A SELECT statement over a table, optionally mapped to model type `T`.
///
/// The table is the explicit [`from`](SelectBuilder::from) override, else the
/// mapped model's table.
///
/// # Examples
///
/// ```
/// use quill_db::args;
/// use quill_db::dialect::Dialect;
/// use quill_db::query::{QueryBuilder, QueryBuilderBase};
/// use quill_db::value::Value;
///
/// let q = QueryBuilder::with_dialect(Dialect::Sql99)
///     .from("users")
///     .columns(["id", "screenname"])
///     .where_eq("screenname", "Mathias")
///     .where_sql("id > ?", args![2])
///     .limit(3)
///     .order(["id"]);
///
/// let mut params = Vec::new();
/// assert_eq!(
///     q.to_sql_with(&mut params).unwrap(),
///     "SELECT \"users\".\"id\", \"users\".\"screenname\" FROM \"users\" \
///      WHERE (\"users\".\"screenname\" = ?) AND (id > ?) \
///      ORDER BY \"users\".\"id\" LIMIT 3"
/// );
/// assert_eq!(params, vec![Value::from("Mathias"), Value::Int(2)]);
/// ```
pub struct SelectBuilder<T = ()> {
    state: BuilderState,
    items: Vec<SelectItem>,
    table: Option<String>,
    model: Option<ModelInfo>,
    include: Vec<String>,
    order: Option<OrderClause>,
    offset: Option<u64>,
    limit: Option<u64>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SelectBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            items: self.items.clone(),
            table: self.table.clone(),
            model: self.model.clone(),
            include: self.include.clone(),
            order: self.order.clone(),
            offset: self.offset,
            limit: self.limit,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SelectBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectBuilder")
            .field("state", &self.state)
            .field("items", &self.items)
            .field("table", &self.table)
            .field("model", &self.model)
            .field("include", &self.include)
            .field("order", &self.order)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .finish()
    }
}

impl SelectBuilder<()> {
    /// An untyped select sharing `state`'s connection and WHERE list.
    pub fn from_state(state: BuilderState) -> Self {
        Self {
            state,
            items: Vec::new(),
            table: None,
            model: None,
            include: Vec::new(),
            order: None,
            offset: None,
            limit: None,
            _marker: PhantomData,
        }
    }
}

impl<T> SelectBuilder<T> {
    fn retyped<U>(self, model: Option<ModelInfo>) -> SelectBuilder<U> {
        SelectBuilder {
            state: self.state,
            items: self.items,
            table: self.table,
            model,
            include: self.include,
            order: self.order,
            offset: self.offset,
            limit: self.limit,
            _marker: PhantomData,
        }
    }

    fn with(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        f(&mut next);
        next
    }

    /// Appends raw select-list text. Surrounding whitespace is trimmed and
    /// empty text is ignored.
    #[must_use]
    pub fn select(&self, raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.clone();
        }
        self.with(|q| q.items.push(SelectItem::Raw(raw.to_string())))
    }

    /// Appends table-qualified columns to the select list.
    #[must_use]
    pub fn columns<I, C>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<SelectColumn>,
    {
        let columns: Vec<SelectItem> = columns
            .into_iter()
            .map(|c| SelectItem::Column(c.into()))
            .collect();
        self.with(|q| q.items.extend(columns))
    }

    /// Appends `"table".*` to the select list.
    #[must_use]
    pub fn all_columns(&self) -> Self {
        self.with(|q| q.items.push(SelectItem::Column(SelectColumn::All)))
    }

    /// Sets the table, overriding the mapped model's table.
    #[must_use]
    pub fn from(&self, table: &str) -> Self {
        self.with(|q| q.table = Some(table.to_string()))
    }

    /// Maps rows to model `M`.
    pub fn from_model<M: Model>(&self) -> SelectBuilder<M> {
        self.clone().retyped(Some(ModelInfo {
            table: M::table_name(),
            type_name: M::type_name(),
        }))
    }

    /// Adds relation names to load. Names the model does not declare are
    /// ignored. Entries accumulate across calls.
    #[must_use]
    pub fn include<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.with(|q| q.include.extend(names))
    }

    /// Orders by table-qualified columns, replacing any previous order.
    #[must_use]
    pub fn order<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.with(|q| q.order = Some(OrderClause::Columns(columns)))
    }

    /// Orders by columns with explicit directions, replacing any previous
    /// order.
    #[must_use]
    pub fn order_by(&self, orders: &[Order]) -> Self {
        self.with(|q| q.order = Some(OrderClause::Orders(orders.to_vec())))
    }

    /// Orders by raw SQL, replacing any previous order. Blank text removes
    /// the ORDER BY clause.
    #[must_use]
    pub fn order_sql(&self, raw: &str) -> Self {
        let raw = raw.trim();
        self.with(|q| {
            q.order = (!raw.is_empty()).then(|| OrderClause::Raw(raw.to_string()));
        })
    }

    /// Skips the first `offset` rows.
    ///
    /// The clause renders as `OFFSET n` ahead of any `LIMIT`. SQLite only
    /// accepts `OFFSET` after `LIMIT`, so statements using this fail to
    /// prepare on the SQLite driver with a syntax error.
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        self.with(|q| q.offset = Some(offset))
    }

    /// Returns at most `limit` rows.
    #[must_use]
    pub fn limit(&self, limit: u64) -> Self {
        self.with(|q| q.limit = Some(limit))
    }

    /// The relation names to load.
    pub fn includes(&self) -> &[String] {
        &self.include
    }

    /// The table rows are read from.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::InvalidArgument`] if neither a table nor a model
    /// was given.
    pub fn table_name(&self) -> QuillResult<&str> {
        self.table
            .as_deref()
            .or_else(|| self.model.as_ref().map(|m| m.table.as_str()))
            .ok_or_else(|| QuillError::invalid("table name is not defined"))
    }

    /// Runs the query and returns every row.
    ///
    /// # Errors
    ///
    /// Returns rendering errors, [`QuillError::ImproperlyConfigured`] without
    /// a connection, and driver errors.
    pub fn execute(&self) -> QuillResult<ResultSet> {
        let mut stmt = self.prepare()?;
        stmt.query()
    }

    /// Runs the query and converts the first row into a scalar or array.
    ///
    /// # Errors
    ///
    /// As [`execute`](SelectBuilder::execute), plus
    /// [`QuillError::TypeMismatch`] if the row does not convert.
    pub fn first_as<S: FromRow>(&self) -> QuillResult<Option<S>> {
        self.execute()?.first().map(S::from_row).transpose()
    }

    /// Runs the query and converts every row into a scalar or array.
    ///
    /// # Errors
    ///
    /// As [`first_as`](SelectBuilder::first_as).
    pub fn all_as<S: FromRow>(&self) -> QuillResult<Vec<S>> {
        self.execute()?.rows().iter().map(S::from_row).collect()
    }

    /// Runs the query restricted to rows whose `id` is in `ids`. No query
    /// is issued for an empty id list.
    ///
    /// # Errors
    ///
    /// As [`execute`](SelectBuilder::execute).
    pub fn find_many<I, V>(&self, ids: I) -> QuillResult<ResultSet>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match self.where_ids(ids) {
            Some(query) => query.execute(),
            None => Ok(ResultSet::empty()),
        }
    }

    fn where_ids<I, V>(&self, ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return None;
        }
        Some(self.where_sql(
            "? IN (?)",
            vec![Arg::Column(ColumnName::new("id")), Arg::Value(Value::List(ids))],
        ))
    }

    fn render(&self, params: &mut Vec<Value>) -> QuillResult<String> {
        let table = self.table_name()?;
        let dialect = self.state.dialect;
        let mut sql = String::from("SELECT ");

        if self.items.is_empty() {
            dialect.escape_identifier(table, &mut sql);
            sql.push_str(".*");
        }
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            match item {
                SelectItem::Raw(raw) => sql.push_str(raw),
                SelectItem::Column(column) => {
                    dialect.escape_identifier(table, &mut sql);
                    match column {
                        SelectColumn::All => sql.push_str(".*"),
                        SelectColumn::Named(name) => {
                            sql.push('.');
                            dialect.escape_identifier(name, &mut sql);
                        }
                    }
                }
            }
        }

        sql.push_str(" FROM ");
        dialect.escape_identifier(table, &mut sql);
        self.state
            .conditions
            .render(dialect, Some(table), &mut sql, params)?;

        match &self.order {
            Some(OrderClause::Raw(raw)) => {
                sql.push_str(" ORDER BY ");
                sql.push_str(raw);
            }
            Some(OrderClause::Columns(columns)) if !columns.is_empty() => {
                sql.push_str(" ORDER BY ");
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    dialect.escape_identifier(table, &mut sql);
                    sql.push('.');
                    dialect.escape_identifier(column, &mut sql);
                }
            }
            Some(OrderClause::Orders(orders)) if !orders.is_empty() => {
                sql.push_str(" ORDER BY ");
                for (i, order) in orders.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    dialect.escape_identifier(table, &mut sql);
                    sql.push('.');
                    dialect.escape_identifier(&order.column, &mut sql);
                    sql.push_str(if order.ascending { " ASC" } else { " DESC" });
                }
            }
            _ => {}
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(sql)
    }
}

impl<T> QueryBuilderBase for SelectBuilder<T> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn with_conditions(&self, conditions: Conditions) -> Self {
        self.with(|q| q.state.conditions = conditions)
    }

    fn to_sql_with(&self, params: &mut Vec<Value>) -> QuillResult<String> {
        self.render(params)
    }
}

// ── Entity materialization ─────────────────────────────────────────────

impl<T: Model> SelectBuilder<T> {
    fn materialize(&self, row: &Row, columns: &HashSet<String>) -> QuillResult<T> {
        let mut entity = T::default();
        LoadContext::new(&self.state, row, columns, &self.include).load(&mut entity)?;
        Ok(entity)
    }

    fn type_name(&self) -> &'static str {
        self.model.as_ref().map_or_else(T::type_name, |m| m.type_name)
    }

    /// The first row as an entity, or `None` if there are no rows.
    ///
    /// # Errors
    ///
    /// As [`execute`](SelectBuilder::execute), plus errors from loading
    /// included relations.
    pub fn first(&self) -> QuillResult<Option<T>> {
        let rs = self.execute()?;
        let columns = rs.column_set();
        rs.first()
            .map(|row| self.materialize(row, &columns))
            .transpose()
    }

    /// Every row as an entity.
    ///
    /// # Errors
    ///
    /// As [`first`](SelectBuilder::first).
    pub fn all(&self) -> QuillResult<Vec<T>> {
        let rs = self.execute()?;
        let columns = rs.column_set();
        rs.rows()
            .iter()
            .map(|row| self.materialize(row, &columns))
            .collect()
    }

    /// Fills an existing entity from the first row.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::RecordNotFound`] if there are no rows.
    pub fn load(&self, entity: &mut T) -> QuillResult<()> {
        let rs = self.execute()?;
        let columns = rs.column_set();
        let row = rs
            .first()
            .ok_or_else(|| QuillError::record_not_found(self.type_name(), None::<&str>))?;
        LoadContext::new(&self.state, row, &columns, &self.include).load(entity)
    }

    /// The entity whose `id` is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::RecordNotFound`] naming the type and id if there
    /// is no such row.
    pub fn find(&self, id: impl Into<Value>) -> QuillResult<T> {
        let id = id.into();
        self.where_eq("id", id.clone())
            .first()?
            .ok_or_else(|| QuillError::record_not_found(self.type_name(), Some(id)))
    }

    /// The entities whose `id` is in `ids`, in result order. No query is
    /// issued for an empty id list.
    ///
    /// # Errors
    ///
    /// As [`all`](SelectBuilder::all).
    pub fn find_all<I, V>(&self, ids: I) -> QuillResult<Vec<T>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match self.where_ids(ids) {
            Some(query) => query.all(),
            None => Ok(Vec::new()),
        }
    }
}
