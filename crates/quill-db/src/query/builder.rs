//! The root builder.
//!
//! A [`QueryBuilder`] is attached to a connection (or just a dialect, for
//! rendering SQL text) and is the entry point for every statement: SELECTs
//! start from [`QueryBuilder::from`] and friends, writes go through
//! [`QueryBuilder::update`]/[`QueryBuilder::insert`] and their model and
//! entity forms. WHERE fragments added to the root carry over into every
//! statement built from it.

use std::sync::Arc;

use quill_core::QuillResult;

use super::base::{BuilderState, Conditions, QueryBuilderBase};
use super::fragment::Name;
use super::mutation::{UpdateArgs, ValueMap};
use super::select::{Order, SelectBuilder, SelectColumn};
use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::model::Model;
use crate::naming::get_values;
use crate::row::{FromRow, ResultSet};
use crate::value::Value;

/// The root of every builder chain.
///
/// # Examples
///
/// ```
/// use quill_db::dialect::Dialect;
/// use quill_db::query::{QueryBuilder, QueryBuilderBase, ValueMap};
///
/// let q = QueryBuilder::with_dialect(Dialect::MsSqlServer);
/// let sql = q
///     .where_eq("id", 3)
///     .to_update_sql("users", &ValueMap::new().set("name", "ada"))
///     .unwrap();
/// assert_eq!(sql, "UPDATE [users] SET [name] = ? WHERE ([users].[id] = ?)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: BuilderState,
}

/// Shorthand for [`Name::new`].
pub fn name(ident: impl Into<String>) -> Name {
    Name::new(ident)
}

/// Shorthand for [`Order::asc`].
pub fn asc(column: impl Into<String>) -> Order {
    Order::asc(column)
}

/// Shorthand for [`Order::desc`].
pub fn desc(column: impl Into<String>) -> Order {
    Order::desc(column)
}

impl QueryBuilder {
    /// Attaches to `conn`, choosing the dialect from its product name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDatabase`](quill_core::QuillError::UnknownDatabase)
    /// for unrecognized products and any error from asking the connection.
    pub fn new(conn: Arc<dyn Connection>) -> QuillResult<Self> {
        let product = conn.product_name()?;
        let dialect = Dialect::from_product_name(&product)?;
        tracing::debug!(product = %product, dialect = dialect.name(), "attached query builder");
        Ok(Self {
            state: BuilderState {
                conn: Some(conn),
                dialect,
                conditions: Conditions::default(),
            },
        })
    }

    /// A builder without a connection, for rendering SQL text only.
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            state: BuilderState {
                conn: None,
                dialect,
                conditions: Conditions::default(),
            },
        }
    }

    // ── SELECT entry points ────────────────────────────────────────────

    /// A select with no table yet.
    pub fn select(&self) -> SelectBuilder {
        SelectBuilder::from_state(self.state.clone())
    }

    /// A select with raw select-list text.
    pub fn select_sql(&self, raw: &str) -> SelectBuilder {
        self.select().select(raw)
    }

    /// A select with table-qualified columns.
    pub fn columns<I, C>(&self, columns: I) -> SelectBuilder
    where
        I: IntoIterator<Item = C>,
        C: Into<SelectColumn>,
    {
        self.select().columns(columns)
    }

    /// A select over `table`.
    pub fn from(&self, table: &str) -> SelectBuilder {
        self.select().from(table)
    }

    /// A select mapped to model `M`.
    pub fn from_model<M: Model>(&self) -> SelectBuilder<M> {
        self.select().from_model::<M>()
    }

    /// A select loading the named relations.
    pub fn include<I, S>(&self, names: I) -> SelectBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select().include(names)
    }

    /// A select ordered by table-qualified columns.
    pub fn order<I, S>(&self, columns: I) -> SelectBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select().order(columns)
    }

    /// A select ordered by columns with directions.
    pub fn order_by(&self, orders: &[Order]) -> SelectBuilder {
        self.select().order_by(orders)
    }

    /// A select ordered by raw SQL.
    pub fn order_sql(&self, raw: &str) -> SelectBuilder {
        self.select().order_sql(raw)
    }

    /// The first entity of model `M`.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::first`].
    pub fn first<M: Model>(&self) -> QuillResult<Option<M>> {
        self.from_model::<M>().first()
    }

    /// Every entity of model `M`.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::all`].
    pub fn all<M: Model>(&self) -> QuillResult<Vec<M>> {
        self.from_model::<M>().all()
    }

    /// Runs the select and converts its first row into a scalar or array.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::first_as`].
    pub fn first_as<S: FromRow>(&self) -> QuillResult<Option<S>> {
        self.select().first_as()
    }

    /// Runs the select and converts every row into a scalar or array.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::all_as`].
    pub fn all_as<S: FromRow>(&self) -> QuillResult<Vec<S>> {
        self.select().all_as()
    }

    /// Runs the select.
    ///
    /// # Errors
    ///
    /// See [`SelectBuilder::execute`].
    pub fn execute(&self) -> QuillResult<ResultSet> {
        self.select().execute()
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Stages values for `table`.
    pub fn into(&self, table: &str) -> UpdateArgs {
        UpdateArgs::new(self.clone(), table.to_string())
    }

    /// Stages values for model `M`'s table.
    pub fn into_model<M: Model>(&self) -> UpdateArgs {
        UpdateArgs::new(self.clone(), M::table_name())
    }

    /// UPDATE of model `M`'s table.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update`].
    pub fn update_model<M: Model>(&self, values: &ValueMap) -> QuillResult<u64> {
        self.update(&M::table_name(), values)
    }

    /// INSERT into model `M`'s table.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert`].
    pub fn insert_model<M: Model>(&self, values: &ValueMap) -> QuillResult<u64> {
        self.insert(&M::table_name(), values)
    }

    /// UPDATE text for model `M`'s table.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_update_sql_with`].
    pub fn to_update_sql_model<M: Model>(&self, values: &ValueMap) -> QuillResult<String> {
        self.to_update_sql(&M::table_name(), values)
    }

    /// INSERT text for model `M`'s table.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::to_insert_sql_with`].
    pub fn to_insert_sql_model<M: Model>(&self, values: &ValueMap) -> QuillResult<String> {
        self.to_insert_sql(&M::table_name(), values)
    }

    /// Splits an entity into its `id` and remaining values, and restricts
    /// this builder to that id.
    fn entity_update<M: Model>(&self, entity: &M) -> (Self, ValueMap) {
        let mut values = get_values(entity);
        let id = values
            .remove("id")
            .and_then(|arg| arg.as_value().cloned())
            .unwrap_or(Value::Null);
        (self.where_eq("id", id), values)
    }

    /// Writes an entity's values to its row, matched by `id`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update`]. An entity with no other values fails
    /// with the empty-values error.
    pub fn update_entity<M: Model>(&self, entity: &M) -> QuillResult<u64> {
        let (query, values) = self.entity_update(entity);
        query.update(&M::table_name(), &values)
    }

    /// UPDATE text for an entity.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update_entity`].
    pub fn to_update_sql_entity<M: Model>(&self, entity: &M) -> QuillResult<String> {
        let (query, values) = self.entity_update(entity);
        query.to_update_sql(&M::table_name(), &values)
    }

    /// UPDATE text for an entity, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::update_entity`].
    pub fn to_update_sql_entity_with<M: Model>(
        &self,
        entity: &M,
        params: &mut Vec<Value>,
    ) -> QuillResult<String> {
        let (query, values) = self.entity_update(entity);
        query.to_update_sql_with(&M::table_name(), &values, params)
    }

    /// Inserts an entity's values, `id` included.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert`].
    pub fn insert_entity<M: Model>(&self, entity: &M) -> QuillResult<u64> {
        self.insert(&M::table_name(), &get_values(entity))
    }

    /// INSERT text for an entity.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert_entity`].
    pub fn to_insert_sql_entity<M: Model>(&self, entity: &M) -> QuillResult<String> {
        self.to_insert_sql(&M::table_name(), &get_values(entity))
    }

    /// INSERT text for an entity, appending bound values to `params`.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::insert_entity`].
    pub fn to_insert_sql_entity_with<M: Model>(
        &self,
        entity: &M,
        params: &mut Vec<Value>,
    ) -> QuillResult<String> {
        self.to_insert_sql_with(&M::table_name(), &get_values(entity), params)
    }
}

impl QueryBuilderBase for QueryBuilder {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn with_conditions(&self, conditions: Conditions) -> Self {
        Self {
            state: BuilderState {
                conditions,
                ..self.state.clone()
            },
        }
    }

    /// Renders the SELECT of a fresh select builder.
    fn to_sql_with(&self, params: &mut Vec<Value>) -> QuillResult<String> {
        self.select().to_sql_with(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::connection::testing::RecordingConnection;
    use crate::model::{Field, ModelMeta};
    use quill_core::QuillError;

    #[derive(Debug, Default, PartialEq)]
    struct User {
        id: Option<i64>,
        screen_name: String,
    }

    impl Model for User {
        fn describe() -> ModelMeta<Self> {
            ModelMeta::new()
                .field(Field::value("id", |u: &Self| u.id, |u, v| u.id = v))
                .field(Field::value(
                    "screenName",
                    |u: &Self| u.screen_name.clone(),
                    |u, v| u.screen_name = v,
                ))
        }
    }

    #[test]
    fn test_dialect_from_connection() {
        let conn = RecordingConnection::new("Microsoft SQL Server");
        let q = QueryBuilder::new(conn).unwrap();
        assert_eq!(q.dialect(), Dialect::MsSqlServer);
        assert_eq!(q.from("t").to_sql().unwrap(), "SELECT [t].* FROM [t]");
    }

    #[test]
    fn test_unknown_product() {
        let conn = RecordingConnection::new("Informix");
        let err = QueryBuilder::new(conn).unwrap_err();
        assert!(matches!(err, QuillError::UnknownDatabase(_)));
    }

    #[test]
    fn test_root_conditions_carry_into_select() {
        let q = QueryBuilder::with_dialect(Dialect::Sql99).where_sql("a = ?", args![1]);
        assert_eq!(
            q.from("t").to_sql().unwrap(),
            "SELECT \"t\".* FROM \"t\" WHERE (a = ?)"
        );
    }

    #[test]
    fn test_root_to_sql_requires_table() {
        let err = QueryBuilder::default().to_sql().unwrap_err();
        assert_eq!(err.to_string(), "table name is not defined");
    }

    #[test]
    fn test_select_sql_and_helpers() {
        let q = QueryBuilder::with_dialect(Dialect::Sql99);
        assert_eq!(
            q.select_sql("max(id)").from("t").to_sql().unwrap(),
            "SELECT max(id) FROM \"t\""
        );
        assert_eq!(
            q.order_by(&[desc("id"), asc("name")]).from("t").to_sql().unwrap(),
            "SELECT \"t\".* FROM \"t\" ORDER BY \"t\".\"id\" DESC, \"t\".\"name\" ASC"
        );
        let mut params = Vec::new();
        let sql = q
            .from("t")
            .where_sql("? = 1", args![name("flag")])
            .to_sql_with(&mut params)
            .unwrap();
        assert_eq!(sql, "SELECT \"t\".* FROM \"t\" WHERE (\"flag\" = 1)");
        assert!(params.is_empty());
    }

    #[test]
    fn test_entity_update_sql() {
        let user = User {
            id: Some(4),
            screen_name: "ada".into(),
        };
        let mut params = Vec::new();
        let sql = QueryBuilder::with_dialect(Dialect::Sql99)
            .to_update_sql_entity_with(&user, &mut params)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"screen_name\" = ? WHERE (\"users\".\"id\" = ?)"
        );
        assert_eq!(params, vec![Value::from("ada"), Value::Int(4)]);
    }

    #[test]
    fn test_entity_update_without_id() {
        let sql = QueryBuilder::with_dialect(Dialect::Sql99)
            .to_update_sql_entity(&User::default())
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"screen_name\" = ? WHERE (\"users\".\"id\" IS NULL)"
        );
    }

    #[test]
    fn test_entity_insert_sql() {
        let user = User {
            id: None,
            screen_name: "bob".into(),
        };
        assert_eq!(
            QueryBuilder::with_dialect(Dialect::Sql99)
                .to_insert_sql_entity(&user)
                .unwrap(),
            "INSERT INTO \"users\" (\"id\", \"screen_name\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_model_forms() {
        let values = ValueMap::new().set("screen_name", "x");
        let q = QueryBuilder::with_dialect(Dialect::Sql99);
        assert_eq!(
            q.to_insert_sql_model::<User>(&values).unwrap(),
            "INSERT INTO \"users\" (\"screen_name\") VALUES (?)"
        );
        assert_eq!(
            q.to_update_sql_model::<User>(&values).unwrap(),
            "UPDATE \"users\" SET \"screen_name\" = ?"
        );
        assert_eq!(
            q.into_model::<User>().set("screen_name", "y").to_insert_sql().unwrap(),
            "INSERT INTO \"users\" (\"screen_name\") VALUES (?)"
        );
    }

    #[test]
    fn test_writes_execute_on_connection() {
        let conn = RecordingConnection::new("SQLite");
        let q = QueryBuilder::new(conn.clone()).unwrap();
        let user = User {
            id: Some(1),
            screen_name: "ada".into(),
        };
        assert_eq!(q.insert_entity(&user).unwrap(), 1);
        assert_eq!(q.update_entity(&user).unwrap(), 1);
        assert_eq!(
            QueryBuilder::into(&q, "users")
                .set("screen_name", "z")
                .update_with(&ValueMap::new().set("id", 2))
                .unwrap(),
            1
        );

        let statements = conn.statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].0.starts_with("INSERT INTO \"users\""));
        assert!(statements[1].0.starts_with("UPDATE \"users\""));
        assert_eq!(
            statements[2].0,
            "UPDATE \"users\" SET \"screen_name\" = ?, \"id\" = ?"
        );
    }

    #[test]
    fn test_write_without_connection() {
        let err = QueryBuilder::with_dialect(Dialect::Sql99)
            .insert("t", &ValueMap::new().set("a", 1))
            .unwrap_err();
        assert!(matches!(err, QuillError::ImproperlyConfigured(_)));
    }
}
