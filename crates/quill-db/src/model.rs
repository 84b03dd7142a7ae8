//! Model trait, per-type field tables and the metadata registry.
//!
//! A [`Model`] describes its members once through [`Model::describe`]. The
//! resulting [`ModelMeta`] is built on first use, leaked, and cached for the
//! life of the process in a registry keyed by [`TypeId`]. The field table is
//! what the loader and the value extractor walk instead of reflection.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use quill_core::QuillResult;

use crate::load::RelationQuery;
use crate::naming;
use crate::row::FromValue;
use crate::value::Value;

/// A type that maps to a table.
///
/// # Examples
///
/// ```
/// use quill_db::model::{Field, Model, ModelMeta};
///
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     screenname: String,
/// }
///
/// impl Model for User {
///     fn describe() -> ModelMeta<Self> {
///         ModelMeta::new()
///             .field(Field::value("id", |u: &Self| u.id, |u, v| u.id = v))
///             .field(Field::value(
///                 "screenname",
///                 |u: &Self| u.screenname.clone(),
///                 |u, v| u.screenname = v,
///             ))
///     }
/// }
///
/// assert_eq!(User::table_name(), "users");
/// assert_eq!(User::foreign_key(), "user_id");
/// assert_eq!(User { id: 7, ..User::default() }.id(), Some(7.into()));
/// ```
pub trait Model: Default + Send + Sync + 'static {
    /// Builds this type's metadata. Called at most once per type in the
    /// normal case; use [`Model::meta`] to read it.
    fn describe() -> ModelMeta<Self>;

    /// The simple type name used for naming conventions and error messages.
    /// Defaults to the last path segment of the Rust type name.
    fn type_name() -> &'static str {
        simple_type_name(std::any::type_name::<Self>())
    }

    /// The cached metadata.
    fn meta() -> &'static ModelMeta<Self> {
        meta_for::<Self>()
    }

    /// The table override from the metadata, else the conventional name.
    fn table_name() -> String {
        Self::meta()
            .table_name()
            .map_or_else(|| naming::table_name_for(Self::type_name()), str::to_string)
    }

    /// The column other tables use to reference this type, e.g. `user_id`.
    fn foreign_key() -> String {
        naming::foreign_key_for(Self::type_name())
    }

    /// The value of the `id` member, or `None` if there is no such member or
    /// it is NULL.
    fn id(&self) -> Option<Value> {
        Self::meta()
            .fields_named("id")
            .find_map(|field| field.value_of(self))
            .filter(|value| !value.is_null())
    }
}

/// Strips the module path and generic arguments from a type name.
pub fn simple_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ── Metadata ───────────────────────────────────────────────────────────

/// How a member maps to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mapping {
    /// A plain column.
    Value,
    /// This table holds the related row's id.
    BelongsTo,
    /// One related row holds this row's id.
    HasOne,
    /// Any number of related rows hold this row's id.
    HasMany,
    /// Not persisted.
    Ignore,
}

type Getter<M> = Arc<dyn Fn(&M) -> Value + Send + Sync>;
type Setter<M> = Arc<dyn Fn(&mut M, &Value) -> bool + Send + Sync>;
type RelatedId<M> = Arc<dyn Fn(&M) -> Option<Value> + Send + Sync>;
pub(crate) type RelationLoader<M> =
    Arc<dyn Fn(&mut M, RelationQuery) -> QuillResult<bool> + Send + Sync>;

pub(crate) enum Access<M> {
    Value { get: Getter<M>, set: Setter<M> },
    BelongsTo { related_id: RelatedId<M>, load: RelationLoader<M> },
    HasOne { load: RelationLoader<M> },
    HasMany { load: RelationLoader<M> },
    Ignore,
}

/// One member of a model.
///
/// Plain members are undeclared unless they carry a column override or are
/// marked with [`Field::declare`]; relations are always declared. When a
/// model is `only_declared`, undeclared members are neither loaded nor
/// written.
pub struct Field<M> {
    name: String,
    column: Option<String>,
    table: Option<String>,
    declared: bool,
    access: Access<M>,
}

impl<M: Model> Field<M> {
    /// A plain column member. `set` receives the converted column value;
    /// values that do not convert to `T` are skipped.
    pub fn value<T, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: FromValue + Into<Value> + 'static,
        G: Fn(&M) -> T + Send + Sync + 'static,
        S: Fn(&mut M, T) + Send + Sync + 'static,
    {
        Self::new(
            name,
            false,
            Access::Value {
                get: Arc::new(move |entity: &M| get(entity).into()),
                set: Arc::new(move |entity: &mut M, value: &Value| {
                    T::from_value(value).map(|v| set(entity, v)).is_ok()
                }),
            },
        )
    }

    /// A reference to a row of `R` stored in this table's `<name>_id`
    /// column. `get` is used to write the related id back.
    pub fn belongs_to<R, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        R: Model,
        G: Fn(&M) -> Option<&R> + Send + Sync + 'static,
        S: Fn(&mut M, R) + Send + Sync + 'static,
    {
        Self::new(
            name,
            true,
            Access::BelongsTo {
                related_id: Arc::new(move |entity: &M| {
                    get(entity).and_then(|related| related.id())
                }),
                load: Arc::new(move |entity: &mut M, query: RelationQuery| {
                    let related = query.find::<R>()?;
                    set(entity, related);
                    Ok(true)
                }),
            },
        )
    }

    /// A single row of `R` referencing this row by foreign key.
    pub fn has_one<R, S>(name: impl Into<String>, set: S) -> Self
    where
        R: Model,
        S: Fn(&mut M, R) + Send + Sync + 'static,
    {
        Self::new(
            name,
            true,
            Access::HasOne {
                load: Arc::new(move |entity: &mut M, query: RelationQuery| {
                    Ok(query.first::<R>()?.map(|related| set(entity, related)).is_some())
                }),
            },
        )
    }

    /// All rows of `R` referencing this row by foreign key.
    pub fn has_many<R, S>(name: impl Into<String>, set: S) -> Self
    where
        R: Model,
        S: Fn(&mut M, Vec<R>) + Send + Sync + 'static,
    {
        Self::new(
            name,
            true,
            Access::HasMany {
                load: Arc::new(move |entity: &mut M, query: RelationQuery| {
                    set(entity, query.all::<R>()?);
                    Ok(true)
                }),
            },
        )
    }

    /// A member that is never read from or written to the database.
    pub fn ignore(name: impl Into<String>) -> Self {
        Self::new(name, true, Access::Ignore)
    }

    fn new(name: impl Into<String>, declared: bool, access: Access<M>) -> Self {
        Self {
            name: name.into(),
            column: None,
            table: None,
            declared,
            access,
        }
    }
}

impl<M> Field<M> {
    /// Overrides the column name. For relations this is the foreign key
    /// column.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self.declared = true;
        self
    }

    /// Overrides the related table name (relations only).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self.declared = true;
        self
    }

    /// Marks a plain member as declared.
    #[must_use]
    pub fn declare(mut self) -> Self {
        self.declared = true;
        self
    }

    /// The member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column override, if any.
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// The related table override, if any.
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Whether this member counts as declared for `only_declared` models.
    pub const fn is_declared(&self) -> bool {
        self.declared
    }

    /// The mapping kind.
    pub const fn mapping(&self) -> Mapping {
        match self.access {
            Access::Value { .. } => Mapping::Value,
            Access::BelongsTo { .. } => Mapping::BelongsTo,
            Access::HasOne { .. } => Mapping::HasOne,
            Access::HasMany { .. } => Mapping::HasMany,
            Access::Ignore => Mapping::Ignore,
        }
    }

    pub(crate) const fn access(&self) -> &Access<M> {
        &self.access
    }

    /// The current value of a plain member.
    pub fn value_of(&self, entity: &M) -> Option<Value> {
        match &self.access {
            Access::Value { get, .. } => Some(get(entity)),
            _ => None,
        }
    }

    /// The id of the related entity of a belongs-to member.
    pub fn related_id(&self, entity: &M) -> Option<Value> {
        match &self.access {
            Access::BelongsTo { related_id, .. } => related_id(entity),
            _ => None,
        }
    }
}

impl<M> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("mapping", &self.mapping())
            .field("column", &self.column)
            .field("table", &self.table)
            .field("declared", &self.declared)
            .finish()
    }
}

/// Per-type metadata: optional table name, the `only_declared` flag and the
/// field table.
pub struct ModelMeta<M> {
    table_name: Option<String>,
    only_declared: bool,
    fields: Vec<Field<M>>,
}

impl<M> Default for ModelMeta<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModelMeta<M> {
    /// Empty metadata: conventional table name, every member eligible.
    pub const fn new() -> Self {
        Self {
            table_name: None,
            only_declared: false,
            fields: Vec::new(),
        }
    }

    /// Overrides the table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Restricts loading and value extraction to declared members.
    #[must_use]
    pub fn only_declared(mut self) -> Self {
        self.only_declared = true;
        self
    }

    /// Appends a member.
    #[must_use]
    pub fn field(mut self, field: Field<M>) -> Self {
        self.fields.push(field);
        self
    }

    /// The table override, if any.
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// Whether undeclared members are skipped.
    pub const fn is_only_declared(&self) -> bool {
        self.only_declared
    }

    /// The members in declaration order.
    pub fn fields(&self) -> &[Field<M>] {
        &self.fields
    }

    /// All members called `name`, in declaration order.
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field<M>> + 'a {
        self.fields.iter().filter(move |field| field.name == name)
    }
}

impl<M> fmt::Debug for ModelMeta<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMeta")
            .field("table_name", &self.table_name)
            .field("only_declared", &self.only_declared)
            .field("fields", &self.fields)
            .finish()
    }
}

// ── Registry ───────────────────────────────────────────────────────────

type RegistryMap = HashMap<TypeId, &'static (dyn Any + Send + Sync)>;

static REGISTRY: LazyLock<Mutex<RegistryMap>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Returns the cached metadata for `M`, building it on first use.
///
/// `describe` runs outside the registry lock. If two threads race, the
/// first one to store its metadata wins and the other copy is discarded.
pub fn meta_for<M: Model>() -> &'static ModelMeta<M> {
    let key = TypeId::of::<M>();
    if let Some(meta) = lookup::<M>(key) {
        return meta;
    }

    let described: &'static ModelMeta<M> = Box::leak(Box::new(M::describe()));
    let stored = *registry().entry(key).or_insert(described);
    tracing::trace!(model = M::type_name(), "registered model metadata");
    stored.downcast_ref().unwrap_or(described)
}

fn lookup<M: Model>(key: TypeId) -> Option<&'static ModelMeta<M>> {
    registry().get(&key).and_then(|meta| meta.downcast_ref())
}

/// The registry map. Entries are only ever inserted whole, so a poisoned
/// lock still guards a consistent map.
fn registry() -> MutexGuard<'static, RegistryMap> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Account {
        id: Option<i64>,
        display_name: String,
        secret: String,
    }

    impl Model for Account {
        fn describe() -> ModelMeta<Self> {
            ModelMeta::new()
                .field(Field::value("id", |a: &Self| a.id, |a, v| a.id = v))
                .field(Field::value(
                    "displayName",
                    |a: &Self| a.display_name.clone(),
                    |a, v| a.display_name = v,
                ))
                .field(Field::ignore("secret"))
        }
    }

    #[derive(Default)]
    struct Address;

    impl Model for Address {
        fn describe() -> ModelMeta<Self> {
            ModelMeta::new().table("addr").only_declared()
        }
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("app::models::User"), "User");
        assert_eq!(simple_type_name("User"), "User");
        assert_eq!(simple_type_name("app::Wrapper<app::Inner>"), "Wrapper");
    }

    #[test]
    fn test_type_name_default() {
        assert_eq!(Account::type_name(), "Account");
    }

    #[test]
    fn test_table_name_convention_and_override() {
        assert_eq!(Account::table_name(), "accounts");
        assert_eq!(Address::table_name(), "addr");
        assert_eq!(Address::foreign_key(), "address_id");
    }

    #[test]
    fn test_meta_is_cached() {
        let a = Account::meta();
        let b = meta_for::<Account>();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.fields().len(), 3);
        assert!(Address::meta().is_only_declared());
    }

    #[test]
    fn test_registry_usable_after_poisoning() {
        #[derive(Default)]
        struct Ledger;

        impl Model for Ledger {
            fn describe() -> ModelMeta<Self> {
                ModelMeta::new().table("ledger")
            }
        }

        let result = std::thread::spawn(|| {
            let _guard = registry();
            panic!("panicked while holding the registry");
        })
        .join();
        assert!(result.is_err());
        assert!(REGISTRY.is_poisoned());

        assert_eq!(Ledger::table_name(), "ledger");
        assert_eq!(Account::meta().fields().len(), 3);
    }

    #[test]
    fn test_id_accessor() {
        let mut account = Account::default();
        assert_eq!(account.id(), None);
        account.id = Some(5);
        assert_eq!(account.id(), Some(Value::Int(5)));
        assert_eq!(Address.id(), None);
    }

    #[test]
    fn test_field_flags() {
        let meta = Account::meta();
        let name = meta.fields_named("displayName").next().unwrap();
        assert_eq!(name.mapping(), Mapping::Value);
        assert!(!name.is_declared());
        assert!(name.column_name().is_none());

        let secret = meta.fields_named("secret").next().unwrap();
        assert_eq!(secret.mapping(), Mapping::Ignore);

        let overridden: Field<Account> =
            Field::value("displayName", |a: &Account| a.display_name.clone(), |a, v| {
                a.display_name = v;
            })
            .column("nick");
        assert!(overridden.is_declared());
        assert_eq!(overridden.column_name(), Some("nick"));
    }

    #[test]
    fn test_setter_skips_mismatch() {
        let meta = Account::meta();
        let Access::Value { set, .. } = meta.fields_named("id").next().unwrap().access() else {
            panic!("id should be a value field");
        };
        let mut account = Account::default();
        assert!(set(&mut account, &Value::Int(3)));
        assert_eq!(account.id, Some(3));
        assert!(!set(&mut account, &Value::from("nope")));
        assert_eq!(account.id, Some(3));
        assert!(set(&mut account, &Value::Null));
        assert_eq!(account.id, None);
    }
}
