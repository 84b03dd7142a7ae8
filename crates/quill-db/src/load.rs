//! Populating entities from rows.
//!
//! A [`LoadContext`] is created per row. It walks the model's field table,
//! assigns plain columns, and issues one query per included relation. The
//! row's own id is looked up at most once.

use std::cell::OnceCell;
use std::collections::HashSet;

use quill_core::QuillResult;

use crate::model::{Access, Model};
use crate::naming::column_for;
use crate::query::{BuilderState, QueryBuilderBase, SelectBuilder};
use crate::row::Row;
use crate::value::Value;

/// Per-row loading state.
pub struct LoadContext<'a> {
    state: &'a BuilderState,
    row: &'a Row,
    columns: &'a HashSet<String>,
    include: &'a [String],
    id: OnceCell<Option<Value>>,
}

impl<'a> LoadContext<'a> {
    /// `state` supplies the connection for relation queries, `columns` the
    /// column names present in the result, `include` the relation names to
    /// load. Dotted entries (`topics.owner`) include `topics` here and pass
    /// `owner` on to the nested query.
    pub fn new(
        state: &'a BuilderState,
        row: &'a Row,
        columns: &'a HashSet<String>,
        include: &'a [String],
    ) -> Self {
        Self {
            state,
            row,
            columns,
            include,
            id: OnceCell::new(),
        }
    }

    /// Fills `entity` from the row.
    ///
    /// Members whose column is missing or whose value does not convert are
    /// left unchanged. Once a member name has been assigned, later entries
    /// with the same name are skipped.
    ///
    /// # Errors
    ///
    /// Propagates errors from relation queries, including
    /// [`RecordNotFound`](quill_core::QuillError::RecordNotFound) when a
    /// belongs-to target does not exist. A selected foreign key that is
    /// NULL matches no row, so it fails the same way; leave the column out
    /// of the select list to skip the relation.
    pub fn load<M: Model>(&self, entity: &mut M) -> QuillResult<()> {
        let meta = M::meta();
        let mut loaded: HashSet<&str> = HashSet::new();

        for field in meta.fields() {
            let name = field.name();
            if loaded.contains(name) {
                continue;
            }
            if meta.is_only_declared() && !field.is_declared() {
                continue;
            }

            let assigned = match field.access() {
                Access::Ignore => false,
                Access::Value { set, .. } => {
                    let column = column_for(field);
                    match self.present(&column) {
                        Some(value) => {
                            let ok = set(entity, value);
                            if !ok {
                                tracing::trace!(
                                    model = M::type_name(),
                                    member = name,
                                    kind = value.kind(),
                                    "skipping member: value does not convert"
                                );
                            }
                            ok
                        }
                        None => false,
                    }
                }
                Access::BelongsTo { load, .. } => {
                    if !self.includes(name) {
                        continue;
                    }
                    let column = column_for(field);
                    match self.present(&column) {
                        None => false,
                        Some(key) => {
                            tracing::debug!(
                                model = M::type_name(),
                                relation = name,
                                null_key = key.is_null(),
                                "loading belongs-to"
                            );
                            let query =
                                self.relation(field.table_name(), "id", Some(key.clone()), name);
                            load(entity, query)?
                        }
                    }
                }
                Access::HasOne { load } => {
                    if !self.includes(name) {
                        continue;
                    }
                    match self.own_id(entity) {
                        Some(id) => {
                            tracing::debug!(
                                model = M::type_name(),
                                relation = name,
                                "loading has-one"
                            );
                            let column = foreign_key_column::<M>(field.column_name());
                            let query = self.relation(field.table_name(), &column, Some(id), name);
                            load(entity, query)?
                        }
                        None => false,
                    }
                }
                Access::HasMany { load } => {
                    if !self.includes(name) {
                        continue;
                    }
                    let id = self.own_id(entity);
                    tracing::debug!(
                        model = M::type_name(),
                        relation = name,
                        has_id = id.is_some(),
                        "loading has-many"
                    );
                    let column = foreign_key_column::<M>(field.column_name());
                    let query = self.relation(field.table_name(), &column, id, name);
                    load(entity, query)?
                }
            };

            if assigned {
                loaded.insert(name);
            }
        }
        Ok(())
    }

    /// The row's value for `column`, if the result has that column.
    fn present(&self, column: &str) -> Option<&'a Value> {
        if self.columns.contains(column) {
            self.row.get_value(column)
        } else {
            None
        }
    }

    /// The row's primary key: the `id` column when selected, else the
    /// entity's own id. Computed once per row.
    fn own_id<M: Model>(&self, entity: &M) -> Option<Value> {
        self.id
            .get_or_init(|| {
                if self.columns.contains("id") {
                    self.row.get_value("id").filter(|v| !v.is_null()).cloned()
                } else {
                    entity.id()
                }
            })
            .clone()
    }

    fn includes(&self, name: &str) -> bool {
        self.include.iter().any(|entry| {
            entry == name
                || entry
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// The include list for the query that loads relation `name`.
    fn nested_include(&self, name: &str) -> Vec<String> {
        self.include
            .iter()
            .filter_map(|entry| entry.strip_prefix(name)?.strip_prefix('.'))
            .map(str::to_string)
            .collect()
    }

    fn relation(
        &self,
        table: Option<&str>,
        column: &str,
        key: Option<Value>,
        name: &str,
    ) -> RelationQuery {
        RelationQuery {
            state: self.state.fresh(),
            table: table.map(str::to_string),
            column: column.to_string(),
            key,
            include: self.nested_include(name),
        }
    }
}

/// The foreign key column of a has-one or has-many relation: the override,
/// else the owner's conventional foreign key.
fn foreign_key_column<M: Model>(column: Option<&str>) -> String {
    column.map_or_else(M::foreign_key, str::to_string)
}

/// A query for the target of one relation, handed to the relation's loader.
pub struct RelationQuery {
    state: BuilderState,
    table: Option<String>,
    column: String,
    key: Option<Value>,
    include: Vec<String>,
}

impl RelationQuery {
    fn select<R: Model>(&self) -> SelectBuilder<R> {
        let query = SelectBuilder::<()>::from_state(self.state.clone())
            .from_model::<R>()
            .include(self.include.iter().cloned());
        match &self.table {
            Some(table) => query.from(table),
            None => query,
        }
    }

    /// The single row whose `id` is the key.
    pub(crate) fn find<R: Model>(self) -> QuillResult<R> {
        let key = self.key.clone().unwrap_or(Value::Null);
        self.select::<R>().find(key)
    }

    /// The first row whose foreign key column equals the key.
    pub(crate) fn first<R: Model>(self) -> QuillResult<Option<R>> {
        let key = self.key.clone().unwrap_or(Value::Null);
        self.select::<R>().where_eq(&self.column, key).first()
    }

    /// Every row whose foreign key column equals the key; empty without a
    /// key.
    pub(crate) fn all<R: Model>(self) -> QuillResult<Vec<R>> {
        match &self.key {
            Some(key) => self
                .select::<R>()
                .where_eq(&self.column, key.clone())
                .all(),
            None => Ok(Vec::new()),
        }
    }
}
