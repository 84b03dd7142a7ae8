//! Naming conventions and value extraction.
//!
//! Type `BlogPost` maps to table `blog_posts` and foreign key `blog_post_id`;
//! member `screenName` maps to column `screen_name`. Every convention can be
//! overridden in the model's metadata.

use quill_core::utils::text::{push_snake_case, snake_case};

use crate::model::{Field, Mapping, Model};
use crate::query::{Arg, ValueMap};
use crate::value::Value;

/// The conventional table name for a simple type name: snake case plus
/// `es` if the name ends in `s`, else `s`.
///
/// ```
/// use quill_db::naming::table_name_for;
///
/// assert_eq!(table_name_for("User"), "users");
/// assert_eq!(table_name_for("Status"), "statuses");
/// assert_eq!(table_name_for("BlogPost"), "blog_posts");
/// ```
pub fn table_name_for(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 6);
    push_snake_case(type_name, &mut out);
    out.push_str(if type_name.ends_with('s') { "es" } else { "s" });
    out
}

/// The conventional foreign key for a simple type name.
pub fn foreign_key_for(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 3);
    push_snake_case(type_name, &mut out);
    out.push_str("_id");
    out
}

/// The column a member reads from and writes to: the override, else the
/// snake-cased member name, with `_id` appended for belongs-to members.
pub fn column_for<M>(field: &Field<M>) -> String {
    if let Some(column) = field.column_name() {
        return column.to_string();
    }
    let mut column = snake_case(field.name());
    if field.mapping() == Mapping::BelongsTo {
        column.push_str("_id");
    }
    column
}

/// Extracts the column values of `entity` for UPDATE/INSERT.
///
/// Ignored members, has-one and has-many relations contribute nothing.
/// Belongs-to members contribute the related entity's id (NULL when unset).
/// When two members map to the same column the first one wins.
pub fn get_values<M: Model>(entity: &M) -> ValueMap {
    let meta = M::meta();
    let mut values = ValueMap::new();
    for field in meta.fields() {
        if meta.is_only_declared() && !field.is_declared() {
            continue;
        }
        let value = match field.mapping() {
            Mapping::Value => field.value_of(entity),
            Mapping::BelongsTo => Some(field.related_id(entity).unwrap_or(Value::Null)),
            Mapping::HasOne | Mapping::HasMany | Mapping::Ignore => None,
        };
        if let Some(value) = value {
            values.insert_if_absent(column_for(field), Arg::Value(value));
        }
    }
    values
}
