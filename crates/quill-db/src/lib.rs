//! # quill-db
//!
//! Dialect-aware SQL builder and a small convention-driven ORM.
//!
//! ## Architecture
//!
//! Builders are immutable values. Every fluent call returns a new builder
//! that shares the previous one's state, so a partially built query can be
//! reused as the base of several others. SQL is rendered once, when a
//! terminal method (`to_sql`, `execute`, `first`, `all`, `update`, ...) runs:
//! fragments are expanded into placeholders, values are collected in bind
//! order, and both are handed to a [`Connection`](connection::Connection).
//!
//! Rows come back as a [`ResultSet`](row::ResultSet). Scalar targets are read
//! positionally through [`FromRow`](row::FromRow); models are filled by a
//! [`LoadContext`](load::LoadContext) that walks the field table declared in
//! [`Model::describe`](model::Model::describe) and runs one query per
//! included relation.
//!
//! ## Module Overview
//!
//! - [`dialect`] - identifier quoting and array literals per database family
//! - [`query`] - fragments and builders
//! - [`model`] - the [`Model`](model::Model) trait, field tables, registry
//! - [`naming`] - table/column/foreign key conventions and value extraction
//! - [`load`] - populating entities and their relations from rows
//! - [`connection`] - the driver-facing traits
//! - [`value`] / [`row`] - values, rows and conversions

// These clippy lints are intentionally allowed for the builder crate:
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - return_self_not_must_use: builder pattern methods are self-documenting
// - result_large_err: QuillError is the workspace error type and is used consistently
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::result_large_err)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::use_self)]
#![allow(clippy::type_complexity)]

pub mod connection;
pub mod dialect;
pub mod load;
pub mod model;
pub mod naming;
pub mod query;
pub mod row;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use connection::{Connection, Statement};
pub use dialect::Dialect;
pub use model::{Field, Mapping, Model, ModelMeta};
pub use query::{
    asc, desc, name, Arg, ColumnName, Name, NamedArgs, Order, QueryBuilder, QueryBuilderBase,
    QueryFragment, SelectBuilder, UpdateArgs, ValueMap,
};
pub use row::{FromRow, FromValue, ResultSet, Row};
pub use value::Value;
