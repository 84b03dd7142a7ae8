//! Query building and rendering.
//!
//! - [`fragment`] - identifier tokens, arguments and SQL fragment expansion
//! - [`base`] - the WHERE list and operations shared by all builders
//! - [`select`] - SELECT statements and entity materialization
//! - [`builder`] - the root [`QueryBuilder`]
//! - [`mutation`] - UPDATE/INSERT rendering and staged values

pub mod base;
pub mod builder;
pub mod fragment;
pub mod mutation;
pub mod select;

pub use base::{BuilderState, Conditions, NamedArgs, QueryBuilderBase};
pub use builder::{asc, desc, name, QueryBuilder};
pub use fragment::{push_arg, Arg, ColumnName, Name, QueryFragment};
pub use mutation::{UpdateArgs, ValueMap};
pub use select::{Order, SelectBuilder, SelectColumn};
