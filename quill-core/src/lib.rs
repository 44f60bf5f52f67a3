//! Quill Core - a fluent, stateful SQL statement builder
//!
//! A [`QueryBuilder`] accumulates a table, columns, joins and filters through
//! chained calls, compiles them with a dialect-aware [`Grammar`], binds values
//! under named keys, runs the statement on its [`Connection`] and resets itself
//! so the same instance can build the next statement.
//!
//! ```no_run
//! use quill_core::{ConnectionConfig, Database};
//!
//! let db = Database::connect(ConnectionConfig::from_env()?)?;
//! let id = db.table("users").insert_get_id([("name", "Ada")])?;
//! let rows = db.table("users").where_("id", "=", id).get()?;
//! # Ok::<(), quill_core::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod connector;
pub mod database;
pub mod dialect;
pub mod error;
pub mod grammar;
pub mod operator;
pub mod value;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use builder::{
    Bindings, IntoColumns, IntoFields, JoinType, QueryBuilder, QueryResult, QueryState,
    StatementKind, WhereConnector,
};
pub use config::ConnectionConfig;
pub use connector::{Connection, Connector};
pub use database::{Database, QueryGuard};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use grammar::{format_bind_key, CompiledQuery, Grammar};
pub use operator::{op, IntoOperator, Operator};
pub use value::{Row, Value};
