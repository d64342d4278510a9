#![allow(clippy::result_large_err)]

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod query_safety;
pub mod schema;
pub mod sql_dialect;
pub mod value;

pub use config::{CacheConfig, Config, CrudConfig, DbBackend, DbConfig, LogConfig, PoolConfig};
pub use connection::{DbConnection, QueryOutcome};
pub use entity::Entity;
pub use error::DbError;
pub use query_safety::{has_multiple_statements, is_safe_read_query, is_valid_identifier, strip_comments};
pub use schema::{ColumnInfo, TableSchema};
pub use sql_dialect::{MySqlDialect, PlaceholderStyle, SqlDialect, SqliteDialect};
pub use value::Value;
