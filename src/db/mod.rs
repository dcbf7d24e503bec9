//! DuckDB access: connection pooling, query execution and schema DDL.

pub mod db_pool;
pub mod executor;
pub mod schema;

pub use db_pool::DuckDbConnectionManager;
pub use executor::{DuckDbExecutor, ExecutionError, QueryExecutor, QueryOutput};
