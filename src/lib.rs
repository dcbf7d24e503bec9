//! Natural-language analytics over DuckDB.
//!
//! Generated SQL is untrusted: every query passes the [`sql::SqlGateway`]
//! before it reaches a connection, and results are summarised by the
//! [`analysis`] engine.

pub mod analysis;
pub mod config;
pub mod db;
pub mod history;
pub mod llm;
pub mod sql;
pub mod util;
pub mod web;
