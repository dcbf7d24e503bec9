use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use duckdb::Connection;
use r2d2::Pool;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error};

use super::db_pool::DuckDbConnectionManager;
use super::schema;
use crate::analysis::Row;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("{0}")]
    Database(#[from] duckdb::Error),
    #[error("Failed to convert query results: {0}")]
    Conversion(#[from] arrow::error::ArrowError),
    #[error("Failed to decode query results: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Database task execution failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Tabular result of one query. Rows are keyed by column name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub execution_time_ms: u64,
}

impl QueryOutput {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Runs already-validated SQL against the analytics database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryOutput, ExecutionError>;

    /// `CREATE TABLE` text for every user table.
    async fn schema_ddl(&self) -> Result<String, ExecutionError>;
}

pub struct DuckDbExecutor {
    pool: Pool<DuckDbConnectionManager>,
}

impl DuckDbExecutor {
    pub fn new(pool: Pool<DuckDbConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for DuckDbExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryOutput, ExecutionError> {
        let pool = self.pool.clone();
        let sql = sql.to_string();

        let output = tokio::task::spawn_blocking(move || -> Result<QueryOutput, ExecutionError> {
            let conn = pool.get()?;
            run_query(&conn, &sql)
        })
        .await?;

        match &output {
            Ok(result) => debug!(
                "Query returned {} rows in {}ms",
                result.row_count(),
                result.execution_time_ms
            ),
            Err(e) => error!("Database query error: {}", e),
        }
        output
    }

    async fn schema_ddl(&self) -> Result<String, ExecutionError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> Result<String, ExecutionError> {
            let conn = pool.get()?;
            schema::load_ddl(&conn)
        })
        .await?
    }
}

/// Executes `sql` on `conn` and collects the Arrow result into JSON rows.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput, ExecutionError> {
    let start_time = Instant::now();

    let mut stmt = conn.prepare(sql)?;
    let arrow_batch = stmt.query_arrow([])?;

    let columns = arrow_batch
        .get_schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect::<Vec<String>>();
    let record_batches: Vec<RecordBatch> = arrow_batch.collect();

    let rows = batches_to_rows(&record_batches)?;

    Ok(QueryOutput {
        columns,
        rows,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>, ExecutionError> {
    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;

    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&buffer)?)
}
