use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::analysis::{analyze, AnalysisReport, Row};
use crate::db::QueryOutput;
use crate::history::{HistoryStats, QueryHistoryItem, QueryStatus};
use crate::llm::{AttemptFeedback, SqlRequest};
use crate::sql::{SqlDialect, ValidationResult};
use crate::web::state::AppState;

// Error body

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            suggestion: None,
        }),
    )
}

fn api_error_with_suggestion(status: StatusCode, error: String, suggestion: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            suggestion: Some(suggestion),
        }),
    )
}

// Request and response types

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub question: String,
    pub sql: String,
    pub explanation: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub attempts: usize,
    pub analysis: AnalysisReport,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResponse {
    fn new(sql: String, output: QueryOutput) -> Self {
        Self {
            sql,
            row_count: output.row_count(),
            columns: output.columns,
            rows: output.rows,
            execution_time_ms: output.execution_time_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SqlTextRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub query: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestion: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub rows: Vec<Row>,
    /// Defaults to the keys of the first row.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub ddl: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub dialect: SqlDialect,
    pub read_only: bool,
    pub llm_backend: String,
    pub history_count: usize,
}

// Natural language questions

/// Question to SQL to rows to analysis. A rejected or failing query is fed
/// back to the generator until `llm.max_attempts` is used up.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Question cannot be empty"));
    }
    info!("Answering question: {}", question);

    let schema = state.executor.schema_ddl().await.map_err(|e| {
        error!("Failed to load schema: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load database schema")
    })?;

    let max_attempts = state.config.llm.max_attempts.max(1);
    let mut request = SqlRequest::new(question.clone(), schema);
    let mut last_error = api_error(StatusCode::INTERNAL_SERVER_ERROR, "No SQL was generated");

    for attempt in 1..=max_attempts {
        let attempt_start = Instant::now();
        let raw_sql = state.llm_manager.generate_sql(&request).await.map_err(|e| {
            error!("LLM error: {}", e);
            api_error(StatusCode::BAD_GATEWAY, e.to_string())
        })?;
        debug!("Attempt {} generated SQL: {}", attempt, raw_sql);

        let verdict = state.gateway.validate_and_sanitize(&raw_sql);
        let (status, message) = match verdict.into_result() {
            Ok(sql) => match state.executor.execute(&sql).await {
                Ok(output) => {
                    state
                        .history
                        .record(QueryHistoryItem::success(
                            &question,
                            &sql,
                            output.row_count(),
                            output.execution_time_ms,
                        ))
                        .await;

                    let analysis = analyze(&output.rows, &output.columns, &question);
                    return Ok(Json(AskResponse {
                        question,
                        explanation: state.gateway.explain(&sql),
                        sql,
                        row_count: output.row_count(),
                        columns: output.columns,
                        rows: output.rows,
                        execution_time_ms: output.execution_time_ms,
                        attempts: attempt,
                        analysis,
                    }));
                }
                Err(e) => {
                    let message = e.to_string();
                    state
                        .history
                        .record(QueryHistoryItem::failure(
                            &question,
                            &sql,
                            QueryStatus::Error,
                            &message,
                            elapsed_ms(attempt_start),
                        ))
                        .await;
                    (StatusCode::INTERNAL_SERVER_ERROR, message)
                }
            },
            Err(rejection) => {
                let message = rejection.to_string();
                state
                    .history
                    .record(QueryHistoryItem::failure(
                        &question,
                        &raw_sql,
                        QueryStatus::Rejected,
                        &message,
                        elapsed_ms(attempt_start),
                    ))
                    .await;
                (StatusCode::BAD_REQUEST, message)
            }
        };

        warn!("Attempt {} of {} failed: {}", attempt, max_attempts, message);
        let suggestion = state.gateway.suggest_correction(&raw_sql, &message);
        last_error = api_error_with_suggestion(status, message.clone(), suggestion.clone());
        request = request.with_feedback(AttemptFeedback {
            sql: raw_sql,
            error: message,
            suggestion,
        });
    }

    Err(last_error)
}

// Direct SQL

pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let started = Instant::now();
    let prompt = payload.question.unwrap_or_default();

    let sql = match state.gateway.validate_and_sanitize(&payload.query).into_result() {
        Ok(sql) => sql,
        Err(rejection) => {
            let message = rejection.to_string();
            state
                .history
                .record(QueryHistoryItem::failure(
                    &prompt,
                    &payload.query,
                    QueryStatus::Rejected,
                    &message,
                    elapsed_ms(started),
                ))
                .await;
            let suggestion = state.gateway.suggest_correction(&payload.query, &message);
            return Err(api_error_with_suggestion(
                StatusCode::BAD_REQUEST,
                message,
                suggestion,
            ));
        }
    };

    info!("Executing query: {}", sql);
    match state.executor.execute(&sql).await {
        Ok(output) => {
            state
                .history
                .record(QueryHistoryItem::success(
                    &prompt,
                    &sql,
                    output.row_count(),
                    output.execution_time_ms,
                ))
                .await;
            Ok(Json(QueryResponse::new(sql, output)))
        }
        Err(e) => {
            let message = e.to_string();
            state
                .history
                .record(QueryHistoryItem::failure(
                    &prompt,
                    &sql,
                    QueryStatus::Error,
                    &message,
                    elapsed_ms(started),
                ))
                .await;
            let suggestion = state.gateway.suggest_correction(&sql, &message);
            Err(api_error_with_suggestion(
                StatusCode::INTERNAL_SERVER_ERROR,
                message,
                suggestion,
            ))
        }
    }
}

pub async fn validate_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SqlTextRequest>,
) -> Json<ValidationResult> {
    Json(state.gateway.validate_and_sanitize(&payload.query).into())
}

pub async fn explain_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SqlTextRequest>,
) -> Json<ExplainResponse> {
    Json(ExplainResponse {
        explanation: state.gateway.explain(&payload.query),
    })
}

pub async fn suggest_fix(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SuggestRequest>,
) -> Json<SuggestResponse> {
    Json(SuggestResponse {
        suggestion: state.gateway.suggest_correction(&payload.query, &payload.error),
    })
}

// Result analysis

pub async fn analyze_results(Json(payload): Json<AnalyzeRequest>) -> Json<AnalysisReport> {
    let columns = payload.columns.unwrap_or_else(|| {
        payload
            .rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    });
    Json(analyze(&payload.rows, &columns, &payload.question))
}

// Metadata

pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaResponse>, ApiError> {
    let ddl = state.executor.schema_ddl().await.map_err(|e| {
        error!("Failed to load schema: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load database schema")
    })?;
    Ok(Json(SchemaResponse { ddl }))
}

pub async fn query_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Json<Vec<QueryHistoryItem>> {
    let limit = params.limit.unwrap_or(state.config.history.capacity);
    Json(state.history.recent(limit).await)
}

pub async fn query_analytics(State(state): State<Arc<AppState>>) -> Json<HistoryStats> {
    Json(state.history.stats().await)
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        dialect: state.gateway.dialect(),
        read_only: state.config.database.read_only,
        llm_backend: state.config.llm.backend.clone(),
        history_count: state.history.len().await,
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
