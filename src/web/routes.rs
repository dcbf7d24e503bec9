use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

// API Routes - REST API for programmatic access
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Natural language questions
            .route("/ask", post(handlers::api::ask))
            // Direct SQL
            .route("/query", post(handlers::api::execute_query))
            .route("/validate", post(handlers::api::validate_query))
            .route("/explain", post(handlers::api::explain_query))
            .route("/suggest", post(handlers::api::suggest_fix))
            // Result analysis
            .route("/analyze", post(handlers::api::analyze_results))
            // Metadata
            .route("/schema", get(handlers::api::get_schema))
            .route("/history", get(handlers::api::query_history))
            .route("/analytics", get(handlers::api::query_analytics))
            .route("/status", get(handlers::api::system_status)),
    )
}

/// Full application router with tracing, CORS and compression layers.
pub fn app(state: Arc<AppState>) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}
