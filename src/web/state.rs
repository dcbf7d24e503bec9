use crate::config::AppConfig;
use crate::db::QueryExecutor;
use crate::history::QueryHistory;
use crate::llm::LlmManager;
use crate::sql::SqlGateway;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub executor: Arc<dyn QueryExecutor>,
    pub llm_manager: LlmManager,
    pub gateway: SqlGateway,
    pub history: QueryHistory,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        executor: Arc<dyn QueryExecutor>,
        llm_manager: LlmManager,
    ) -> Self {
        Self {
            gateway: SqlGateway::new(config.database.dialect),
            history: QueryHistory::new(config.history.capacity),
            config,
            executor,
            llm_manager,
            startup_time: chrono::Utc::now(),
        }
    }
}
