use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info, warn};

use nl_analyst::config::{AppConfig, CliArgs};
use nl_analyst::db::{DuckDbConnectionManager, DuckDbExecutor};
use nl_analyst::llm::LlmManager;
use nl_analyst::util::logging::init_tracing;
use nl_analyst::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    init_tracing(args.log_format);

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool for {} (read-only: {})",
        config.database.connection_string, config.database.read_only
    );
    let db_manager = DuckDbConnectionManager::new(config.database.connection_string.clone())
        .read_only(config.database.read_only);
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;
    let executor = Arc::new(DuckDbExecutor::new(pool));

    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    if !config.database.read_only {
        warn!("Database opened read-write; only the SQL gateway guards against writes");
    }

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, executor, llm_manager));

    info!("Starting NL-Analyst server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
