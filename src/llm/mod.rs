pub mod models;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use thiserror::Error;

pub use models::{AttemptFeedback, SqlRequest};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// Turns a natural-language question into SQL text. The text is untrusted
/// until it has passed the gateway.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, request: &SqlRequest) -> Result<String, LlmError>;
}

pub struct LlmManager {
    generator: Box<dyn SqlGenerator + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SqlGenerator + Send + Sync> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator })
    }

    pub fn with_generator(generator: Box<dyn SqlGenerator + Send + Sync>) -> Self {
        Self { generator }
    }

    pub async fn generate_sql(&self, request: &SqlRequest) -> Result<String, LlmError> {
        self.generator.generate_sql(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_backends() {
        let config = LlmConfig {
            backend: "local".to_string(),
            ..LlmConfig::default()
        };
        let err = LlmManager::new(&config).err().expect("unsupported backend");
        assert_eq!(err.to_string(), "LLM configuration error: Unsupported LLM backend: local");
    }

    #[test]
    fn remote_backend_needs_credentials() {
        let config = LlmConfig {
            backend: "remote".to_string(),
            api_url: Some("https://api.example.com/v1/chat/completions".to_string()),
            ..LlmConfig::default()
        };
        assert!(matches!(LlmManager::new(&config), Err(LlmError::ConfigError(_))));
    }
}
