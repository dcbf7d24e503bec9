use serde::{Deserialize, Serialize};

/// Input for one SQL generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRequest {
    pub question: String,
    pub schema: String,
    /// Set on retries: what went wrong with the previous attempt.
    pub feedback: Option<AttemptFeedback>,
}

impl SqlRequest {
    pub fn new(question: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            schema: schema.into(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: AttemptFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

// Rejected or failed SQL from an earlier attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptFeedback {
    pub sql: String,
    pub error: String,
    pub suggestion: String,
}
