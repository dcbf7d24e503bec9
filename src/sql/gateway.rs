use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::correction::suggest_correction;
use super::explain::explain;
use super::parser::{is_faithful_rewrite, parse, SqlDialect, StatementKind};

/// Keywords rejected anywhere in the raw text before parsing.
///
/// The scan is a plain case-insensitive substring match, so identifiers such as
/// `created_at` or `update_count` are rejected too.
pub const FORBIDDEN_KEYWORDS: [&str; 12] = [
    "DROP", "DELETE", "TRUNCATE", "INSERT", "UPDATE", "ALTER", "CREATE", "REPLACE", "GRANT",
    "REVOKE", "EXEC", "EXECUTE",
];

/// Why the gateway refused a query. Every variant is terminal for the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Query cannot be empty")]
    EmptyQuery,
    #[error("Forbidden operation detected: {keyword}. Only SELECT queries are allowed.")]
    ForbiddenOperation { keyword: String },
    #[error("SQL parsing error: {message}")]
    SyntaxError { message: String },
    #[error("Only SELECT queries are allowed (found {kind} statement)")]
    NonSelectStatement { kind: StatementKind },
    #[error(
        "Query uses syntax that cannot be reproduced safely. \
         Avoid subscripts on function calls or literals."
    )]
    UnfaithfulRewrite,
}

/// Outcome of [`SqlGateway::validate_and_sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Sanitized(String),
    Rejected(GatewayError),
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationVerdict::Sanitized(_))
    }

    pub fn sanitized_query(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Sanitized(query) => Some(query),
            ValidationVerdict::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<String, GatewayError> {
        match self {
            ValidationVerdict::Sanitized(query) => Ok(query),
            ValidationVerdict::Rejected(err) => Err(err),
        }
    }
}

/// Boundary shape of a verdict, as returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ValidationVerdict> for ValidationResult {
    fn from(verdict: ValidationVerdict) -> Self {
        match verdict {
            ValidationVerdict::Sanitized(query) => Self {
                is_valid: true,
                sanitized_query: Some(query),
                error: None,
            },
            ValidationVerdict::Rejected(err) => Self {
                is_valid: false,
                sanitized_query: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Read-only gate every query passes before it reaches a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlGateway {
    dialect: SqlDialect,
}

impl SqlGateway {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Accepts only single-effect `SELECT` input and returns it re-serialized from
    /// the parsed tree, so that execution never sees the caller's original text.
    pub fn validate_and_sanitize(&self, text: &str) -> ValidationVerdict {
        match self.check(text) {
            Ok(sanitized) => {
                debug!("Query accepted by gateway: {}", sanitized);
                ValidationVerdict::Sanitized(sanitized)
            }
            Err(err) => {
                warn!("Query rejected by gateway: {}", err);
                ValidationVerdict::Rejected(err)
            }
        }
    }

    pub fn explain(&self, query: &str) -> String {
        explain(query, self.dialect)
    }

    pub fn suggest_correction(&self, query: &str, error_message: &str) -> String {
        suggest_correction(query, error_message)
    }

    fn check(&self, text: &str) -> Result<String, GatewayError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::EmptyQuery);
        }

        if let Some(keyword) = find_forbidden_keyword(trimmed) {
            return Err(GatewayError::ForbiddenOperation {
                keyword: keyword.to_string(),
            });
        }

        let tree = parse(trimmed, self.dialect).map_err(|e| GatewayError::SyntaxError {
            message: e.message,
        })?;

        if let Some(rejected) = tree.statements().iter().find(|s| !s.is_select()) {
            return Err(GatewayError::NonSelectStatement {
                kind: rejected.kind(),
            });
        }

        let sanitized = tree.to_sql();
        if !is_faithful_rewrite(trimmed, &sanitized, self.dialect) {
            return Err(GatewayError::UnfaithfulRewrite);
        }
        Ok(sanitized)
    }
}

/// First entry of [`FORBIDDEN_KEYWORDS`] found anywhere in `text`, ignoring case.
pub fn find_forbidden_keyword(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();
    FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| upper.contains(keyword))
}
