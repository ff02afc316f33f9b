//! Error types for the library

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    /// Generic internal error
    #[error("{0}")]
    InternalAppError(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    LlmError(String),

    /// Quota exhaustion on the configured LLM backend (triggers fallback)
    #[error("LLM quota exhausted: {0}")]
    QuotaExhausted(String),

    /// PDF extraction error
    #[error("PDF extraction failed: {0}")]
    PdfExtractionError(String),

    /// Fewer than 100 characters of text could be extracted from a PDF
    #[error("insufficient text extracted from paper {0}")]
    InsufficientText(String),

    /// Malformed JSON returned by an LLM call
    #[error("failed to parse LLM response as JSON: {0}")]
    ParseError(String),

    /// Entity failed schema validation irrecoverably
    #[error("schema violation for {entity_kind}: {reason}")]
    SchemaViolation {
        /// Entity kind (theory, method, ...)
        entity_kind: String,
        /// Human-readable reason
        reason: String,
    },

    /// Graph store transaction conflict (constraint violation, merge clash)
    #[error("graph conflict: {0}")]
    GraphConflict(String),

    /// Graph store connectivity error (routing/connection/defunct)
    #[error("graph connection error: {0}")]
    GraphConnectionError(String),

    /// Corpus discovery error (unreadable directory, bad filename)
    #[error("corpus error: {0}")]
    CorpusError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Progress store I/O error
    #[error("progress store error: {0}")]
    ProgressStoreError(String),

    /// Cache I/O error
    #[error("cache error: {0}")]
    CacheError(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Anyhow error (for compatibility)
    #[error("Error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    /// Tracing initialization error
    #[error("Tracing Error: {0}")]
    TracingTryInitError(#[from] tracing_subscriber::util::TryInitError),
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::InternalAppError(s.to_string())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::InternalAppError(s)
    }
}

impl AppError {
    /// True for errors the worker pool should retry with exponential backoff
    /// rather than fail the paper outright (§7 "Transient I/O").
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::GraphConnectionError(_) | AppError::LlmError(_)
        )
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_str() {
        let error: AppError = "test error".into();
        assert!(matches!(error, AppError::InternalAppError(_)));
        assert_eq!(error.to_string(), "test error");
    }

    #[test]
    fn test_error_from_string() {
        let error: AppError = String::from("test error").into();
        assert!(matches!(error, AppError::InternalAppError(_)));
    }

    #[test]
    fn test_specific_errors() {
        let llm_error = AppError::LlmError("rate limit exceeded".to_string());
        assert!(llm_error.to_string().contains("LLM"));

        let insufficient = AppError::InsufficientText("1995_001".to_string());
        assert!(insufficient.to_string().contains("1995_001"));
    }

    #[test]
    fn test_is_transient() {
        assert!(AppError::LlmError("timeout".into()).is_transient());
        assert!(!AppError::SchemaViolation {
            entity_kind: "theory".into(),
            reason: "missing name".into()
        }
        .is_transient());
    }
}
