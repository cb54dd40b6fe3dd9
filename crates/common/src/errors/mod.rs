//! Error types for the AnswerForge engine
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes for client handling
//! - Transient/caller-error classification for retry decisions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Template errors (1xxx)
    TemplateInvalid,
    MissingVariable,

    // Run errors (2xxx)
    ValidationError,
    ContextOverflow,
    ParseError,
    NoValidScore,

    // Generator errors (8xxx)
    GeneratorTimeout,
    GeneratorUnavailable,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Templates (1xxx)
            ErrorCode::TemplateInvalid => 1001,
            ErrorCode::MissingVariable => 1002,

            // Runs (2xxx)
            ErrorCode::ValidationError => 2001,
            ErrorCode::ContextOverflow => 2002,
            ErrorCode::ParseError => 2003,
            ErrorCode::NoValidScore => 2004,

            // Generator (8xxx)
            ErrorCode::GeneratorTimeout => 8001,
            ErrorCode::GeneratorUnavailable => 8002,
            ErrorCode::UpstreamError => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    // Template errors
    #[error("Invalid template: {message}")]
    TemplateInvalid { message: String },

    #[error("Required template variable missing: {variable}")]
    MissingVariable { variable: String },

    // Run errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Context overflow: prompt is {length} chars, generator budget is {budget} chars")]
    ContextOverflow { length: usize, budget: usize },

    #[error("Output parse failed: {message}")]
    Parse { message: String },

    #[error("No fragment produced a parseable score")]
    NoValidScore,

    // Generator errors
    #[error("Generator timeout after {timeout_ms}ms")]
    GeneratorTimeout { timeout_ms: u64 },

    #[error("Generator unavailable: {message}")]
    GeneratorUnavailable { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::TemplateInvalid { .. } => ErrorCode::TemplateInvalid,
            EngineError::MissingVariable { .. } => ErrorCode::MissingVariable,
            EngineError::Validation { .. } => ErrorCode::ValidationError,
            EngineError::ContextOverflow { .. } => ErrorCode::ContextOverflow,
            EngineError::Parse { .. } => ErrorCode::ParseError,
            EngineError::NoValidScore => ErrorCode::NoValidScore,
            EngineError::GeneratorTimeout { .. } => ErrorCode::GeneratorTimeout,
            EngineError::GeneratorUnavailable { .. } => ErrorCode::GeneratorUnavailable,
            EngineError::HttpClient(_) => ErrorCode::UpstreamError,
            EngineError::Configuration { .. } => ErrorCode::ConfigurationError,
            EngineError::Serialization(_) => ErrorCode::SerializationError,
            EngineError::Internal { .. } => ErrorCode::InternalError,
            EngineError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Check if this error is transient and worth retrying at the calling layer.
    /// The engine itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::GeneratorTimeout { .. }
                | EngineError::GeneratorUnavailable { .. }
                | EngineError::HttpClient(_)
        )
    }

    /// Check if this error is a caller error (bad template, bad input).
    /// Retrying the same run will fail again.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::TemplateInvalid { .. }
                | EngineError::MissingVariable { .. }
                | EngineError::Validation { .. }
                | EngineError::ContextOverflow { .. }
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = EngineError::MissingVariable {
            variable: "context".into(),
        };
        assert_eq!(err.code(), ErrorCode::MissingVariable);
        assert_eq!(err.code().as_code(), 1002);
    }

    #[test]
    fn test_transient_classification() {
        let err = EngineError::GeneratorTimeout { timeout_ms: 30_000 };
        assert!(err.is_transient());
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_caller_error_classification() {
        let err = EngineError::ContextOverflow {
            length: 20_000,
            budget: 16_000,
        };
        assert!(err.is_caller_error());
        assert!(!err.is_transient());
        assert_eq!(err.code().as_code(), 2002);
    }
}
