//! Error types for the newsdesk service
//!
//! Provides distinct error variants for each failure domain:
//! - Corpus ingestion and caching
//! - Vector index contract violations
//! - Embedding provider failures
//! - Generation provider failures
//! - Session lifecycle errors

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Corpus errors
    #[error("feed source unavailable: {url}: {message}")]
    SourceUnavailable { url: String, message: String },

    #[error("no articles available to build the corpus")]
    CorpusEmpty,

    #[error("corpus cache error: {0}")]
    CacheError(String),

    // Vector index errors
    #[error("corpus/index mismatch: {documents} documents but {vectors} vectors")]
    CorpusIndexMismatch { documents: usize, vectors: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimensionMismatch { expected: usize, actual: usize },

    // Embedding provider errors
    #[error("embedding request failed: {0}")]
    EmbeddingError(String),

    #[error("embedding request timed out after {timeout_secs}s")]
    EmbeddingTimeout { timeout_secs: u64 },

    // Generation provider errors
    #[error("generation API key not configured")]
    GenerationKeyMissing,

    #[error("generation request failed: {0}")]
    GenerationError(String),

    #[error("generation request timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("generation response contained no candidates")]
    GenerationNoCandidates,

    #[error("generation response structure was incomplete")]
    GenerationMalformed,

    #[error("generation response contained no text")]
    GenerationEmptyText,

    // Session errors
    #[error("session not found: {id}")]
    SessionNotFound { id: Uuid },

    // Internal errors
    #[error("configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error indicates a broken deployment contract rather than
    /// a transient condition. Fatal errors abort startup; they are never
    /// converted into degraded answers.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CorpusEmpty
                | Self::CorpusIndexMismatch { .. }
                | Self::VectorDimensionMismatch { .. }
                | Self::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_fatal() {
        let err = AppError::VectorDimensionMismatch {
            expected: 768,
            actual: 512,
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn provider_failures_are_not_fatal() {
        assert!(!AppError::GenerationNoCandidates.is_fatal());
        assert!(!AppError::EmbeddingError("boom".into()).is_fatal());
        assert!(!AppError::SourceUnavailable {
            url: "https://example.com/rss".into(),
            message: "503".into()
        }
        .is_fatal());
    }
}
