//! Domain errors for the knowledge engine.

use thiserror::Error;
use uuid::Uuid;

/// Typed failures from the external embedding provider.
///
/// Transient variants are retried by the embedding service with bounded
/// backoff; fatal variants propagate to the caller immediately.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("Embedding provider call timed out after {0}s")]
    Timeout(u64),

    #[error("Embedding provider authentication failed: {0}")]
    AuthFailed(String),

    #[error("Embedding provider rejected the input: {0}")]
    InvalidInput(String),

    #[error("Embedding provider error: {0}")]
    Provider(String),
}

impl EmbeddingError {
    /// Whether this failure is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout(_) | Self::Provider(_)
        )
    }
}

/// Domain-level errors for knowledge operations.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Segment {segment} is already superseded by {superseded_by}")]
    ConflictState { segment: Uuid, superseded_by: Uuid },

    #[error("Segment not found: {0}")]
    SegmentNotFound(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

impl From<sqlx::Error> for KnowledgeError {
    fn from(err: sqlx::Error) -> Self {
        KnowledgeError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for KnowledgeError {
    fn from(err: serde_json::Error) -> Self {
        KnowledgeError::Serialization(err.to_string())
    }
}
