//! Embedding provider port.
//!
//! The only outbound dependency of the engine: converts batches of text
//! into fixed-dimension vectors. Implementations wrap one configured
//! provider; failures surface through the typed [`EmbeddingError`]
//! taxonomy so the service layer can decide what to retry.

use async_trait::async_trait;

use crate::domain::errors::EmbeddingError;

/// A single embedding request item.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Client-side correlation ID.
    pub id: String,
    /// Text to embed.
    pub text: String,
}

impl EmbeddingInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A single embedding result.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// Correlation ID matching the input.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "null").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate embeddings for a batch of texts in a single provider call.
    ///
    /// Output order and length must match the input. Callers are
    /// responsible for keeping the batch within [`max_batch_size`];
    /// the service layer splits larger batches before calling here.
    ///
    /// [`max_batch_size`]: EmbeddingProvider::max_batch_size
    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> Result<Vec<EmbeddingOutput>, EmbeddingError>;

    /// Maximum number of texts per single provider call.
    fn max_batch_size(&self) -> usize;
}
