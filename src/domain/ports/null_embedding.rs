//! Offline embedding provider.
//!
//! Produces deterministic hashed bag-of-words vectors without any
//! network call. Identical text always maps to the identical vector,
//! which is exactly what the conflict resolver's idempotent re-ingest
//! path needs in tests and offline deployments.

use async_trait::async_trait;
use std::hash::{DefaultHasher, Hash, Hasher};

use super::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
use crate::domain::errors::EmbeddingError;

/// Deterministic local embedding provider.
#[derive(Debug, Clone)]
pub struct NullEmbeddingProvider {
    dimension: usize,
}

impl Default for NullEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NullEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Hash each lowercase token into a bucket, then L2-normalize.
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        } else {
            // Whitespace-only text still yields a valid unit vector
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> Result<Vec<EmbeddingOutput>, EmbeddingError> {
        Ok(inputs
            .iter()
            .map(|input| EmbeddingOutput {
                id: input.id.clone(),
                vector: self.vectorize(&input.text),
            })
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        1024
    }
}
