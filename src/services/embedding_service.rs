//! Embedding service.
//!
//! Orchestrates calls to the configured [`EmbeddingProvider`]: splits
//! oversized batches while preserving input order, retries transient
//! provider failures with bounded exponential backoff, and honors a
//! cancellation token between provider calls.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::{EmbeddingError, KnowledgeError, KnowledgeResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};

/// Retry policy for transient provider failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay; doubles per failed attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_base_ms),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Embedding service wrapping one configured provider.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider, RetryPolicy::default())
    }

    /// Provider name for diagnostics.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Embedding dimension of the configured provider.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Maximum texts per single provider call.
    pub fn max_batch_size(&self) -> usize {
        self.provider.max_batch_size().max(1)
    }

    /// Embed a single text.
    pub async fn embed_single(
        &self,
        text: &str,
        token: &CancellationToken,
    ) -> KnowledgeResult<Vec<f32>> {
        let inputs = [EmbeddingInput::new("0", text)];
        let mut outputs = self.embed_many(&inputs, token).await?;
        outputs
            .pop()
            .map(|o| o.vector)
            .ok_or_else(|| EmbeddingError::Provider("empty embedding response".to_string()).into())
    }

    /// Embed many texts, preserving input order and length.
    ///
    /// Batches larger than the provider's per-call limit are split
    /// transparently. Each provider call is retried on transient
    /// failures up to the policy's attempt budget; non-transient
    /// failures propagate immediately.
    pub async fn embed_many(
        &self,
        inputs: &[EmbeddingInput],
        token: &CancellationToken,
    ) -> KnowledgeResult<Vec<EmbeddingOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let max_size = self.provider.max_batch_size().max(1);
        let mut all_outputs = Vec::with_capacity(inputs.len());

        for chunk in inputs.chunks(max_size) {
            if token.is_cancelled() {
                return Err(KnowledgeError::Cancelled);
            }
            let outputs = self.call_with_retry(chunk, token).await?;
            if outputs.len() != chunk.len() {
                return Err(EmbeddingError::Provider(format!(
                    "provider returned {} vectors for {} inputs",
                    outputs.len(),
                    chunk.len()
                ))
                .into());
            }
            all_outputs.extend(outputs);
        }

        debug!(
            provider = self.provider.name(),
            inputs = inputs.len(),
            batches = inputs.len().div_ceil(max_size),
            "embedded batch"
        );
        Ok(all_outputs)
    }

    /// Bounded-retry loop: explicit attempt counter, cancellation check
    /// before every provider call, exponential delay between attempts.
    async fn call_with_retry(
        &self,
        chunk: &[EmbeddingInput],
        token: &CancellationToken,
    ) -> KnowledgeResult<Vec<EmbeddingOutput>> {
        let mut attempt = 0u32;
        loop {
            if token.is_cancelled() {
                return Err(KnowledgeError::Cancelled);
            }
            match self.provider.embed_batch(chunk).await {
                Ok(outputs) => return Ok(outputs),
                Err(err) if err.is_transient() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = self.provider.name(),
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient embedding failure, retrying"
                    );
                    tokio::select! {
                        () = token.cancelled() => return Err(KnowledgeError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::null_embedding::NullEmbeddingProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn inputs(n: usize) -> Vec<EmbeddingInput> {
        (0..n)
            .map(|i| EmbeddingInput::new(i.to_string(), format!("text {i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_embed_many_empty() {
        let service = EmbeddingService::with_defaults(Arc::new(NullEmbeddingProvider::new(8)));
        let out = service
            .embed_many(&[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_embed_single() {
        let service = EmbeddingService::with_defaults(Arc::new(NullEmbeddingProvider::new(8)));
        let vector = service
            .embed_single("hello", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(vector.len(), 8);
    }

    // Provider that fails transiently a fixed number of times, counts
    // calls, and records batch sizes.
    struct FlakyProvider {
        dimension: usize,
        max_batch: usize,
        fail_first: usize,
        calls: AtomicUsize,
        fatal: bool,
    }

    impl FlakyProvider {
        fn new(dimension: usize, max_batch: usize, fail_first: usize, fatal: bool) -> Self {
            Self {
                dimension,
                max_batch,
                fail_first,
                calls: AtomicUsize::new(0),
                fatal,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed_batch(
            &self,
            inputs: &[EmbeddingInput],
        ) -> Result<Vec<EmbeddingOutput>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                if self.fatal {
                    return Err(EmbeddingError::AuthFailed("bad key".to_string()));
                }
                return Err(EmbeddingError::RateLimited("slow down".to_string()));
            }
            Ok(inputs
                .iter()
                .map(|i| EmbeddingOutput {
                    id: i.id.clone(),
                    vector: vec![0.1; self.dimension],
                })
                .collect())
        }

        fn max_batch_size(&self) -> usize {
            self.max_batch
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_splits_oversized_batches_preserving_order() {
        let provider = Arc::new(FlakyProvider::new(4, 3, 0, false));
        let service = EmbeddingService::new(provider.clone(), fast_retry(3));

        let out = service
            .embed_many(&inputs(7), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 7);
        for (i, o) in out.iter().enumerate() {
            assert_eq!(o.id, i.to_string());
        }
        // ceil(7/3) = 3 provider calls
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let provider = Arc::new(FlakyProvider::new(4, 10, 2, false));
        let service = EmbeddingService::new(provider.clone(), fast_retry(3));

        let out = service
            .embed_many(&inputs(2), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempt_budget() {
        let provider = Arc::new(FlakyProvider::new(4, 10, 100, false));
        let service = EmbeddingService::new(provider.clone(), fast_retry(3));

        let err = service
            .embed_many(&inputs(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::Embedding(EmbeddingError::RateLimited(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let provider = Arc::new(FlakyProvider::new(4, 10, 100, true));
        let service = EmbeddingService::new(provider.clone(), fast_retry(3));

        let err = service
            .embed_many(&inputs(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::Embedding(EmbeddingError::AuthFailed(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_provider_call() {
        let provider = Arc::new(FlakyProvider::new(4, 10, 0, false));
        let service = EmbeddingService::new(provider.clone(), fast_retry(3));

        let token = CancellationToken::new();
        token.cancel();
        let err = service.embed_many(&inputs(2), &token).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
