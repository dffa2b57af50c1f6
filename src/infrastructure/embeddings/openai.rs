//! OpenAI-compatible embedding provider adapter.
//!
//! Talks to a `/v1/embeddings`-shaped endpoint via reqwest. Compatible
//! with OpenAI, Azure OpenAI, and local servers exposing the same
//! contract. HTTP failures are mapped onto the typed [`EmbeddingError`]
//! taxonomy so the service layer can tell transient from fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::EmbeddingError;
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};

/// OpenAI-compatible embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<String, EmbeddingError> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                EmbeddingError::AuthFailed(
                    "API key not set; set OPENAI_API_KEY or configure embedding.api_key"
                        .to_string(),
                )
            })
    }

    async fn call_embeddings_api(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self.api_key()?;
        let url = format!("{}/embeddings", self.config.base_url);

        let request_body = EmbeddingsRequest {
            model: self.config.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(self.config.timeout_secs)
                } else {
                    EmbeddingError::Provider(format!("embedding request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(match status.as_u16() {
                401 | 403 => EmbeddingError::AuthFailed(body),
                400 | 404 | 422 => EmbeddingError::InvalidInput(body),
                429 => EmbeddingError::RateLimited(body),
                _ => EmbeddingError::Provider(format!("{status}: {body}")),
            });
        }

        let result: EmbeddingsResponse = response.json().await.map_err(|e| {
            EmbeddingError::Provider(format!("failed to parse embedding response: {e}"))
        })?;

        // Sort by index to restore input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        for item in &data {
            if item.embedding.len() != self.config.dimension {
                return Err(EmbeddingError::Provider(format!(
                    "provider returned dimension {} but {} is configured",
                    item.embedding.len(),
                    self.config.dimension
                )));
            }
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed_batch(
        &self,
        inputs: &[EmbeddingInput],
    ) -> Result<Vec<EmbeddingOutput>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = inputs.iter().map(|i| i.text.clone()).collect();
        let vectors = self.call_embeddings_api(texts).await?;

        if vectors.len() != inputs.len() {
            return Err(EmbeddingError::Provider(format!(
                "provider returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }

        Ok(inputs
            .iter()
            .zip(vectors)
            .map(|(input, vector)| EmbeddingOutput {
                id: input.id.clone(),
                vector,
            })
            .collect())
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

// -- wire types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            dimension,
            ..Default::default()
        }
    }

    fn inputs(texts: &[&str]) -> Vec<EmbeddingInput> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| EmbeddingInput::new(i.to_string(), *t))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_batch_restores_order() {
        let mut server = mockito::Server::new_async().await;
        // Provider replies out of order; adapter must sort by index
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"embedding":[0.0,1.0],"index":1},
                    {"embedding":[1.0,0.0],"index":0}
                ]}"#,
            )
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let out = provider
            .embed_batch(&inputs(&["first", "second"]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(out[0].vector, vec![1.0, 0.0]);
        assert_eq!(out[1].vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_transient_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let err = provider.embed_batch(&inputs(&["x"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::RateLimited(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let err = provider.embed_batch(&inputs(&["x"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::AuthFailed(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_input_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(422)
            .with_body("input too long")
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let err = provider.embed_batch(&inputs(&["x"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(503)
            .with_body("upstream down")
            .create_async()
            .await;

        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let err = provider.embed_batch(&inputs(&["x"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_dimension_drift_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[1.0,0.0,0.0],"index":0}]}"#)
            .create_async()
            .await;

        // Configured for 2 dimensions, provider returns 3
        let provider = OpenAiEmbeddingProvider::new(config(&server.url(), 2)).unwrap();
        let err = provider.embed_batch(&inputs(&["x"])).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let provider =
            OpenAiEmbeddingProvider::new(config("http://localhost:1", 2)).unwrap();
        let out = provider.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_api_key_is_auth_failure() {
        let cfg = EmbeddingConfig {
            api_key: None,
            ..Default::default()
        };
        let provider = OpenAiEmbeddingProvider::new(cfg).unwrap();
        // Only deterministic when OPENAI_API_KEY is absent from the env
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                provider.api_key(),
                Err(EmbeddingError::AuthFailed(_))
            ));
        }
    }
}
