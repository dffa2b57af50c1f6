//! Configuration model for the knowledge engine.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KnowledgeConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Segmenter configuration
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Conflict / retrieval tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// SQLite database URL (e.g., "sqlite:.mnemosyne/knowledge.db")
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite:.mnemosyne/knowledge.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider kind: "openai" (any OpenAI-compatible endpoint) or "null"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL for the embeddings API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Expected embedding dimension; fixed for the lifetime of a tenant's data
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// API key; falls back to the `OPENAI_API_KEY` env var
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum texts per single provider call
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Attempts for transient provider failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds, doubled per attempt
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_dimension() -> usize {
    1536
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_batch_size() -> usize {
    96
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_base_ms() -> u64 {
    500
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            dimension: default_dimension(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_batch_size: default_max_batch_size(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

/// Segmenter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SegmenterConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Trailing-context characters carried into the next chunk
    #[serde(default)]
    pub overlap: usize,
}

const fn default_max_chars() -> usize {
    1500
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap: 0,
        }
    }
}

/// Retrieval and conflict tuning.
///
/// The 0.85 / 0.75 defaults are operating points, not load-bearing
/// constants; both are tunable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Cosine similarity at or above which two segments conflict
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f32,

    /// Minimum cosine similarity for a retrieval hit
    #[serde(default = "default_retrieval_threshold")]
    pub retrieval_threshold: f32,

    /// Maximum segments returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_conflict_threshold() -> f32 {
    0.85
}

const fn default_retrieval_threshold() -> f32 {
    0.75
}

const fn default_top_k() -> usize {
    8
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            conflict_threshold: default_conflict_threshold(),
            retrieval_threshold: default_retrieval_threshold(),
            top_k: default_top_k(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KnowledgeConfig::default();
        assert_eq!(config.segmenter.max_chars, 1500);
        assert_eq!(config.segmenter.overlap, 0);
        assert!((config.retrieval.conflict_threshold - 0.85).abs() < f32::EPSILON);
        assert!((config.retrieval.retrieval_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.embedding.max_batch_size, 96);
        assert_eq!(config.embedding.dimension, 1536);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
retrieval:
  conflict_threshold: 0.9
embedding:
  model: custom-embedder
"#;
        let config: KnowledgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert!((config.retrieval.conflict_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.embedding.model, "custom-embedder");
        // Untouched sections keep their defaults
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.database.max_connections, 10);
    }
}
