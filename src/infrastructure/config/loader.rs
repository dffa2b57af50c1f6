//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::KnowledgeConfig;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid conflict_threshold: {0}. Must be within [0.0, 1.0]")]
    InvalidConflictThreshold(f32),

    #[error("Invalid retrieval_threshold: {0}. Must be within [0.0, 1.0]")]
    InvalidRetrievalThreshold(f32),

    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    #[error("Invalid segmenter max_chars: {0}. Must be greater than 0")]
    InvalidMaxChars(usize),

    #[error("Invalid segmenter overlap: {overlap}. Must be less than max_chars ({max_chars})")]
    InvalidOverlap { overlap: usize, max_chars: usize },

    #[error("Invalid embedding dimension: {0}. Must be at least 1")]
    InvalidDimension(usize),

    #[error("Invalid max_batch_size: {0}. Must be at least 1")]
    InvalidMaxBatchSize(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,
}

/// Loads [`KnowledgeConfig`] with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, lowest to highest precedence:
    /// 1. Programmatic defaults
    /// 2. YAML file (when `path` is given and exists)
    /// 3. Environment variables (`MNEMOSYNE_*`, `__` splits nesting)
    pub fn load(path: Option<&Path>) -> Result<KnowledgeConfig> {
        let mut figment = Figment::from(Serialized::defaults(KnowledgeConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: KnowledgeConfig = figment
            .merge(Env::prefixed("MNEMOSYNE_").split("__"))
            .extract()
            .context("failed to load configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &KnowledgeConfig) -> Result<(), ConfigError> {
        let retrieval = &config.retrieval;
        if !(0.0..=1.0).contains(&retrieval.conflict_threshold) {
            return Err(ConfigError::InvalidConflictThreshold(
                retrieval.conflict_threshold,
            ));
        }
        if !(0.0..=1.0).contains(&retrieval.retrieval_threshold) {
            return Err(ConfigError::InvalidRetrievalThreshold(
                retrieval.retrieval_threshold,
            ));
        }
        if retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(retrieval.top_k));
        }
        if config.segmenter.max_chars == 0 {
            return Err(ConfigError::InvalidMaxChars(config.segmenter.max_chars));
        }
        if config.segmenter.overlap >= config.segmenter.max_chars {
            return Err(ConfigError::InvalidOverlap {
                overlap: config.segmenter.overlap,
                max_chars: config.segmenter.max_chars,
            });
        }
        if config.embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension(config.embedding.dimension));
        }
        if config.embedding.max_batch_size == 0 {
            return Err(ConfigError::InvalidMaxBatchSize(
                config.embedding.max_batch_size,
            ));
        }
        if config.database.url.is_empty() {
            return Err(ConfigError::EmptyDatabaseUrl);
        }
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = KnowledgeConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ConfigLoader::load(None).unwrap();
        assert_eq!(config.retrieval.top_k, 8);
    }

    #[test]
    fn test_load_merges_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "retrieval:\n  top_k: 3\nsegmenter:\n  max_chars: 800"
        )
        .unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.segmenter.max_chars, 800);
        // Untouched values keep defaults
        assert!((config.retrieval.conflict_threshold - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = KnowledgeConfig::default();
        config.retrieval.conflict_threshold = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConflictThreshold(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = KnowledgeConfig::default();
        config.retrieval.top_k = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTopK(0))
        ));
    }

    #[test]
    fn test_validate_rejects_overlap_ge_max_chars() {
        let mut config = KnowledgeConfig::default();
        config.segmenter.overlap = config.segmenter.max_chars;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidOverlap { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = KnowledgeConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }
}
