//! Command-line interface.

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::models::KnowledgeConfig;
use crate::domain::ports::null_embedding::NullEmbeddingProvider;
use crate::domain::ports::EmbeddingProvider;
use crate::infrastructure::database::{DatabaseConnection, SqliteSegmentStore};
use crate::infrastructure::embeddings::OpenAiEmbeddingProvider;
use crate::services::{EmbeddingService, KnowledgeService, RetryPolicy, Segmenter};

/// Per-tenant knowledge engine.
#[derive(Debug, Parser)]
#[command(name = "mnemosyne", version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest text or a file into a tenant's knowledge base
    Ingest(commands::ingest::IngestArgs),
    /// Query a tenant's knowledge base
    Query(commands::query::QueryArgs),
    /// Show a tenant's knowledge summary
    Summary(commands::summary::SummaryArgs),
    /// Delete one stored segment
    Delete(commands::delete::DeleteArgs),
}

/// Build the knowledge service from configuration. The returned
/// connection must outlive the service.
pub async fn build_service(config: &KnowledgeConfig) -> Result<(KnowledgeService, DatabaseConnection)> {
    let connection =
        DatabaseConnection::new(&config.database.url, config.database.max_connections).await?;
    let store = Arc::new(SqliteSegmentStore::new(connection.pool().clone()));

    let provider: Arc<dyn EmbeddingProvider> = match config.embedding.provider.as_str() {
        "null" => Arc::new(NullEmbeddingProvider::new(config.embedding.dimension)),
        _ => Arc::new(OpenAiEmbeddingProvider::new(config.embedding.clone())?),
    };
    let embedder = EmbeddingService::new(provider, RetryPolicy::from_config(&config.embedding));
    let segmenter = Segmenter::new(config.segmenter.clone())?;

    let service = KnowledgeService::new(store, embedder, segmenter, config.retrieval.clone());
    Ok((service, connection))
}

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        eprintln!(
            "{}",
            serde_json::json!({ "error": format!("{err:#}") })
        );
    } else {
        eprintln!("error: {err:#}");
    }
    std::process::exit(1);
}
