//! `mnemosyne ingest` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::cli::build_service;
use crate::domain::models::{ChunkOutcome, KnowledgeConfig, SegmentType};
use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Tenant to ingest into
    #[arg(long)]
    pub tenant: String,

    /// Inline text to ingest
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,

    /// File whose contents to ingest
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Provenance: document, conversation, website, manual
    #[arg(long, default_value = "document")]
    pub r#type: String,
}

pub async fn execute(args: IngestArgs, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config: KnowledgeConfig = ConfigLoader::load(config_path)?;
    let segment_type = SegmentType::from_str(&args.r#type)
        .with_context(|| format!("unknown segment type: {}", args.r#type))?;

    let (text, source) = match (&args.text, &args.file) {
        (Some(text), None) => (text.clone(), "inline".to_string()),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (text, path.display().to_string())
        }
        _ => bail!("exactly one of --text or --file is required"),
    };

    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), serde_json::json!(source));

    let (service, connection) = build_service(&config).await?;
    let report = service
        .ingest_text(
            &args.tenant,
            &text,
            segment_type,
            metadata,
            &CancellationToken::new(),
        )
        .await?;
    connection.close().await;

    if json {
        let outcomes: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|o| match o {
                ChunkOutcome::Stored { id } => serde_json::json!({"stored": id}),
                ChunkOutcome::Superseded { id, replaced } => {
                    serde_json::json!({"stored": id, "replaced": replaced})
                }
                ChunkOutcome::Redundant { kept } => serde_json::json!({"redundant": kept}),
                ChunkOutcome::Skipped { reason } => serde_json::json!({"skipped": reason}),
            })
            .collect();
        println!("{}", serde_json::json!({ "outcomes": outcomes }));
    } else {
        println!(
            "Ingested {} chunks: {} stored, {} skipped",
            report.outcomes.len(),
            report.stored_count(),
            report.skipped_count()
        );
        for outcome in &report.outcomes {
            if let ChunkOutcome::Skipped { reason } = outcome {
                println!("  skipped: {reason}");
            }
        }
    }
    Ok(())
}
