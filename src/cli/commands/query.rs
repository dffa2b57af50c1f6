//! `mnemosyne query` command.

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::build_service;
use crate::domain::models::KnowledgeConfig;
use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Tenant to query
    #[arg(long)]
    pub tenant: String,

    /// Query text
    pub text: String,

    /// Override the configured result limit
    #[arg(long)]
    pub top_k: Option<usize>,
}

pub async fn execute(args: QueryArgs, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let mut config: KnowledgeConfig = ConfigLoader::load(config_path)?;
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }

    let (service, connection) = build_service(&config).await?;
    // Degrade to "no knowledge available" rather than failing the
    // surrounding chat flow
    let hits = match service
        .query(&args.tenant, &args.text, &CancellationToken::new())
        .await
    {
        Ok(hits) => hits,
        Err(err) => {
            warn!(error = %err, "retrieval failed, degrading to empty result");
            Vec::new()
        }
    };
    connection.close().await;

    if json {
        let rows: Vec<serde_json::Value> = hits
            .iter()
            .map(|h| {
                serde_json::json!({
                    "text": h.segment.text,
                    "metadata": h.segment.metadata,
                    "score": h.score,
                })
            })
            .collect();
        println!("{}", serde_json::json!({ "results": rows }));
    } else if hits.is_empty() {
        println!("No relevant knowledge found.");
    } else {
        for hit in &hits {
            println!("[{:.3}] ({}) {}", hit.score, hit.segment.segment_type, hit.segment.text);
        }
    }
    Ok(())
}
