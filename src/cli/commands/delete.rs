//! `mnemosyne delete` command.

use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use crate::cli::build_service;
use crate::domain::models::KnowledgeConfig;
use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Owning tenant
    #[arg(long)]
    pub tenant: String,

    /// Segment ID to delete
    #[arg(long)]
    pub id: String,
}

pub async fn execute(args: DeleteArgs, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config: KnowledgeConfig = ConfigLoader::load(config_path)?;
    let segment_id = Uuid::parse_str(&args.id).context("invalid segment id")?;

    let (service, connection) = build_service(&config).await?;
    let deleted = service.delete_memory(&args.tenant, segment_id).await?;
    connection.close().await;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted {segment_id}");
    } else {
        println!("Segment {segment_id} not found");
    }
    Ok(())
}
