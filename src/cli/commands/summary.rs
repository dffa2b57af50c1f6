//! `mnemosyne summary` command.

use anyhow::Result;
use clap::Args;

use crate::cli::build_service;
use crate::domain::models::KnowledgeConfig;
use crate::infrastructure::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Tenant to summarize
    #[arg(long)]
    pub tenant: String,
}

pub async fn execute(args: SummaryArgs, config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config: KnowledgeConfig = ConfigLoader::load(config_path)?;
    let (service, connection) = build_service(&config).await?;
    let summary = service.get_summary(&args.tenant).await?;
    connection.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.digest);
        for fact in summary.digest_facts.iter().take(20) {
            println!("  {fact}");
        }
        if summary.digest_facts.len() > 20 {
            println!("  ... and {} more", summary.digest_facts.len() - 20);
        }
    }
    Ok(())
}
