//! Mnemosyne CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mnemosyne::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Ingest(args) => mnemosyne::cli::commands::ingest::execute(args, config_path, cli.json).await,
        Commands::Query(args) => mnemosyne::cli::commands::query::execute(args, config_path, cli.json).await,
        Commands::Summary(args) => mnemosyne::cli::commands::summary::execute(args, config_path, cli.json).await,
        Commands::Delete(args) => mnemosyne::cli::commands::delete::execute(args, config_path, cli.json).await,
    };

    if let Err(err) = result {
        mnemosyne::cli::handle_error(err, cli.json);
    }
}
