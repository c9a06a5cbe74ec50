mod cli;
mod mcp;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use php_indexer::IndexerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP traffic in `serve`, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "php_indexer=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = IndexerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Index {
            roots,
            ignore,
            watch,
        } => {
            cli::index_roots(config, &roots, ignore, watch).await?;
        }
        Commands::Serve { roots } => {
            cli::run_mcp_server(config, &roots).await?;
        }
        Commands::Search { query, roots } => {
            cli::search_symbols(config, &query, roots).await?;
        }
        Commands::Inheritance { fqn, roots } => {
            cli::show_inheritance(config, &fqn, roots).await?;
        }
        Commands::Usages { fqn, roots } => {
            cli::show_usages(config, &fqn, roots).await?;
        }
        Commands::Stats { roots } => {
            cli::show_stats(config, roots).await?;
        }
    }

    Ok(())
}
