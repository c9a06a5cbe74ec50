use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use php_indexer::{IndexCoordinator, IndexerConfig, IndexerError, Result};

#[derive(Parser)]
#[command(name = "php-indexer")]
#[command(about = "Incremental PHP code index: symbols, inheritance and usages")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Index a project and report what was found
    php-indexer index ./app

    # Index and keep watching for changes
    php-indexer index ./app ./packages --watch

    # Search for types by name fragment
    php-indexer search User --root ./app

    # Direct children and implementors of a type
    php-indexer inheritance 'App\Models\Model' --root ./app

    # Files depending on a type
    php-indexer usages 'App\Services\Mailer' --root ./app

    # Start MCP server
    php-indexer serve
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML config file (defaults to ./.php-indexer.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct RootArgs {
    /// Project root to index (repeatable)
    #[arg(long = "root", default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Glob pattern to exclude, relative to each root (repeatable)
    #[arg(long)]
    pub ignore: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index one or more project roots
    Index {
        /// Project roots
        #[arg(default_value = ".")]
        roots: Vec<PathBuf>,

        /// Glob pattern to exclude, relative to each root (repeatable)
        #[arg(long)]
        ignore: Vec<String>,

        /// Keep watching for file changes until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Start MCP server on stdio
    Serve {
        /// Roots to index right away instead of waiting for the initialize tool
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Search types by name fragment
    Search {
        /// Case-insensitive fragment of a fully qualified name
        query: String,

        #[command(flatten)]
        roots: RootArgs,
    },

    /// Show direct children and implementors of a type
    Inheritance {
        /// Fully qualified type name
        fqn: String,

        #[command(flatten)]
        roots: RootArgs,
    },

    /// Show files that depend on a type
    Usages {
        /// Fully qualified type name
        fqn: String,

        #[command(flatten)]
        roots: RootArgs,
    },

    /// Show index statistics
    Stats {
        #[command(flatten)]
        roots: RootArgs,
    },
}

fn ignore_override(ignore: Vec<String>) -> Option<Vec<String>> {
    if ignore.is_empty() {
        None
    } else {
        Some(ignore)
    }
}

/// Initializes a coordinator over `roots` and waits for the first full
/// pass, showing a spinner on stderr.
async fn build_index(
    config: IndexerConfig,
    roots: &[PathBuf],
    ignore: Vec<String>,
) -> Result<IndexCoordinator> {
    let coordinator = IndexCoordinator::new(config);
    let summary = coordinator
        .initialize(roots, ignore_override(ignore))
        .await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(80));

    loop {
        let progress = coordinator.progress();
        pb.set_message(format!(
            "Indexing {}/{} files",
            progress.files_processed, progress.files_queued
        ));
        tokio::select! {
            _ = coordinator.wait_until_idle() => break,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
    pb.finish_and_clear();

    let progress = coordinator.progress();
    eprintln!(
        "Indexed {} symbols from {} files in {} roots ({} failed) in {} ms",
        progress.symbols_extracted,
        summary.accepted_file_count,
        summary.root_count,
        progress.errors,
        progress.elapsed_ms
    );

    Ok(coordinator)
}

pub async fn index_roots(
    mut config: IndexerConfig,
    roots: &[PathBuf],
    ignore: Vec<String>,
    watch: bool,
) -> Result<()> {
    config.watch = watch;
    let coordinator = build_index(config, roots, ignore).await?;

    let stats = coordinator.get_stats()?;
    println!(
        "{} symbols, {} files, {} dependency edges",
        stats.nodes, stats.files, stats.edges
    );

    if watch {
        println!("Watching for changes (Ctrl+C to stop)...");
        tokio::signal::ctrl_c().await?;
        coordinator.close();
        coordinator.wait_until_idle().await;

        let stats = coordinator.get_stats()?;
        println!(
            "{} symbols, {} files, {} dependency edges",
            stats.nodes, stats.files, stats.edges
        );
    }

    Ok(())
}

pub async fn run_mcp_server(config: IndexerConfig, roots: &[PathBuf]) -> Result<()> {
    use crate::mcp::McpServer;
    use rmcp::ServiceExt;

    let coordinator = IndexCoordinator::new(config);
    if !roots.is_empty() {
        let summary = coordinator.initialize(roots, None).await?;
        tracing::info!(
            "Pre-indexing {} files from {} roots",
            summary.accepted_file_count,
            summary.root_count
        );
    }

    let server = McpServer::new(coordinator.clone());
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = server
        .serve(transport)
        .await
        .map_err(|e| IndexerError::Mcp(e.to_string()))?;

    tracing::info!("MCP server initialized, waiting for requests...");
    service
        .waiting()
        .await
        .map_err(|e| IndexerError::Mcp(e.to_string()))?;

    coordinator.close();
    Ok(())
}

pub async fn search_symbols(config: IndexerConfig, query: &str, args: RootArgs) -> Result<()> {
    let coordinator = build_index(without_watch(config), &args.roots, args.ignore).await?;
    let results = coordinator.search_symbol(query)?;

    if results.is_empty() {
        println!("No symbols found for query: {}", query);
        return Ok(());
    }

    for symbol in results {
        match &symbol.parent_type {
            Some(parent) => println!(
                "{:<9} {} extends {}\n          {}",
                symbol.kind.as_str(),
                symbol.fqn,
                parent,
                symbol.source_path
            ),
            None => println!(
                "{:<9} {}\n          {}",
                symbol.kind.as_str(),
                symbol.fqn,
                symbol.source_path
            ),
        }
    }

    Ok(())
}

pub async fn show_inheritance(config: IndexerConfig, fqn: &str, args: RootArgs) -> Result<()> {
    let coordinator = build_index(without_watch(config), &args.roots, args.ignore).await?;
    let info = coordinator.get_inheritance(fqn)?;

    println!("Children of {}:", fqn);
    print_list(&info.children);
    println!("Implementors of {}:", fqn);
    print_list(&info.implementors);

    Ok(())
}

pub async fn show_usages(config: IndexerConfig, fqn: &str, args: RootArgs) -> Result<()> {
    let coordinator = build_index(without_watch(config), &args.roots, args.ignore).await?;
    let usages = coordinator.get_usages(fqn)?;

    if usages.is_empty() {
        println!("No usages found for {}", fqn);
        return Ok(());
    }

    println!("Files depending on {}:", fqn);
    print_list(&usages);
    Ok(())
}

pub async fn show_stats(config: IndexerConfig, args: RootArgs) -> Result<()> {
    let coordinator = build_index(without_watch(config), &args.roots, args.ignore).await?;
    let stats = coordinator.get_stats()?;

    println!("Index Statistics:");
    println!("  Symbols: {}", stats.nodes);
    println!("  Files:   {}", stats.files);
    println!("  Edges:   {}", stats.edges);

    Ok(())
}

fn without_watch(mut config: IndexerConfig) -> IndexerConfig {
    config.watch = false;
    config
}

fn print_list(items: &[String]) {
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        println!("  {}", item);
    }
}
