//! NFT Order Matcher - Binary Entry Point
//!
//! Runs one search against a JSON snapshot of the order book and prints the
//! outcome as JSON on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nft_order_matcher::config::{ConfigLoader, MatcherConfig};
use nft_order_matcher::engine::OrdersGraph;
use nft_order_matcher::store::{MemoryOrderStore, Snapshot};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nft-order-matcher")]
#[command(about = "Match NFT orders against an order book snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, env = "MATCHER_LOG_LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all matches of one order
    Match {
        /// JSON snapshot of the order book
        #[arg(short, long, value_name = "FILE")]
        snapshot: PathBuf,

        /// Root order id
        #[arg(short, long)]
        order: String,

        /// Evaluation instant in unix ms (defaults to the current time)
        #[arg(long)]
        now: Option<u64>,
    },
    /// Validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().await.context("Failed to load configuration")?;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    setup_tracing(&log_level)?;

    match cli.command {
        Commands::Match {
            snapshot,
            order,
            now,
        } => run_match(config, &snapshot, &order, now).await,
        Commands::Validate => validate_config(&config),
    }
}

async fn run_match(config: MatcherConfig, snapshot: &Path, order_id: &str, now: Option<u64>) -> Result<()> {
    let content = tokio::fs::read_to_string(snapshot)
        .await
        .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content).context("Failed to parse snapshot")?;

    let store = MemoryOrderStore::from_snapshot(snapshot);
    info!(orders = store.len(), "Snapshot loaded");

    let now = match now {
        Some(now) => now,
        None => current_millis()?,
    };

    let engine = OrdersGraph::new(Arc::new(store), config);
    let outcome = engine
        .search(order_id, now)
        .await
        .with_context(|| format!("Search failed for order {}", order_id))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn validate_config(config: &MatcherConfig) -> Result<()> {
    info!("Configuration is valid");
    info!("  Page size: {}", config.page_size);
    info!("  One-to-many enabled: {}", config.one_to_many_enabled);
    info!("  Log level: {}", config.log_level);
    Ok(())
}

fn current_millis() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the unix epoch")?;
    Ok(elapsed.as_millis() as u64)
}

fn setup_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
