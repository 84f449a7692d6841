//! RagRelay CLI
//!
//! Resilient front-end to hosted LLM and embedding providers.

use anyhow::Result;
use clap::Parser;
use ragrelay_core::{RelayConfig, SqliteCache};
use std::sync::Arc;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    let config = RelayConfig::load()?;

    // Open the response cache (RAGRELAY_CACHE env var overrides)
    let cache_path = std::env::var("RAGRELAY_CACHE")
        .map(std::path::PathBuf::from)
        .ok()
        .or_else(|| config.cache_path.clone())
        .unwrap_or_else(RelayConfig::default_cache_path);
    let cache = Arc::new(SqliteCache::open(&cache_path)?);

    match cli.command {
        Commands::Query(args) => commands::query::run(args, &config, cache, cli.format).await,
        Commands::Embed(args) => commands::embed::run(args, &config, cache, cli.format).await,
        Commands::Cache(args) => commands::cache::run(args, &cache, cli.format),
    }
}
