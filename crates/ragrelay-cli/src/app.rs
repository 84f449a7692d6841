//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ragrelay")]
#[command(
    author,
    version,
    about = "Resilient request mediation for hosted LLM and embedding providers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer a question through the dispatcher
    Query(QueryArgs),

    /// Generate embeddings for one or more texts
    Embed(EmbedArgs),

    /// Inspect or clear the response cache
    Cache(CacheArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Question text
    pub text: String,

    /// Pin a query mode (bypass, local, global, hybrid, naive);
    /// selected automatically when omitted
    #[arg(long)]
    pub mode: Option<String>,

    /// User-visible deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Corpus version token included in the cache key
    #[arg(long, default_value = "default")]
    pub corpus_version: String,
}

#[derive(Args)]
pub struct EmbedArgs {
    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show entry counts
    Stats,
    /// Delete all cached responses
    Clear,
}
