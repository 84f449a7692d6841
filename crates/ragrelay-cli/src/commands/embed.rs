//! `ragrelay embed` - generate embeddings

use crate::app::{EmbedArgs, OutputFormat};
use anyhow::Result;
use ragrelay_core::{build_provider, EmbeddingService, RelayConfig, SqliteCache};
use std::sync::Arc;

pub async fn run(
    args: EmbedArgs,
    config: &RelayConfig,
    cache: Arc<SqliteCache>,
    format: OutputFormat,
) -> Result<()> {
    let provider = build_provider(&config.provider)?;
    let service = EmbeddingService::new(provider, cache, config.clone());

    let vectors = service.embed_batch(&args.texts).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&vectors)?);
        }
        OutputFormat::Text => {
            for (text, vector) in args.texts.iter().zip(&vectors) {
                println!("{text}: {} dimensions", vector.len());
            }
        }
    }

    Ok(())
}
