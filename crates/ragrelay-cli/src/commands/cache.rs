//! `ragrelay cache` - inspect or clear the response cache

use crate::app::{CacheArgs, CacheCommands, OutputFormat};
use anyhow::Result;
use ragrelay_core::SqliteCache;

pub fn run(args: CacheArgs, cache: &SqliteCache, format: OutputFormat) -> Result<()> {
    match args.command {
        CacheCommands::Stats => {
            let entries = cache.len()?;
            match format {
                OutputFormat::Text => println!("{entries} cached responses"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "entries": entries }));
                }
            }
        }
        CacheCommands::Clear => {
            let removed = cache.clear()?;
            match format {
                OutputFormat::Text => println!("removed {removed} cached responses"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "removed": removed }));
                }
            }
        }
    }
    Ok(())
}
