//! `ragrelay query` - dispatch one question

use crate::app::{OutputFormat, QueryArgs};
use anyhow::Result;
use ragrelay_core::{build_provider, Dispatcher, QueryRequest, RelayConfig, SqliteCache};
use std::sync::Arc;
use std::time::Duration;

pub async fn run(
    args: QueryArgs,
    config: &RelayConfig,
    cache: Arc<SqliteCache>,
    format: OutputFormat,
) -> Result<()> {
    let provider = build_provider(&config.provider)?;
    let dispatcher = Dispatcher::new(provider, cache, config.clone());

    let mut request = QueryRequest::new(args.text, args.corpus_version);
    if let Some(mode) = args.mode.as_deref() {
        request = request.with_mode(mode.parse()?);
    }
    if let Some(secs) = args.timeout {
        request = request.with_max_wait(Duration::from_secs(secs));
    }

    match dispatcher.dispatch(&request).await {
        Ok(answer) => {
            match format {
                OutputFormat::Text => println!("{answer}"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "answer": answer }));
                }
            }
            Ok(())
        }
        Err(error) => {
            let code = error.exit_code();
            eprintln!("error ({}): {error}", error.kind());
            std::process::exit(code);
        }
    }
}
