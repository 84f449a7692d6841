//! Embedding mediation
//!
//! Batched embedding for document-folder processing: per-text caching,
//! chunking, bounded concurrency, and the same retry/timeout envelope as
//! text queries.

use crate::cache::CacheStore;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::fingerprint::embedding_fingerprint;
use crate::provider::Provider;
use crate::retry::call_with_retry;
use crate::supervisor::run_with_timeout;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Resilient embedding front-end over an opaque provider
pub struct EmbeddingService {
    provider: Arc<dyn Provider>,
    cache: Arc<dyn CacheStore>,
    config: RelayConfig,
}

impl EmbeddingService {
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Arc<dyn CacheStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.embedding_dimensions()
    }

    /// Embed a single text
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RelayError::Provider("no embedding returned".into()))
    }

    /// Embed a batch of texts, preserving input order.
    ///
    /// Cached vectors are reused; the remainder is fetched in chunks of
    /// `embedding_batch_size`, at most `max_concurrent_documents` chunks
    /// in flight at once.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let deployment = self.provider.embedding_deployment();

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = embedding_fingerprint(deployment, text);
            if let Some(cached) = self.cache.get(&key)? {
                if let Ok(vector) = serde_json::from_str::<Vec<f32>>(&cached) {
                    results.push(Some(vector));
                    continue;
                }
            }
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if uncached_texts.is_empty() {
            debug!(count = texts.len(), "all embeddings served from cache");
            return Ok(results.into_iter().flatten().collect());
        }

        debug!(
            cached = texts.len() - uncached_texts.len(),
            to_fetch = uncached_texts.len(),
            "embedding batch"
        );

        let chunk_size = self.config.batch.embedding_batch_size.max(1);
        let concurrent = self.config.batch.max_concurrent_documents.max(1);
        let chunks: Vec<Vec<String>> = uncached_texts
            .chunks(chunk_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        let mut fetched: Vec<(usize, Result<Vec<Vec<f32>>>)> =
            stream::iter(chunks.into_iter().enumerate())
                .map(|(idx, chunk)| async move {
                    let result = self.embed_chunk(chunk).await;
                    (idx, result)
                })
                .buffer_unordered(concurrent)
                .collect()
                .await;

        fetched.sort_by_key(|(idx, _)| *idx);

        let mut fresh = Vec::with_capacity(uncached_texts.len());
        for (_, result) in fetched {
            fresh.extend(result?);
        }

        if fresh.len() != uncached_texts.len() {
            return Err(RelayError::Provider(format!(
                "expected {} embeddings, got {}",
                uncached_texts.len(),
                fresh.len()
            )));
        }

        for ((i, text), vector) in uncached_indices
            .into_iter()
            .zip(uncached_texts.iter())
            .zip(fresh)
        {
            let key = embedding_fingerprint(deployment, text);
            let encoded = serde_json::to_string(&vector)?;
            self.cache.put(&key, &encoded)?;
            results[i] = Some(vector);
        }

        Ok(results.into_iter().flatten().collect())
    }

    async fn embed_chunk(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let provider = Arc::clone(&self.provider);
        let retry = self.config.retry.clone();
        let max_wait = self.config.timeouts.default_timeout();

        run_with_timeout(max_wait, |token| async move {
            let deadline = Instant::now() + max_wait;
            call_with_retry(&retry, deadline, &token, || {
                provider.embed(&texts, &token)
            })
            .await
        })
        .await
    }
}
