//! Query dispatch
//!
//! One end-to-end request/response cycle: mode selection, fingerprinting,
//! cache consultation, single-flight de-duplication, and the supervised,
//! retried provider call. The in-flight slot table and the cache are the
//! only shared mutable state; claim-or-join on the slot table is atomic
//! under a single lock.

use crate::cache::CacheStore;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::fingerprint::{fingerprint, CacheKey};
use crate::mode::{select_mode, QueryMode};
use crate::provider::{GenerationParams, Provider};
use crate::retry::call_with_retry;
use crate::supervisor::run_with_timeout;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One user question. Immutable once created.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub raw_text: String,
    /// Caller-pinned mode; selected automatically when absent
    pub mode: Option<QueryMode>,
    /// Opaque token identifying the indexed corpus state
    pub corpus_version: String,
    /// User-visible deadline; the configured default applies when absent
    pub max_wait: Option<Duration>,
}

impl QueryRequest {
    pub fn new(raw_text: impl Into<String>, corpus_version: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            mode: None,
            corpus_version: corpus_version.into(),
            max_wait: None,
        }
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Result delivered through an in-flight slot. Errors are shared between
/// the claimer and every joined waiter.
type SlotResult = std::result::Result<String, Arc<RelayError>>;

type SlotReceiver = watch::Receiver<Option<SlotResult>>;

enum SlotClaim {
    /// This caller resolves the key; it must publish a result
    Claimed(watch::Sender<Option<SlotResult>>),
    /// Another caller is already resolving the key
    Joined(SlotReceiver),
}

/// Removes the claimed slot even if the claiming future is dropped
/// mid-call, so later callers never join a dead channel.
struct SlotGuard<'a> {
    dispatcher: &'a Dispatcher,
    key: CacheKey,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.remove_slot(&self.key);
    }
}

/// Orchestrates cache, single-flight slots, retry, and timeouts around an
/// opaque provider.
pub struct Dispatcher {
    provider: Arc<dyn Provider>,
    cache: Arc<dyn CacheStore>,
    config: RelayConfig,
    params: GenerationParams,
    inflight: Mutex<HashMap<CacheKey, SlotReceiver>>,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Arc<dyn CacheStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
            params: GenerationParams::default(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Resolve one query: cache hit, joined in-flight call, or a fresh
    /// supervised provider call.
    pub async fn dispatch(&self, request: &QueryRequest) -> Result<String> {
        let text = request.raw_text.trim();
        if text.is_empty() {
            return Err(RelayError::InvalidInput("query text is empty".into()));
        }

        let mode = match request.mode {
            Some(mode) => mode,
            None => select_mode(text)?,
        };
        let key = fingerprint(
            mode,
            text,
            &request.corpus_version,
            self.provider.deployment(),
            &self.params,
        )?;

        if let Some(value) = self.cache.get(&key)? {
            debug!(%key, %mode, "cache hit");
            return Ok(value);
        }

        let max_wait = self.config.timeouts.clamp(request.max_wait);

        match self.claim_or_join(&key) {
            SlotClaim::Joined(rx) => {
                debug!(%key, "joining in-flight call");
                self.await_slot(rx, max_wait).await
            }
            SlotClaim::Claimed(tx) => self.resolve_claimed(&key, text, mode, max_wait, tx).await,
        }
    }

    /// Dispatch many questions with bounded concurrency, preserving input
    /// order in the results.
    pub async fn dispatch_all(&self, requests: &[QueryRequest]) -> Vec<Result<String>> {
        let limit = self.config.batch.max_concurrent_documents.max(1);
        stream::iter(requests)
            .map(|request| self.dispatch(request))
            .buffered(limit)
            .collect()
            .await
    }

    fn claim_or_join(&self, key: &CacheKey) -> SlotClaim {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(rx) = inflight.get(key) {
            SlotClaim::Joined(rx.clone())
        } else {
            let (tx, rx) = watch::channel(None);
            inflight.insert(key.clone(), rx);
            SlotClaim::Claimed(tx)
        }
    }

    fn remove_slot(&self, key: &CacheKey) {
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }

    async fn resolve_claimed(
        &self,
        key: &CacheKey,
        text: &str,
        mode: QueryMode,
        max_wait: Duration,
        tx: watch::Sender<Option<SlotResult>>,
    ) -> Result<String> {
        let guard = SlotGuard {
            dispatcher: self,
            key: key.clone(),
        };

        // A racing claimer may have cached the value between our cache
        // check and the claim; re-check before paying for a provider call.
        if let Some(value) = self.cache.get(key)? {
            drop(guard);
            let _ = tx.send(Some(Ok(value.clone())));
            return Ok(value);
        }

        match self.execute(text, max_wait).await {
            Ok(value) => {
                // Persist before retiring the slot so a caller arriving
                // after removal always sees the cache.
                if let Err(error) = self.cache.put(key, &value) {
                    warn!(%key, error = %error, "failed to persist cached response");
                }
                drop(guard);
                let _ = tx.send(Some(Ok(value.clone())));
                info!(%key, %mode, "query resolved");
                Ok(value)
            }
            Err(error) => {
                // Failures are never cached; a later call for the same
                // key issues a fresh provider call.
                drop(guard);
                let shared = Arc::new(error);
                let _ = tx.send(Some(Err(Arc::clone(&shared))));
                info!(%key, %mode, kind = shared.kind(), "query failed");
                Err(RelayError::Shared(shared))
            }
        }
    }

    async fn execute(&self, text: &str, max_wait: Duration) -> Result<String> {
        let provider = Arc::clone(&self.provider);
        let retry = self.config.retry.clone();
        let params = self.params.clone();
        let prompt = text.to_string();

        run_with_timeout(max_wait, |token| async move {
            let deadline = Instant::now() + max_wait;
            call_with_retry(&retry, deadline, &token, || {
                provider.invoke_text(&prompt, &params, &token)
            })
            .await
        })
        .await
    }

    /// Wait for another caller's in-flight result. An abandoning waiter
    /// (its own deadline firing) does not cancel the shared call.
    async fn await_slot(&self, mut rx: SlotReceiver, max_wait: Duration) -> Result<String> {
        let wait = tokio::time::timeout(max_wait, async {
            loop {
                let current = rx.borrow().clone();
                if let Some(result) = current {
                    return result;
                }
                if rx.changed().await.is_err() {
                    // The claimer was dropped without publishing; transient
                    // so a later call retries the provider.
                    return Err(Arc::new(RelayError::Transient(
                        "in-flight call abandoned".into(),
                    )));
                }
            }
        })
        .await;

        match wait {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(shared)) => Err(RelayError::Shared(shared)),
            Err(_) => Err(RelayError::Timeout {
                waited: max_wait,
                last_error: None,
            }),
        }
    }
}
