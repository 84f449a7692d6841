//! Response cache stores
//!
//! The cache is a plain key-value contract: completed responses keyed by
//! fingerprint. Entries are immutable after insertion; a changed input is
//! expected to produce a new key, so no in-place update exists. Eviction
//! and retention are collaborator concerns, not handled here.

mod sqlite;

pub use sqlite::SqliteCache;

use crate::error::Result;
use crate::fingerprint::CacheKey;
use std::collections::HashMap;
use std::sync::RwLock;

/// Key-value persistence for completed responses
pub trait CacheStore: Send + Sync {
    /// Get a cached response, if present.
    fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Store a response. Idempotent: a repeated put with the same key and
    /// equal value is a no-op. A put with the same key and a *different*
    /// value is a fingerprint policy violation; it is logged as an anomaly
    /// and the stored entry is left untouched.
    fn put(&self, key: &CacheKey, value: &str) -> Result<()>;
}

/// In-memory store for tests and short-lived runs
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };
        Ok(entries.get(key.as_str()).cloned())
    }

    fn put(&self, key: &CacheKey, value: &str) -> Result<()> {
        if let Ok(mut entries) = self.entries.write() {
            match entries.get(key.as_str()) {
                Some(existing) if existing != value => {
                    tracing::warn!(
                        target: "ragrelay::cache",
                        key = %key,
                        "cache anomaly: same key observed with a different value; keeping the stored entry"
                    );
                }
                Some(_) => {}
                None => {
                    entries.insert(key.as_str().to_string(), value.to_string());
                }
            }
        }
        Ok(())
    }
}
