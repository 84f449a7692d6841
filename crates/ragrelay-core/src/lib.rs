//! RagRelay Core Library
//!
//! Resilient request mediation between a document-question-answering
//! application and hosted LLM / embedding providers.
//!
//! # Features
//! - Deterministic query-mode selection (bypass/local/global/hybrid/naive)
//! - Fingerprint-keyed response cache (SQLite or in-memory) with
//!   single-flight de-duplication of concurrent identical queries
//! - Outer timeout supervision with cooperative cancellation of the
//!   in-flight provider call
//! - Rate-limit-aware retries with exponential backoff

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod mode;
pub mod provider;
pub mod retry;
pub mod supervisor;

pub use cache::{CacheStore, MemoryCache, SqliteCache};
pub use config::{
    BatchConfig, ProviderBinding, ProviderConfig, RelayConfig, RetryConfig, TimeoutConfig,
};
pub use dispatch::{Dispatcher, QueryRequest};
pub use embedding::EmbeddingService;
pub use error::{Error, RelayError, Result};
pub use fingerprint::{embedding_fingerprint, fingerprint, CacheKey};
pub use mode::{select_mode, QueryMode};
pub use provider::{
    build_provider, AzureOpenAiProvider, ChatMessage, GenerationParams, OpenAiCompatProvider,
    Provider,
};
pub use retry::call_with_retry;
pub use supervisor::run_with_timeout;

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "ragrelay";

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "ragrelay";
