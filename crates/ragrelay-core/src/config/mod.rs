//! Configuration management
//!
//! A `RelayConfig` is constructed once at startup (YAML file with
//! environment-variable fallbacks) and passed by reference into the
//! dispatcher and retry controller. There is no process-global mutable
//! configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    /// Provider endpoint and credentials
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retry/backoff policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// User-visible deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Batch/document-folder processing limits
    #[serde(default)]
    pub batch: BatchConfig,

    /// Path of the on-disk response cache (defaults to the cache dir)
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

/// Which provider variant to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBinding {
    /// Azure OpenAI deployments (api-key header, api-version query)
    Azure,
    /// OpenAI-compatible services (vLLM, OpenAI; bearer auth)
    OpenAi,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider variant, chosen once at startup
    #[serde(default = "default_binding")]
    pub binding: ProviderBinding,

    /// Base URL of the provider
    pub endpoint: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API version string (required by the Azure binding)
    #[serde(default)]
    pub api_version: Option<String>,

    /// Deployment or model identifier for text generation
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Deployment or model identifier for embeddings
    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,

    /// Embedding dimensionality
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            binding: std::env::var("RAGRELAY_BINDING")
                .ok()
                .and_then(|s| match s.as_str() {
                    "azure" => Some(ProviderBinding::Azure),
                    "openai" => Some(ProviderBinding::OpenAi),
                    _ => None,
                })
                .unwrap_or_else(default_binding),
            endpoint: std::env::var("RAGRELAY_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_key: std::env::var("RAGRELAY_API_KEY").ok(),
            api_version: std::env::var("RAGRELAY_API_VERSION").ok(),
            deployment: std::env::var("RAGRELAY_DEPLOYMENT").unwrap_or_else(|_| default_deployment()),
            embedding_deployment: std::env::var("RAGRELAY_EMBEDDING_DEPLOYMENT")
                .unwrap_or_else(|_| default_embedding_deployment()),
            embedding_dimensions: std::env::var("RAGRELAY_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_embedding_dimensions),
        }
    }
}

fn default_binding() -> ProviderBinding {
    ProviderBinding::OpenAi
}

fn default_deployment() -> String {
    "gpt-4.1".to_string()
}

fn default_embedding_deployment() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_dimensions() -> usize {
    3072
}

/// Retry/backoff policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// First backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Total attempts (initial call + retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Budget for a single attempt in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Backoff delay before retrying after the given zero-based attempt.
    ///
    /// Doubles per attempt starting from the base delay, capped at the
    /// configured maximum.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

/// User-visible deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Deadline applied when a request does not carry one, in seconds
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Upper bound for caller-supplied deadlines, in seconds
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }

    /// Resolve a caller-supplied deadline against the configured bounds.
    pub fn clamp(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(wait) => wait.min(self.max_timeout()),
            None => self.default_timeout(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_timeout_secs() -> u64 {
    300
}

/// Batch/document-folder processing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum concurrently dispatched documents in a batch
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,

    /// Texts per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: default_max_concurrent_documents(),
            embedding_batch_size: default_embedding_batch_size(),
        }
    }
}

fn default_max_concurrent_documents() -> usize {
    2
}

fn default_embedding_batch_size() -> usize {
    32
}

impl RelayConfig {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: RelayConfig = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(RelayConfig::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Get the default on-disk cache path
    pub fn default_cache_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("responses.sqlite")
    }
}
