//! Error types for ragrelay

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error type alias for convenience
pub type Error = RelayError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const TIMEOUT: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for ragrelay
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider rate limited: {0}")]
    RateLimited(String),

    #[error("Provider unreachable: {0}")]
    Transient(String),

    #[error("Provider rejected the request: {0}")]
    Permanent(String),

    #[error("Deadline exceeded after {}ms{}", waited.as_millis(), last_error.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default())]
    Timeout {
        waited: Duration,
        last_error: Option<Box<RelayError>>,
    },

    #[error("Call cancelled by supervisor")]
    Cancelled,

    #[error("Provider response error: {0}")]
    Provider(String),

    #[error("Cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Shared(Arc<RelayError>),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Whether the retry controller may attempt this call again.
    ///
    /// Only explicit throttling and transient network failures qualify;
    /// authentication, malformed requests, and input errors never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Transient(_) => true,
            Self::Shared(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Stable label distinguishing failure causes for operators.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid-input",
            Self::RateLimited(_) => "rate-limited",
            Self::Transient(_) => "provider-unreachable",
            Self::Permanent(_) => "provider-rejected",
            Self::Timeout { .. } => "deadline-exceeded",
            Self::Cancelled => "cancelled",
            Self::Provider(_) => "provider-response",
            Self::Cache(_) => "cache",
            Self::Serialization(_) => "serialization",
            Self::Yaml(_) | Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Shared(inner) => inner.kind(),
            Self::Other(_) => "other",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Timeout { .. } => exit_codes::TIMEOUT,
            Self::Shared(inner) => inner.exit_code(),
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
