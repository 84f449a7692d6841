//! Provider call interface
//!
//! The core depends only on the [`Provider`] capability, never on a
//! specific backend's identity. Concrete variants are chosen once at
//! startup from explicit configuration.

mod azure;
mod openai;

pub use azure::AzureOpenAiProvider;
pub use openai::OpenAiCompatProvider;

use crate::config::{ProviderBinding, ProviderConfig};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sampling parameters forwarded with every text-generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 4000,
            top_p: 1.0,
        }
    }
}

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Opaque asynchronous call surface of a hosted LLM/embedding service.
///
/// Every call receives a cancellation token tied to the timeout
/// supervisor's deadline; implementations must abort the underlying
/// network request when it fires, not merely ignore it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a text completion for a prompt
    async fn invoke_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Generate embeddings for a batch of texts
    async fn embed(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>>;

    /// Deployment or model identifier used for text generation
    fn deployment(&self) -> &str;

    /// Deployment or model identifier used for embeddings
    fn embedding_deployment(&self) -> &str;

    /// Embedding dimensionality
    fn embedding_dimensions(&self) -> usize;
}

/// Build the provider variant named by the configuration.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.binding {
        ProviderBinding::Azure => Ok(Arc::new(AzureOpenAiProvider::new(config.clone())?)),
        ProviderBinding::OpenAi => Ok(Arc::new(OpenAiCompatProvider::new(config.clone())?)),
    }
}

/// Map transport-level failures into the retry taxonomy.
pub(crate) fn classify_transport(error: &reqwest::Error) -> RelayError {
    if error.is_decode() {
        RelayError::Provider(format!("invalid response body: {error}"))
    } else if error.is_builder() {
        RelayError::Permanent(format!("malformed request: {error}"))
    } else {
        // Connection failures, timeouts, and interrupted transfers
        RelayError::Transient(error.to_string())
    }
}

/// Map an HTTP error status into the retry taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: String) -> RelayError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        RelayError::RateLimited(if body.is_empty() {
            "HTTP 429".to_string()
        } else {
            body
        })
    } else if status.is_server_error() {
        RelayError::Transient(format!("HTTP {status}: {body}"))
    } else {
        RelayError::Permanent(format!("HTTP {status}: {body}"))
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    // No client-level timeout: per-attempt budgets belong to the retry
    // controller and the outer deadline to the supervisor.
    reqwest::Client::builder()
        .build()
        .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))
}
