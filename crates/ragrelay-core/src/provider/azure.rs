//! Azure OpenAI provider variant
//!
//! Deployment-scoped URLs with an `api-version` query parameter and an
//! `api-key` header.

use super::{
    build_http_client, classify_status, classify_transport, ChatMessage, GenerationParams,
    Provider,
};
use crate::config::ProviderConfig;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub struct AzureOpenAiProvider {
    http_client: reqwest::Client,
    config: ProviderConfig,
    api_version: String,
}

impl AzureOpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_version = config
            .api_version
            .clone()
            .ok_or_else(|| RelayError::Config("azure binding requires api_version".into()))?;
        let http_client = build_http_client()?;
        Ok(Self {
            http_client,
            config,
            api_version,
        })
    }

    fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.api_version
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(api_key) => request.header("api-key", api_key),
            None => request,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Provider for AzureOpenAiProvider {
    async fn invoke_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
        };
        let url = self.deployment_url(&self.config.deployment, "chat/completions");
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let send = async {
            let response = req.send().await.map_err(|e| classify_transport(&e))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status, body));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| RelayError::Provider(format!("invalid chat response: {e}")))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| RelayError::Provider("empty completion".into()))
        };

        tokio::select! {
            biased;
            result = send => result,
            () = cancel.cancelled() => Err(RelayError::Cancelled),
        }
    }

    async fn embed(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest { input: texts };
        let url = self.deployment_url(&self.config.embedding_deployment, "embeddings");
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let send = async {
            let response = req.send().await.map_err(|e| classify_transport(&e))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status, body));
            }

            let parsed: EmbedResponse = response
                .json()
                .await
                .map_err(|e| RelayError::Provider(format!("invalid embedding response: {e}")))?;

            if parsed.data.len() != texts.len() {
                return Err(RelayError::Provider(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                )));
            }

            Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
        };

        tokio::select! {
            biased;
            result = send => result,
            () = cancel.cancelled() => Err(RelayError::Cancelled),
        }
    }

    fn deployment(&self) -> &str {
        &self.config.deployment
    }

    fn embedding_deployment(&self) -> &str {
        &self.config.embedding_deployment
    }

    fn embedding_dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }
}
