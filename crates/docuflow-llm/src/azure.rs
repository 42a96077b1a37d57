//! Azure-OpenAI-compatible chat completion client.
//!
//! Talks to `{endpoint}/openai/deployments/{deployment}/chat/completions`
//! with the `api-key` header scheme. The API key is read from the
//! environment variable named in the config; it never appears in config
//! files or logs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docuflow_core::config::LlmConfig;
use docuflow_core::error::{DocuflowError, Result};

use crate::client::{ChatClient, ChatRequest};

/// Chat client for Azure OpenAI deployments.
#[derive(Debug)]
pub struct AzureChatClient {
    http: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
}

impl AzureChatClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(DocuflowError::Config(
                "llm.endpoint is not configured".to_string(),
            ));
        }

        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            DocuflowError::Config(format!(
                "LLM API key not found in environment variable '{}'",
                config.api_key_env
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocuflowError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl ChatClient for AzureChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let wire = WireRequest {
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_response.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        };

        debug!(
            deployment = %self.deployment,
            messages = wire.messages.len(),
            json_response = request.json_response,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| DocuflowError::Llm(format!("Chat completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocuflowError::Llm(format!(
                "Chat completion failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| DocuflowError::Llm(format!("Failed to parse completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DocuflowError::Llm("Completion response contained no choices".to_string()))
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
