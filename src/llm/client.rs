use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationRequest, TextBackend};
use crate::error::{BackendError, BackendErrorKind};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// API root, without the `/v1/messages` suffix
    pub base_url: String,
    /// Model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,
}

impl AnthropicConfig {
    /// Create config from environment variables
    ///
    /// `ANTHROPIC_BASE_URL` and `ANTHROPIC_MODEL` are optional.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;
        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            base_url,
            model,
        })
    }

    /// Create with custom settings
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl TextBackend for AnthropicClient {
    /// Send a message to Claude and get the text of the reply
    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError> {
        let body = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            system: Some(request.system),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user,
            }],
        };

        debug!(
            "POST {} (model {}, max_tokens {})",
            self.config.messages_url(),
            body.model,
            body.max_tokens
        );

        let response = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::new(
                BackendErrorKind::from_status(status.as_u16()),
                format!("Anthropic API error: {} - {}", status, text),
            ));
        }

        let response: AnthropicResponse = response.json().await.map_err(|e| {
            BackendError::new(
                BackendErrorKind::InvalidResponse,
                format!("Failed to parse Anthropic API response: {}", e),
            )
        })?;

        extract_text(&response)
    }
}

fn classify_transport_error(err: reqwest::Error) -> BackendError {
    let kind = if err.is_timeout() {
        BackendErrorKind::Timeout
    } else {
        BackendErrorKind::Transport
    };
    BackendError::new(
        kind,
        format!("Failed to send request to Anthropic API: {}", err),
    )
}

/// Concatenate the text blocks of a reply
fn extract_text(response: &AnthropicResponse) -> Result<String, BackendError> {
    let text: String = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(BackendError::new(
            BackendErrorKind::InvalidResponse,
            "No text content in response",
        ));
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
