//! Anthropic Messages API backend
//!
//! Sends the whole prompt as one user message to `/v1/messages` and joins the
//! text blocks of the reply. Usage is reported as `input_tokens` and
//! `output_tokens`.
//!
//! # Configuration
//!
//! ```toml
//! [backend]
//! kind = "anthropic"
//! host = "https://api.anthropic.com"
//! model = "claude-3-sonnet-20240229"
//! api_key_env = "ANTHROPIC_API_KEY"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::Completion;
use super::{status_error, transport_error, GenerativeBackend};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Content block in a response; only text blocks carry generated text
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Anthropic Messages API backend
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let base_url = if base_url.trim().is_empty() {
            ANTHROPIC_API_URL
        } else {
            base_url
        };
        let model = if model.trim().is_empty() {
            ANTHROPIC_DEFAULT_MODEL
        } else {
            model
        };
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl GenerativeBackend for AnthropicBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::BackendUnavailable("no Anthropic API key configured".into()))?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, max_tokens, "Sending Anthropic messages request");

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("malformed Anthropic response: {}", e))
        })?;

        let (prompt_tokens, completion_tokens) = messages_response
            .usage
            .as_ref()
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        Ok(Completion {
            text: messages_response.text(),
            prompt_tokens,
            completion_tokens,
        })
    }

    async fn health_check(&self) -> bool {
        self.api_key.is_some()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
