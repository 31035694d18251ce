//! Ollama backend implementation
//!
//! HTTP client for Ollama's `/api/generate`. Token counts come from
//! `prompt_eval_count` and `eval_count`, which Ollama omits when a prompt is
//! served from its cache (reported as zero here).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::Completion;
use super::{status_error, transport_error, GenerativeBackend};

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a backend whose requests give up after `timeout`
    pub fn with_timeout(base_url: &str, model: &str, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[async_trait]
impl GenerativeBackend for OllamaBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: max_tokens,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("malformed Ollama response: {}", e))
        })?;

        let completion = Completion {
            text: ollama_response.response,
            prompt_tokens: ollama_response.prompt_eval_count.unwrap_or(0),
            completion_tokens: ollama_response.eval_count.unwrap_or(0),
        };
        debug!(
            model = %self.model,
            prompt_tokens = completion.prompt_tokens,
            completion_tokens = completion.completion_tokens,
            "Ollama completion"
        );

        Ok(completion)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailureMode, MockOllamaServer};

    fn backend_at(url: &str) -> OllamaBackend {
        OllamaBackend::with_timeout(url, "llama3.2", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_complete_reports_tokens() {
        let server = MockOllamaServer::start().await;
        server.set_completion("1. Improvements\n- Put phones away at dinner");

        let backend = backend_at(&server.url());
        let completion = backend.complete("hello", 100).await.unwrap();

        assert!(completion.text.contains("Put phones away"));
        assert_eq!(completion.prompt_tokens, 42);
        assert!(completion.completion_tokens > 0);
        assert_eq!(server.last_prompt().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_rejected_prompt() {
        let server = MockOllamaServer::start().await;
        server.set_failure(FailureMode::Rejected);

        let backend = backend_at(&server.url());
        let err = backend.complete("too long", 100).await.unwrap_err();
        assert!(matches!(err, Error::BackendRejected(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockOllamaServer::start().await;
        server.set_failure(FailureMode::ServerError);

        let backend = backend_at(&server.url());
        let err = backend.complete("hello", 100).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockOllamaServer::start().await;
        server.set_failure(FailureMode::Malformed);

        let backend = backend_at(&server.url());
        let err = backend.complete("hello", 100).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let backend = backend_at("http://127.0.0.1:1");
        let err = backend.complete("hello", 100).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(!backend.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockOllamaServer::start().await;
        let backend = backend_at(&server.url());
        assert!(backend.health_check().await);
    }
}
