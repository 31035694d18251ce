//! Generative backend abstraction
//!
//! A stateless adapter to a text-generation model: a prompt goes in, text and
//! token counts come out.
//!
//! # Architecture
//!
//! - `GenerativeBackend` trait: the interface every backend implements
//! - `GenerativeClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `AnthropicBackend`, `MockBackend`
//!
//! # Failure classification
//!
//! Every backend reports failures as one of two kinds so callers can tell them
//! apart in logs:
//! - `BackendRejected`: the request itself was refused (HTTP 400, 413, 422),
//!   e.g. prompt too long or a policy violation. Retrying the same prompt won't help.
//! - `BackendUnavailable`: everything else (connection errors, timeouts, auth,
//!   rate limits, 5xx, unparseable bodies).

mod anthropic;
mod mock;
mod ollama;
pub mod types;

pub use anthropic::{AnthropicBackend, ANTHROPIC_API_URL, ANTHROPIC_DEFAULT_MODEL};
pub use mock::{MockBackend, DEFAULT_MOCK_COMPLETION};
pub use ollama::OllamaBackend;
pub use types::*;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{BackendConfig, BackendKind};
use crate::error::{Error, Result};

/// Trait defining the interface for all generative backends
///
/// Backends hold no per-request state, so one instance serves concurrent requests.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate a completion for `prompt`, producing at most `max_tokens` tokens
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name being used
    fn model(&self) -> &str;

    /// Get the host URL
    fn host(&self) -> &str;
}

/// Concrete generative client wrapping a backend
///
/// Provides Clone + compile-time dispatch; `Arc<dyn GenerativeBackend>` works
/// too, but the engine only ever needs one of these three.
#[derive(Clone)]
pub enum GenerativeClient {
    /// Ollama backend (`/api/generate`)
    Ollama(OllamaBackend),
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl GenerativeClient {
    /// Build the backend named by config
    pub fn from_config(config: &BackendConfig) -> Self {
        match config.kind {
            BackendKind::Ollama => GenerativeClient::Ollama(OllamaBackend::with_timeout(
                &config.host,
                &config.model,
                config.timeout,
            )),
            BackendKind::Anthropic => {
                let api_key = std::env::var(&config.api_key_env).ok();
                if api_key.is_none() {
                    tracing::warn!(
                        env = %config.api_key_env,
                        "Anthropic API key not set, generation will fail"
                    );
                }
                GenerativeClient::Anthropic(AnthropicBackend::new(
                    &config.host,
                    &config.model,
                    api_key,
                    config.timeout,
                ))
            }
            BackendKind::Mock => GenerativeClient::Mock(MockBackend::new()),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            GenerativeClient::Ollama(_) => BackendKind::Ollama,
            GenerativeClient::Anthropic(_) => BackendKind::Anthropic,
            GenerativeClient::Mock(_) => BackendKind::Mock,
        }
    }

    /// Backend identity plus a live health check
    pub async fn info(&self) -> BackendInfo {
        BackendInfo {
            kind: self.kind().as_str().to_string(),
            host: self.host().to_string(),
            model: self.model().to_string(),
            healthy: self.health_check().await,
        }
    }
}

// Implement GenerativeBackend for GenerativeClient by delegating to the inner backend
#[async_trait]
impl GenerativeBackend for GenerativeClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        match self {
            GenerativeClient::Ollama(b) => b.complete(prompt, max_tokens).await,
            GenerativeClient::Anthropic(b) => b.complete(prompt, max_tokens).await,
            GenerativeClient::Mock(b) => b.complete(prompt, max_tokens).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            GenerativeClient::Ollama(b) => b.health_check().await,
            GenerativeClient::Anthropic(b) => b.health_check().await,
            GenerativeClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            GenerativeClient::Ollama(b) => b.model(),
            GenerativeClient::Anthropic(b) => b.model(),
            GenerativeClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            GenerativeClient::Ollama(b) => b.host(),
            GenerativeClient::Anthropic(b) => b.host(),
            GenerativeClient::Mock(b) => b.host(),
        }
    }
}

/// Classify a non-success HTTP status
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let body = body.trim();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        // Error bodies can be whole HTML pages
        let snippet: String = body.chars().take(300).collect();
        format!("{}: {}", status, snippet)
    };

    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => Error::BackendRejected(detail),
        _ => Error::BackendUnavailable(detail),
    }
}

/// Classify a transport-level failure
pub(crate) fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::BackendUnavailable(format!("request timed out: {}", e))
    } else {
        Error::BackendUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GingerConfig;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "prompt is too long"),
            Error::BackendRejected(_)
        ));
        assert!(matches!(
            status_error(StatusCode::PAYLOAD_TOO_LARGE, ""),
            Error::BackendRejected(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, ""),
            Error::BackendRejected(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            Error::BackendUnavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            Error::BackendUnavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            Error::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_status_error_truncates_body() {
        let body = "x".repeat(1000);
        let err = status_error(StatusCode::BAD_GATEWAY, &body);
        assert!(err.to_string().len() < 400);
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = GingerConfig::embedded().unwrap();
        let client = GenerativeClient::from_config(&config.backend);
        assert_eq!(client.kind(), BackendKind::Ollama);
        assert_eq!(client.model(), "llama3.2");

        config.backend.kind = BackendKind::Mock;
        let client = GenerativeClient::from_config(&config.backend);
        assert_eq!(client.kind(), BackendKind::Mock);
    }

    #[tokio::test]
    async fn test_mock_client_info() {
        let info = GenerativeClient::Mock(MockBackend::new()).info().await;
        assert_eq!(info.kind, "mock");
        assert!(info.healthy);
    }
}
