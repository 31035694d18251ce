//! Mock backend for testing
//!
//! Returns a scripted completion without a running model. Can be told to fail
//! with a given error kind or to take a while, and remembers the prompts it saw.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, ErrorKind, Result};

use super::types::Completion;
use super::GenerativeBackend;

/// Completion returned when no text has been scripted
pub const DEFAULT_MOCK_COMPLETION: &str = "\
1. Suggestions for improving quality time
- Schedule a weekly screen-free dinner
- Put phones away during bedtime stories

2. Potential conversation topics
- Ask about the best part of their week
- Plan the next family outing together

3. Activity recommendations
- Saturday morning hike
- Cook a new recipe together
";

/// Mock generative backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    text: String,
    failure: Option<ErrorKind>,
    delay: Option<Duration>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, default completion)
    pub fn new() -> Self {
        Self {
            healthy: true,
            text: DEFAULT_MOCK_COMPLETION.to_string(),
            failure: None,
            delay: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Return `text` from every completion
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Fail every completion with `kind`
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn failure_error(kind: ErrorKind) -> Error {
        match kind {
            ErrorKind::BackendRejected => Error::BackendRejected("mock: prompt rejected".into()),
            ErrorKind::Cancelled => Error::Cancelled,
            _ => Error::BackendUnavailable("mock: backend unavailable".into()),
        }
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(kind) = self.failure {
            return Err(Self::failure_error(kind));
        }

        let completion_tokens = (self.text.split_whitespace().count() as u32).min(max_tokens);
        Ok(Completion {
            text: self.text.clone(),
            prompt_tokens: prompt.split_whitespace().count() as u32,
            completion_tokens,
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_prompts() {
        let mock = MockBackend::new().with_text("hello there");
        let clone = mock.clone();

        let completion = clone.complete("one two three", 100).await.unwrap();
        assert_eq!(completion.text, "hello there");
        assert_eq!(completion.prompt_tokens, 3);
        assert_eq!(completion.completion_tokens, 2);
        assert_eq!(mock.prompts(), vec!["one two three"]);
    }

    #[tokio::test]
    async fn test_mock_failure_kinds() {
        let err = MockBackend::new()
            .failing(ErrorKind::BackendRejected)
            .complete("x", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendRejected(_)));

        let err = MockBackend::new()
            .failing(ErrorKind::BackendUnavailable)
            .complete("x", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unhealthy() {
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
