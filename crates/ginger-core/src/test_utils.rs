//! Test utilities for ginger-core
//!
//! This module provides testing infrastructure including a mock model server
//! speaking enough of the Ollama and Anthropic APIs for the HTTP backends and
//! the Ollama embedder to be tested end to end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::ai::DEFAULT_MOCK_COMPLETION;

/// Dimensions of the vectors returned by `/api/embeddings`
pub const MOCK_EMBEDDING_DIMS: usize = 8;

/// Prompt token count reported by every completion endpoint
pub const MOCK_PROMPT_TOKENS: u32 = 42;

/// How the mock server should misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// 400 with an error body (prompt too long)
    Rejected,
    /// 429 rate limited
    RateLimited,
    /// 503 service unavailable
    ServerError,
    /// 200 with a body that is not the expected JSON
    Malformed,
}

#[derive(Debug)]
struct MockState {
    completion: String,
    failure: Option<FailureMode>,
    prompts: Vec<String>,
}

type SharedState = Arc<Mutex<MockState>>;

/// Mock model server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(MockState {
            completion: DEFAULT_MOCK_COMPLETION.to_string(),
            failure: None,
            prompts: Vec::new(),
        }));

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/api/embeddings", post(handle_embeddings))
            .route("/v1/messages", post(handle_messages))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Text returned by the completion endpoints
    pub fn set_completion(&self, text: &str) {
        self.state.lock().unwrap().completion = text.to_string();
    }

    /// Make every model endpoint fail
    pub fn set_failure(&self, mode: FailureMode) {
        self.state.lock().unwrap().failure = Some(mode);
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().failure = None;
    }

    /// Last prompt received by a completion endpoint
    pub fn last_prompt(&self) -> Option<String> {
        self.state.lock().unwrap().prompts.last().cloned()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn failure_response(mode: FailureMode) -> Response {
    match mode {
        FailureMode::Rejected => (
            StatusCode::BAD_REQUEST,
            r#"{"error":"prompt is too long"}"#,
        )
            .into_response(),
        FailureMode::RateLimited => {
            (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response()
        }
        FailureMode::ServerError => {
            (StatusCode::SERVICE_UNAVAILABLE, "model is loading").into_response()
        }
        FailureMode::Malformed => (StatusCode::OK, "this is not json").into_response(),
    }
}

/// Record the prompt, returning the scripted completion or the failure to send
fn take_turn(state: &SharedState, prompt: &str) -> Result<String, Response> {
    let mut state = state.lock().unwrap();
    state.prompts.push(prompt.to_string());
    match state.failure {
        Some(mode) => Err(failure_response(mode)),
        None => Ok(state.completion.clone()),
    }
}

fn completion_tokens(text: &str) -> u32 {
    text.split_whitespace().count().max(1) as u32
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2024-01-01T00:00:00Z".to_string(),
            size: 4_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(
    State(state): State<SharedState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let text = match take_turn(&state, &request.prompt) {
        Ok(text) => text,
        Err(response) => return response,
    };

    Json(GenerateResponse {
        model: request.model,
        eval_count: completion_tokens(&text),
        response: text,
        done: true,
        prompt_eval_count: MOCK_PROMPT_TOKENS,
    })
    .into_response()
}

/// Anthropic messages endpoint
async fn handle_messages(
    State(state): State<SharedState>,
    Json(request): Json<MessagesRequest>,
) -> Response {
    let prompt = request
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = match take_turn(&state, &prompt) {
        Ok(text) => text,
        Err(response) => return response,
    };

    Json(MessagesResponse {
        id: "msg_mock".to_string(),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        model: request.model,
        stop_reason: "end_turn".to_string(),
        usage: Usage {
            input_tokens: MOCK_PROMPT_TOKENS,
            output_tokens: completion_tokens(&text),
        },
        content: vec![TextBlock {
            block_type: "text".to_string(),
            text,
        }],
    })
    .into_response()
}

/// Ollama embeddings endpoint
///
/// Vectors depend only on the prompt bytes, so equal text embeds equally.
async fn handle_embeddings(
    State(state): State<SharedState>,
    Json(request): Json<EmbeddingsRequest>,
) -> Response {
    if let Some(mode) = state.lock().unwrap().failure {
        return failure_response(mode);
    }

    let mut embedding = vec![0.0f32; MOCK_EMBEDDING_DIMS];
    for (i, b) in request.prompt.bytes().enumerate() {
        embedding[i % MOCK_EMBEDDING_DIMS] += f32::from(b) / 255.0;
    }
    // Never return a zero vector
    embedding[0] += 1.0;

    Json(EmbeddingsResponse { embedding }).into_response()
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
    prompt_eval_count: u32,
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<MessageIn>,
}

#[derive(Debug, Deserialize)]
struct MessageIn {
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    id: String,
    #[serde(rename = "type")]
    response_type: String,
    role: String,
    model: String,
    stop_reason: String,
    usage: Usage,
    content: Vec<TextBlock>,
}

#[derive(Debug, Serialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct TextBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockOllamaServer::start().await;
        let url = server.url();
        assert!(url.starts_with("http://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_mock_server_tags() {
        let server = MockOllamaServer::start().await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/api/tags", server.url()))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_failure_mode_can_be_cleared() {
        let server = MockOllamaServer::start().await;
        let client = reqwest::Client::new();
        let body = serde_json::json!({"model": "m", "prompt": "p"});

        server.set_failure(FailureMode::RateLimited);
        let resp = client
            .post(format!("{}/api/generate", server.url()))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);

        server.clear_failure();
        let resp = client
            .post(format!("{}/api/generate", server.url()))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(server.last_prompt().as_deref(), Some("p"));
    }
}
