//! Shared types for generative backends

use serde::{Deserialize, Serialize};

/// Text returned by a backend plus token accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Snapshot of which backend is configured, for status output
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    pub kind: String,
    pub host: String,
    pub model: String,
    pub healthy: bool,
}
