//! Error types for Ginger

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::context::AssembledContext;
use crate::insights::PipelineStage;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Calendar unavailable: {0}")]
    CalendarUnavailable(String),

    #[error("Knowledge index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Generative backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Generative backend rejected the request: {0}")]
    BackendRejected(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    GenerationFailed(Box<GenerationFailure>),

    #[error("Travel planning error: {0}")]
    Travel(String),
}

impl Error {
    /// Classify this error into the closed set of kinds callers match on
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CalendarUnavailable(_) => ErrorKind::CalendarUnavailable,
            Error::IndexUnavailable(_) => ErrorKind::IndexUnavailable,
            Error::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Error::BackendRejected(_) => ErrorKind::BackendRejected,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::GenerationFailed(failure) => failure.kind,
            Error::Config(_) | Error::Toml(_) | Error::Regex(_) => ErrorKind::Config,
            Error::Database(_) | Error::Pool(_) | Error::Encryption(_) | Error::NotFound(_) => {
                ErrorKind::Storage
            }
            Error::Travel(_) => ErrorKind::Travel,
            Error::Io(_) | Error::Http(_) | Error::Json(_) | Error::InvalidData(_) => {
                ErrorKind::InvalidData
            }
        }
    }

    /// Partial pipeline state attached to a generation failure, if any
    pub fn generation_failure(&self) -> Option<&GenerationFailure> {
        match self {
            Error::GenerationFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Closed classification of every error the crate can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CalendarUnavailable,
    IndexUnavailable,
    BackendUnavailable,
    BackendRejected,
    Cancelled,
    InvalidRequest,
    Storage,
    Config,
    Travel,
    InvalidData,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CalendarUnavailable => "calendar_unavailable",
            ErrorKind::IndexUnavailable => "index_unavailable",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::BackendRejected => "backend_rejected",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
            ErrorKind::Travel => "travel",
            ErrorKind::InvalidData => "invalid_data",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request that reached the GENERATING stage and failed there
///
/// Keeps everything the pipeline derived so far, so a caller can retry the
/// generation without re-assembling context or re-running retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    /// One of `BackendUnavailable`, `BackendRejected` or `Cancelled`
    pub kind: ErrorKind,
    /// Message from the underlying backend error
    pub message: String,
    /// Stage the pipeline was in when it failed
    pub stage: PipelineStage,
    /// Context assembled before the failure, with any retrieved knowledge
    pub context: AssembledContext,
    /// Prompt that was sent to the backend
    pub prompt: Option<String>,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generation failed during {} ({}): {}",
            self.stage, self.kind, self.message
        )
    }
}
