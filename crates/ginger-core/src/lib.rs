//! Ginger Core Library
//!
//! Shared functionality for the Ginger family assistant:
//! - Insight pipeline turning calendar, ledger and knowledge into recommendations
//! - Context assembler attributing calendar events to family members
//! - Knowledge index with pluggable embedding providers
//! - Interaction ledger and goals on an encrypted SQLite store
//! - Pluggable generative backends (Ollama, Anthropic, mock)
//! - Prompt library for customizable model prompts
//! - Family trip planning against flight providers and the calendar

pub mod ai;
pub mod calendar;
pub mod cancel;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod insights;
pub mod knowledge;
pub mod ledger;
pub mod models;
pub mod prompts;
pub mod travel;

/// Test utilities including mock model server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AnthropicBackend, BackendInfo, Completion, GenerativeBackend, GenerativeClient, MockBackend,
    OllamaBackend,
};
pub use calendar::{CalendarProvider, JsonFileCalendar, StaticCalendar};
pub use cancel::{CancellationToken, RequestOptions};
pub use config::{BackendKind, EmbeddingKind, FamilyConfig, FamilyMember, GingerConfig};
pub use context::{AssembledContext, ContextAssembler, Intent, RawInputs};
pub use db::Database;
pub use error::{Error, ErrorKind, GenerationFailure, Result};
pub use insights::{
    Insight, InsightEngine, InsightRequest, PipelineStage, SectionKind, Sections, TokenUsage,
};
pub use knowledge::{
    create_provider, DocumentSource, EmbeddingProvider, HashedEmbedder, KnowledgeDocument,
    KnowledgeIndex, OllamaEmbedder,
};
pub use ledger::{AnalyticsSummary, InteractionLedger, LedgerStore};
pub use models::{CalendarEvent, Goal, GoalStatus, InteractionRecord, NewGoal, NewInteraction};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use travel::{
    Destination, Flight, FlightProvider, FlightSearch, Party, StaticFlights, TravelPlanner,
    TripDates, TripOption,
};
