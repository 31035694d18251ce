//! Insight Engine - family recommendations from calendar, ledger and knowledge
//!
//! The engine turns a high-level [`Intent`] into a structured [`Insight`]:
//!
//! - **Analyze calendar** - events attributed to family members, optionally with recommendations
//! - **Generate insights** - recommendations for caller-supplied context
//! - **Plan activities** - activity recommendations for members on the calendar
//! - **Communication advice** - recommendations for a described situation
//! - **Track progress** - interaction analytics and active goals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ginger_core::insights::{InsightEngine, InsightRequest};
//!
//! let engine = InsightEngine::new(config, calendar, index, ledger, client)?;
//! let insight = engine
//!     .generate_insights(InsightRequest::new("Rainy weekend").with_domains(["activities"]))
//!     .await?;
//! ```

pub mod engine;
pub mod parsing;
pub mod types;

pub use crate::context::Intent;
pub use engine::{InsightEngine, ACTIVITY_DOMAINS, COMMUNICATION_DOMAINS};
pub use parsing::SectionParser;
pub use types::{
    Insight, InsightRequest, PipelineStage, SectionKind, Sections, TokenUsage,
};
