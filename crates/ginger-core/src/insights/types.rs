//! Types for the insight pipeline

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{AssembledContext, Intent};
use crate::error::{Error, Result};

/// Pipeline states for one request
///
/// `Assembling → Retrieving → Prompting → Generating → Parsed`, or `Failed`
/// from any of them. No state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Assembling,
    Retrieving,
    Prompting,
    Generating,
    Parsed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assembling => "assembling",
            Self::Retrieving => "retrieving",
            Self::Prompting => "prompting",
            Self::Generating => "generating",
            Self::Parsed => "parsed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed set of recommendation sections
///
/// Declaration order is presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[serde(rename = "improvement_suggestions")]
    Improvements,
    ConversationTopics,
    Activities,
    /// Model text that sat under no recognized header
    General,
    /// Calendar events per member (context-only insights)
    FamilyEvents,
    /// Interaction analytics and goals (context-only insights)
    Progress,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improvements => "improvement_suggestions",
            Self::ConversationTopics => "conversation_topics",
            Self::Activities => "activities",
            Self::General => "general",
            Self::FamilyEvents => "family_events",
            Self::Progress => "progress",
        }
    }

    /// Section a numbered header maps to when its text names none
    pub fn from_position(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Improvements),
            2 => Some(Self::ConversationTopics),
            3 => Some(Self::Activities),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered suggestions per section
pub type Sections = BTreeMap<SectionKind, Vec<String>>;

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Result of one request
///
/// Context-only insights (calendar analysis without recommendations, progress
/// tracking) carry no model text and no token usage.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub intent: Intent,
    pub sections: Sections,
    pub raw_model_text: Option<String>,
    pub token_usage: Option<TokenUsage>,
    pub context: AssembledContext,
    pub generated_at: DateTime<Utc>,
}

impl Insight {
    /// True when the insight came from a model call
    pub fn is_generated(&self) -> bool {
        self.raw_model_text.is_some()
    }

    pub fn section(&self, kind: SectionKind) -> &[String] {
        self.sections.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when at least one section has content
    pub fn has_content(&self) -> bool {
        self.sections.values().any(|items| !items.is_empty())
    }
}

/// A request for generated recommendations
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightRequest {
    pub context: String,
    /// Ordered domain tags used to filter retrieval
    pub knowledge_domains: Vec<String>,
    /// Members to merge ledger analytics for
    pub family_members: Vec<String>,
}

impl InsightRequest {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Default::default()
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.knowledge_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.family_members = members.into_iter().map(Into::into).collect();
        self
    }

    /// Reject requests that could never produce a useful prompt
    pub fn validate(&self) -> Result<()> {
        if self.context.trim().is_empty() {
            return Err(Error::InvalidRequest("context must not be empty".into()));
        }
        if self.knowledge_domains.is_empty() {
            return Err(Error::InvalidRequest(
                "knowledge_domains must not be empty".into(),
            ));
        }
        if self.knowledge_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::InvalidRequest(
                "knowledge domain tags must not be blank".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(InsightRequest::new("weekend plans")
            .with_domains(["activities"])
            .validate()
            .is_ok());

        let err = InsightRequest::new("weekend plans").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let err = InsightRequest::new("   ")
            .with_domains(["activities"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        assert!(InsightRequest::new("x")
            .with_domains(["activities", " "])
            .validate()
            .is_err());
    }

    #[test]
    fn test_section_kind_serializes_as_label() {
        let json = serde_json::to_string(&SectionKind::Improvements).unwrap();
        assert_eq!(json, "\"improvement_suggestions\"");
        let json = serde_json::to_string(&SectionKind::ConversationTopics).unwrap();
        assert_eq!(json, "\"conversation_topics\"");
    }

    #[test]
    fn test_sections_map_keys() {
        let mut sections = Sections::new();
        sections.insert(SectionKind::Activities, vec!["hike".into()]);
        sections.insert(SectionKind::Improvements, vec!["listen".into()]);
        let json = serde_json::to_value(&sections).unwrap();
        assert_eq!(json["activities"][0], "hike");
        assert_eq!(json["improvement_suggestions"][0], "listen");
    }

    #[test]
    fn test_token_total_saturates() {
        let usage = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: 12,
        };
        assert_eq!(usage.total(), u32::MAX);
    }
}
