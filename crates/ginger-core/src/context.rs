//! Context Assembler
//!
//! Merges calendar events, ledger analytics and goals into a single normalized
//! context for one request. Retrieved knowledge is attached later by the
//! insight engine. The only call made from here is to the interaction ledger,
//! and only when the request names family members.
//!
//! Output is deterministic: events sorted by start ascending, members in the
//! order the caller supplied them (duplicates dropped).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::FamilyConfig;
use crate::ledger::{AnalyticsSummary, InteractionLedger};
use crate::models::{CalendarEvent, Goal};

/// Shown instead of an event list when the calendar has nothing coming up
pub const NO_EVENTS_SUMMARY: &str = "No upcoming calendar events.";

/// High-level request type driving which pipeline path executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    AnalyzeCalendar,
    GenerateInsights,
    PlanActivities,
    CommunicationAdvice,
    TrackProgress,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeCalendar => "analyze_calendar",
            Self::GenerateInsights => "generate_insights",
            Self::PlanActivities => "plan_activities",
            Self::CommunicationAdvice => "communication_advice",
            Self::TrackProgress => "track_progress",
        }
    }

    /// Calendar-based intents build their summary from events; the others pass
    /// the caller's text through unchanged
    pub fn is_calendar_based(&self) -> bool {
        matches!(
            self,
            Self::AnalyzeCalendar | Self::PlanActivities | Self::TrackProgress
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event and the members it was attributed to (config order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttribution {
    pub event: CalendarEvent,
    pub members: Vec<String>,
}

/// Events attributed to one member, by summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberEvents {
    pub member: String,
    pub events: Vec<String>,
}

/// A knowledge snippet retrieved for this request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeSnippet {
    pub id: String,
    pub domain: String,
    pub text: String,
}

/// Per-request context value
///
/// Owned by the request that built it. Attached to `GenerationFailed` so a
/// caller can retry without re-deriving anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssembledContext {
    pub intent: Intent,
    /// Free-text summary (passed through for situation intents)
    pub summary: String,
    /// Events sorted by start ascending
    pub events: Vec<CalendarEvent>,
    /// Per-member attributions, members in config order
    pub member_events: Vec<MemberEvents>,
    /// Events that matched no member
    pub unattributed: Vec<String>,
    /// Members analytics was requested for (deduped, caller order)
    pub members: Vec<String>,
    pub analytics: Vec<AnalyticsSummary>,
    pub goals: Vec<Goal>,
    pub knowledge: Vec<KnowledgeSnippet>,
}

impl AssembledContext {
    /// Members that at least one event was attributed to, in config order
    pub fn attributed_members(&self) -> Vec<String> {
        self.member_events
            .iter()
            .filter(|m| !m.events.is_empty())
            .map(|m| m.member.clone())
            .collect()
    }

    /// Summary plus one line per analytics summary and goal
    pub fn render(&self) -> String {
        let mut out = self.summary.trim_end().to_string();

        if !self.analytics.is_empty() {
            out.push_str("\n\nRecent interactions:");
            for summary in &self.analytics {
                out.push_str("\n- ");
                out.push_str(&summary.summary_line());
            }
        }

        if !self.goals.is_empty() {
            out.push_str("\n\nGoals:");
            for goal in &self.goals {
                out.push_str("\n- ");
                out.push_str(&goal.summary_line());
            }
        }

        out
    }

    /// Retrieved knowledge, one bullet per snippet
    pub fn render_knowledge(&self) -> String {
        self.knowledge
            .iter()
            .map(|k| format!("- [{}] {}", k.domain, k.text.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Raw inputs gathered for one request
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    /// Caller text (situation or request context)
    pub text: String,
    pub events: Vec<CalendarEvent>,
    /// Members to merge analytics for, in caller order
    pub members: Vec<String>,
    pub goals: Vec<Goal>,
}

/// Attribute each event to every member with a matching trigger keyword
///
/// Case-insensitive substring match; an event can belong to several members.
/// Input order is preserved and the same inputs always give the same output.
pub fn attribute_events(events: &[CalendarEvent], family: &FamilyConfig) -> Vec<EventAttribution> {
    events
        .iter()
        .map(|event| EventAttribution {
            event: event.clone(),
            members: family
                .members
                .iter()
                .filter(|m| m.matches(&event.summary))
                .map(|m| m.id.clone())
                .collect(),
        })
        .collect()
}

/// Group attributions per member, every configured member included
pub fn group_by_member(
    attributions: &[EventAttribution],
    family: &FamilyConfig,
) -> Vec<MemberEvents> {
    family
        .members
        .iter()
        .map(|member| MemberEvents {
            member: member.id.clone(),
            events: attributions
                .iter()
                .filter(|a| a.members.contains(&member.id))
                .map(|a| a.event.summary.clone())
                .collect(),
        })
        .collect()
}

/// Drop duplicate members, keeping first occurrence order
pub fn dedup_members(members: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    members
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty() && seen.insert(m.to_string()))
        .map(String::from)
        .collect()
}

/// Builds an [`AssembledContext`] per request
#[derive(Clone)]
pub struct ContextAssembler {
    family: Arc<FamilyConfig>,
    ledger: Option<InteractionLedger>,
    window_days: u32,
}

impl ContextAssembler {
    pub fn new(family: Arc<FamilyConfig>, window_days: u32) -> Self {
        Self {
            family,
            ledger: None,
            window_days,
        }
    }

    /// Merge ledger analytics for requested members
    pub fn with_ledger(mut self, ledger: InteractionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(&self, intent: Intent, raw: RawInputs) -> AssembledContext {
        let mut events = raw.events;
        events.sort_by(|a, b| a.start.cmp(&b.start));

        let mut context = AssembledContext {
            intent,
            members: dedup_members(&raw.members),
            goals: raw.goals,
            ..Default::default()
        };

        if intent.is_calendar_based() {
            let attributions = attribute_events(&events, &self.family);
            context.member_events = group_by_member(&attributions, &self.family);
            context.unattributed = attributions
                .iter()
                .filter(|a| a.members.is_empty())
                .map(|a| a.event.summary.clone())
                .collect();
            context.summary = calendar_summary(&events, &attributions, &self.family);
            context.events = events;
        } else {
            context.summary = raw.text;
        }

        context.analytics = self.analytics_for(intent, &context.members);
        context
    }

    /// One summary per member, plus an overall summary when tracking progress
    ///
    /// A ledger failure leaves the context without analytics.
    fn analytics_for(&self, intent: Intent, members: &[String]) -> Vec<AnalyticsSummary> {
        let Some(ref ledger) = self.ledger else {
            return Vec::new();
        };
        if members.is_empty() {
            return Vec::new();
        }

        let mut analytics = Vec::with_capacity(members.len() + 1);
        for member in members {
            match ledger.analyze(Some(member), self.window_days) {
                Ok(summary) => analytics.push(summary),
                Err(e) => {
                    warn!(member = %member, error = %e, "Ledger unavailable, omitting analytics");
                    return Vec::new();
                }
            }
        }

        if intent == Intent::TrackProgress {
            match ledger.analyze(None, self.window_days) {
                Ok(summary) => analytics.push(summary),
                Err(e) => warn!(error = %e, "Ledger unavailable, omitting overall analytics"),
            }
        }

        analytics
    }
}

/// Raw event listing followed by one line per attributed event, members in config order
fn calendar_summary(
    events: &[CalendarEvent],
    attributions: &[EventAttribution],
    family: &FamilyConfig,
) -> String {
    if events.is_empty() {
        return NO_EVENTS_SUMMARY.to_string();
    }

    let mut lines = vec!["Upcoming events:".to_string()];
    for event in events {
        lines.push(format!("- {} on {}", event.summary, event.start_label()));
    }

    let attributed: Vec<String> = family
        .members
        .iter()
        .flat_map(|member| {
            attributions
                .iter()
                .filter(move |a| a.members.contains(&member.id))
                .map(move |a| {
                    format!(
                        "Event with {}: {} on {}",
                        member.id,
                        a.event.summary,
                        a.event.start_label()
                    )
                })
        })
        .collect();

    if !attributed.is_empty() {
        lines.push(String::new());
        lines.extend(attributed);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FamilyMember;
    use crate::db::Database;
    use crate::models::{parse_event_time, NewInteraction};

    fn family() -> Arc<FamilyConfig> {
        Arc::new(FamilyConfig {
            members: vec![
                FamilyMember {
                    id: "wife".into(),
                    keywords: vec!["family".into(), "date".into()],
                },
                FamilyMember {
                    id: "son".into(),
                    keywords: vec!["school".into(), "play".into(), "family".into()],
                },
            ],
        })
    }

    fn event(summary: &str, start: &str) -> CalendarEvent {
        CalendarEvent::new(summary, parse_event_time(start).unwrap())
    }

    #[test]
    fn test_attribution_scenario() {
        let family = FamilyConfig {
            members: vec![FamilyMember {
                id: "wife".into(),
                keywords: vec!["family".into(), "date".into()],
            }],
        };
        let events = vec![event("family dinner", "2024-01-10T18:00")];

        let grouped = group_by_member(&attribute_events(&events, &family), &family);
        assert_eq!(
            grouped,
            vec![MemberEvents {
                member: "wife".into(),
                events: vec!["family dinner".into()],
            }]
        );
    }

    #[test]
    fn test_attribution_is_case_insensitive_and_multi_member() {
        let family = family();
        let events = vec![
            event("FAMILY Picnic", "2024-01-13T12:00"),
            event("Dentist", "2024-01-11T09:00"),
        ];
        let attributions = attribute_events(&events, &family);
        assert_eq!(attributions[0].members, vec!["wife", "son"]);
        assert!(attributions[1].members.is_empty());
    }

    #[test]
    fn test_attribution_is_idempotent() {
        let family = family();
        let events = vec![
            event("school play", "2024-01-12T17:00"),
            event("date night", "2024-01-11T19:00"),
            event("oil change", "2024-01-11T08:00"),
        ];
        let first = attribute_events(&events, &family);
        let second = attribute_events(&events, &family);
        assert_eq!(first, second);
    }

    #[test]
    fn test_calendar_build_orders_and_keeps_unattributed() {
        let assembler = ContextAssembler::new(family(), 30);
        let context = assembler.build(
            Intent::AnalyzeCalendar,
            RawInputs {
                events: vec![
                    event("school play", "2024-01-12T17:00"),
                    event("oil change", "2024-01-11T08:00"),
                    event("date night", "2024-01-11T19:00"),
                ],
                ..Default::default()
            },
        );

        let order: Vec<&str> = context.events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(order, vec!["oil change", "date night", "school play"]);
        assert_eq!(context.unattributed, vec!["oil change"]);
        assert_eq!(context.attributed_members(), vec!["wife", "son"]);
        assert!(context.summary.contains("- oil change on 2024-01-11T08:00"));
        assert!(context
            .summary
            .contains("Event with wife: date night on 2024-01-11T19:00"));
        assert!(context
            .summary
            .contains("Event with son: school play on 2024-01-12T17:00"));
    }

    #[test]
    fn test_empty_calendar_summary() {
        let assembler = ContextAssembler::new(family(), 30);
        let context = assembler.build(Intent::AnalyzeCalendar, RawInputs::default());
        assert_eq!(context.summary, NO_EVENTS_SUMMARY);
        assert!(context.attributed_members().is_empty());
    }

    #[test]
    fn test_situation_passes_through_unchanged() {
        let assembler = ContextAssembler::new(family(), 30);
        let situation = "  My son refuses to talk about school.\n";
        let context = assembler.build(
            Intent::CommunicationAdvice,
            RawInputs {
                text: situation.into(),
                events: vec![event("family dinner", "2024-01-10T18:00")],
                ..Default::default()
            },
        );
        assert_eq!(context.summary, situation);
        assert!(context.events.is_empty());
        assert!(context.member_events.is_empty());
    }

    #[test]
    fn test_analytics_merged_per_member_in_caller_order() {
        let db = Arc::new(Database::in_memory().unwrap());
        let ledger = InteractionLedger::new(db);
        ledger
            .record(NewInteraction::new("son", "play", 30, 8))
            .unwrap();

        let assembler = ContextAssembler::new(family(), 30).with_ledger(ledger);
        let context = assembler.build(
            Intent::GenerateInsights,
            RawInputs {
                text: "weekend plans".into(),
                members: vec!["son".into(), "wife".into(), "son".into()],
                ..Default::default()
            },
        );

        assert_eq!(context.members, vec!["son", "wife"]);
        assert_eq!(context.analytics.len(), 2);
        assert_eq!(context.analytics[0].member.as_deref(), Some("son"));
        assert_eq!(context.analytics[0].count, 1);
        assert_eq!(context.analytics[1].count, 0);

        let rendered = context.render();
        assert!(rendered.starts_with("weekend plans"));
        assert!(rendered.contains("Recent interactions:"));
        assert!(rendered.contains("son: 1 interactions"));
    }

    #[test]
    fn test_no_members_no_analytics() {
        let db = Arc::new(Database::in_memory().unwrap());
        let assembler =
            ContextAssembler::new(family(), 30).with_ledger(InteractionLedger::new(db));
        let context = assembler.build(
            Intent::GenerateInsights,
            RawInputs {
                text: "anything".into(),
                ..Default::default()
            },
        );
        assert!(context.analytics.is_empty());
        assert_eq!(context.render(), "anything");
    }

    #[test]
    fn test_track_progress_adds_overall() {
        let db = Arc::new(Database::in_memory().unwrap());
        let assembler =
            ContextAssembler::new(family(), 30).with_ledger(InteractionLedger::new(db));
        let context = assembler.build(
            Intent::TrackProgress,
            RawInputs {
                members: vec!["wife".into()],
                ..Default::default()
            },
        );
        assert_eq!(context.analytics.len(), 2);
        assert!(context.analytics[1].member.is_none());
    }
}
