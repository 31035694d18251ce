//! Domain models for Ginger

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest allowed interaction quality score (scores are 0..=10)
pub const QUALITY_SCORE_MAX: u8 = 10;

/// A calendar event supplied by a calendar provider
///
/// Read-only input to context assembly; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(with = "event_time")]
    pub start: NaiveDateTime,
    #[serde(default, with = "event_time::option")]
    pub end: Option<NaiveDateTime>,
}

impl CalendarEvent {
    pub fn new(summary: impl Into<String>, start: NaiveDateTime) -> Self {
        Self {
            summary: summary.into(),
            start,
            end: None,
        }
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Start rendered the way it appears in prompts (`2024-01-10T18:00`)
    pub fn start_label(&self) -> String {
        self.start.format(event_time::DISPLAY_FORMAT).to_string()
    }

    /// End of the event, or its start when the provider gave no end
    pub fn end_or_start(&self) -> NaiveDateTime {
        self.end.unwrap_or(self.start)
    }
}

/// Parse a calendar timestamp
///
/// Providers hand out RFC 3339 (`2024-01-10T18:00:00Z`), local times with or
/// without seconds (`2024-01-10T18:00`), and all-day dates (`2024-01-10`).
pub fn parse_event_time(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::InvalidData(format!("Unrecognized event time: {}", s)))
}

mod event_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M";
    const SERIALIZE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(SERIALIZE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_event_time(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            raw.map(|r| super::super::parse_event_time(&r).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// A logged family interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub family_member: String,
    pub interaction_type: String,
    /// Duration in minutes
    pub duration: i64,
    /// Quality score, 0..=10
    pub quality_score: u8,
    pub notes: String,
}

/// Input for logging a new interaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInteraction {
    pub family_member: String,
    pub interaction_type: String,
    pub duration: i64,
    pub quality_score: u8,
    #[serde(default)]
    pub notes: String,
    /// Defaults to the time of logging
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewInteraction {
    pub fn new(
        family_member: impl Into<String>,
        interaction_type: impl Into<String>,
        duration: i64,
        quality_score: u8,
    ) -> Self {
        Self {
            family_member: family_member.into(),
            interaction_type: interaction_type.into(),
            duration,
            quality_score,
            notes: String::new(),
            timestamp: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Reject records that would be meaningless in analytics
    pub fn validate(&self) -> Result<()> {
        if self.family_member.trim().is_empty() {
            return Err(Error::InvalidRequest("family_member must not be empty".into()));
        }
        if self.interaction_type.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "interaction_type must not be empty".into(),
            ));
        }
        if self.duration < 0 {
            return Err(Error::InvalidRequest(format!(
                "duration must not be negative (got {})",
                self.duration
            )));
        }
        if self.quality_score > QUALITY_SCORE_MAX {
            return Err(Error::InvalidRequest(format!(
                "quality_score must be between 0 and {} (got {})",
                QUALITY_SCORE_MAX, self.quality_score
            )));
        }
        Ok(())
    }
}

/// Lifecycle status of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(format!("Unknown goal status: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A family-related goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub category: String,
    pub description: String,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub progress_notes: Option<String>,
}

impl Goal {
    /// One-line summary used in progress context
    pub fn summary_line(&self) -> String {
        let mut line = format!("[{}] {}: {}", self.status, self.category, self.description);
        if let Some(target) = self.target_date {
            line.push_str(&format!(" (target {})", target));
        }
        if let Some(ref notes) = self.progress_notes {
            if !notes.is_empty() {
                line.push_str(&format!(" - {}", notes));
            }
        }
        line
    }
}

/// Input for setting a new goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub category: String,
    pub description: String,
    pub target_date: Option<NaiveDate>,
}

impl NewGoal {
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(Error::InvalidRequest("goal category must not be empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "goal description must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_event_time_formats() {
        let minute = parse_event_time("2024-01-10T18:00").unwrap();
        assert_eq!(minute.hour(), 18);

        let seconds = parse_event_time("2024-01-10T18:00:30").unwrap();
        assert_eq!(seconds.second(), 30);

        let rfc = parse_event_time("2024-01-10T18:00:00-05:00").unwrap();
        assert_eq!(rfc.hour(), 23);

        let all_day = parse_event_time("2024-01-10").unwrap();
        assert_eq!(
            all_day.date(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(all_day.hour(), 0);

        assert!(parse_event_time("next tuesday").is_err());
    }

    #[test]
    fn test_calendar_event_json_without_end() {
        let event: CalendarEvent =
            serde_json::from_str(r#"{"summary":"family dinner","start":"2024-01-10T18:00"}"#)
                .unwrap();
        assert_eq!(event.summary, "family dinner");
        assert!(event.end.is_none());
        assert_eq!(event.start_label(), "2024-01-10T18:00");
        assert_eq!(event.end_or_start(), event.start);
    }

    #[test]
    fn test_new_interaction_validation() {
        assert!(NewInteraction::new("son", "play", 30, 8).validate().is_ok());
        assert!(NewInteraction::new("son", "play", 30, 10).validate().is_ok());
        assert!(NewInteraction::new("son", "play", 30, 11).validate().is_err());
        assert!(NewInteraction::new("", "play", 30, 5).validate().is_err());
        assert!(NewInteraction::new("son", " ", 30, 5).validate().is_err());
        assert!(NewInteraction::new("son", "play", -1, 5).validate().is_err());
    }

    #[test]
    fn test_goal_status_roundtrip() {
        for status in [GoalStatus::Active, GoalStatus::Completed, GoalStatus::Abandoned] {
            assert_eq!(status.as_str().parse::<GoalStatus>().unwrap(), status);
        }
        assert!("paused".parse::<GoalStatus>().is_err());
    }

    #[test]
    fn test_goal_summary_line() {
        let goal = Goal {
            id: 1,
            created_at: Utc::now(),
            category: "bonding".into(),
            description: "Weekly hike with son".into(),
            target_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            status: GoalStatus::Active,
            progress_notes: Some("2 of 4 done".into()),
        };
        let line = goal.summary_line();
        assert!(line.starts_with("[active] bonding: Weekly hike with son"));
        assert!(line.contains("target 2024-06-01"));
        assert!(line.ends_with("2 of 4 done"));
    }
}
