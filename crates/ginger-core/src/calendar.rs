//! Calendar providers
//!
//! The pipeline only needs a list of upcoming events. Authentication with any
//! real calendar service happens outside the crate; what reaches here is either
//! an in-memory list or a JSON export on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CalendarEvent;

/// Source of upcoming calendar events
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Up to `max_results` upcoming events, soonest first
    ///
    /// Failures surface as [`Error::CalendarUnavailable`].
    async fn list_upcoming_events(&self, max_results: usize) -> Result<Vec<CalendarEvent>>;
}

/// Fixed list of events, returned as given (sorted, truncated)
#[derive(Debug, Clone, Default)]
pub struct StaticCalendar {
    events: Vec<CalendarEvent>,
    unavailable: bool,
}

impl StaticCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            unavailable: false,
        }
    }

    /// A calendar that always fails (for degraded-path testing)
    pub fn unavailable() -> Self {
        Self {
            events: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl CalendarProvider for StaticCalendar {
    async fn list_upcoming_events(&self, max_results: usize) -> Result<Vec<CalendarEvent>> {
        if self.unavailable {
            return Err(Error::CalendarUnavailable(
                "static calendar configured as unavailable".into(),
            ));
        }
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.start.cmp(&b.start));
        events.truncate(max_results);
        Ok(events)
    }
}

/// Calendar backed by a JSON array of events on disk
///
/// ```json
/// [{"summary": "family dinner", "start": "2024-01-10T18:00", "end": "2024-01-10T20:00"}]
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileCalendar {
    path: PathBuf,
}

impl JsonFileCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Events that have not finished by `now`
    pub async fn upcoming_at(
        &self,
        now: NaiveDateTime,
        max_results: usize,
    ) -> Result<Vec<CalendarEvent>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::CalendarUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let events: Vec<CalendarEvent> = serde_json::from_str(&content).map_err(|e| {
            Error::CalendarUnavailable(format!("{}: malformed events: {}", self.path.display(), e))
        })?;

        let total = events.len();
        let mut upcoming: Vec<CalendarEvent> = events
            .into_iter()
            .filter(|e| e.end_or_start() >= now)
            .collect();
        upcoming.sort_by(|a, b| a.start.cmp(&b.start));
        upcoming.truncate(max_results);

        debug!(
            path = %self.path.display(),
            total,
            upcoming = upcoming.len(),
            "Loaded calendar events"
        );
        Ok(upcoming)
    }
}

#[async_trait]
impl CalendarProvider for JsonFileCalendar {
    async fn list_upcoming_events(&self, max_results: usize) -> Result<Vec<CalendarEvent>> {
        self.upcoming_at(Utc::now().naive_utc(), max_results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_event_time;

    fn event(summary: &str, start: &str) -> CalendarEvent {
        CalendarEvent::new(summary, parse_event_time(start).unwrap())
    }

    #[tokio::test]
    async fn test_static_calendar_sorts_and_truncates() {
        let calendar = StaticCalendar::new(vec![
            event("soccer practice", "2024-01-12T16:00"),
            event("family dinner", "2024-01-10T18:00"),
            event("date night", "2024-01-11T19:30"),
        ]);

        let events = calendar.list_upcoming_events(2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "family dinner");
        assert_eq!(events[1].summary, "date night");
    }

    #[tokio::test]
    async fn test_unavailable_calendar() {
        let err = StaticCalendar::unavailable()
            .list_upcoming_events(10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CalendarUnavailable(_)));
    }

    #[tokio::test]
    async fn test_json_calendar_keeps_unfinished_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"[
                {"summary": "school play", "start": "2024-01-15T17:00"},
                {"summary": "past brunch",
                 "start": "2024-01-01T10:00", "end": "2024-01-01T11:00"},
                {"summary": "family dinner",
                 "start": "2024-01-10T18:00", "end": "2024-01-10T20:00"},
                {"summary": "all day trip", "start": "2024-01-20"}
            ]"#,
        )
        .unwrap();

        let calendar = JsonFileCalendar::new(&path);
        let now = parse_event_time("2024-01-10T19:00").unwrap();
        let events = calendar.upcoming_at(now, 10).await.unwrap();

        let summaries: Vec<&str> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["family dinner", "school play", "all day trip"]);

        let limited = calendar.upcoming_at(now, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_json_calendar_missing_file() {
        let calendar = JsonFileCalendar::new("/nonexistent/ginger/events.json");
        let err = calendar.list_upcoming_events(10).await.unwrap_err();
        assert!(matches!(err, Error::CalendarUnavailable(_)));
    }

    #[tokio::test]
    async fn test_json_calendar_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();

        let err = JsonFileCalendar::new(&path)
            .list_upcoming_events(10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CalendarUnavailable(_)));
    }
}
