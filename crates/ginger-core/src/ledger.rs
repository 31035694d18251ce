//! Interaction Ledger
//!
//! Append-only log of family interactions plus the goals they work towards.
//! Answers aggregate analytics over a trailing window. Storage lives behind
//! [`LedgerStore`]; [`crate::db::Database`] is the production implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Goal, GoalStatus, InteractionRecord, NewGoal, NewInteraction};

/// Backing store for interactions and goals
///
/// Each insert must be atomic and durable before it returns. Reads may run
/// concurrently with each other and with writes.
pub trait LedgerStore: Send + Sync {
    /// Append an interaction that has already been validated
    fn insert_interaction(
        &self,
        interaction: &NewInteraction,
        timestamp: DateTime<Utc>,
    ) -> Result<InteractionRecord>;

    /// Interactions with `timestamp >= since`, optionally for one member (exact match),
    /// oldest first
    fn interactions_since(
        &self,
        since: DateTime<Utc>,
        member: Option<&str>,
    ) -> Result<Vec<InteractionRecord>>;

    fn insert_goal(&self, goal: &NewGoal, created_at: DateTime<Utc>) -> Result<Goal>;

    fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>>;

    /// Move a goal to `status`, appending `note` to its progress notes
    fn set_goal_status(&self, id: i64, status: GoalStatus, note: Option<&str>) -> Result<Goal>;
}

/// Aggregate view of interactions in a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    /// Member filter, None for all members
    pub member: Option<String>,
    pub window_days: u32,
    pub count: u64,
    /// Total minutes
    pub total_duration: i64,
    /// None when there are no interactions
    pub mean_quality: Option<f64>,
    pub by_type: BTreeMap<String, u64>,
}

impl AnalyticsSummary {
    /// Aggregate a set of records; never divides by zero
    pub fn from_records(
        member: Option<&str>,
        window_days: u32,
        records: &[InteractionRecord],
    ) -> Self {
        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        let mut total_duration = 0i64;
        let mut quality_sum = 0u64;

        for record in records {
            *by_type.entry(record.interaction_type.clone()).or_insert(0) += 1;
            total_duration = total_duration.saturating_add(record.duration);
            quality_sum = quality_sum.saturating_add(u64::from(record.quality_score));
        }

        let count = records.len() as u64;
        let mean_quality = if count == 0 {
            None
        } else {
            Some(quality_sum as f64 / count as f64)
        };

        Self {
            member: member.map(String::from),
            window_days,
            count,
            total_duration,
            mean_quality,
            by_type,
        }
    }

    /// Compact one-line summary for prompt context
    pub fn summary_line(&self) -> String {
        let who = self.member.as_deref().unwrap_or("everyone");
        if self.count == 0 {
            return format!(
                "{}: no logged interactions in the last {} days",
                who, self.window_days
            );
        }

        let quality = self
            .mean_quality
            .map(|q| format!("{:.1}", q))
            .unwrap_or_else(|| "n/a".to_string());
        let types = self
            .by_type
            .iter()
            .map(|(t, n)| format!("{} x{}", t, n))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}: {} interactions, {} min total, avg quality {}/10 in the last {} days ({})",
            who, self.count, self.total_duration, quality, self.window_days, types
        )
    }
}

/// Append-only interaction ledger over a shared store
#[derive(Clone)]
pub struct InteractionLedger {
    store: Arc<dyn LedgerStore>,
}

impl InteractionLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Log an interaction; the timestamp defaults to now
    pub fn record(&self, interaction: NewInteraction) -> Result<InteractionRecord> {
        interaction.validate()?;
        let timestamp = interaction.timestamp.unwrap_or_else(Utc::now);
        let record = self.store.insert_interaction(&interaction, timestamp)?;
        debug!(
            member = %record.family_member,
            interaction_type = %record.interaction_type,
            id = record.id,
            "Recorded interaction"
        );
        Ok(record)
    }

    /// Analytics over the trailing `window_days` ending now
    pub fn analyze(&self, member: Option<&str>, window_days: u32) -> Result<AnalyticsSummary> {
        self.analyze_at(member, window_days, Utc::now())
    }

    /// Analytics over the trailing `window_days` ending at `now`
    ///
    /// A record is included iff `timestamp >= now - window_days`.
    pub fn analyze_at(
        &self,
        member: Option<&str>,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSummary> {
        let since = now - Duration::days(i64::from(window_days));
        let records = self.store.interactions_since(since, member)?;
        Ok(AnalyticsSummary::from_records(member, window_days, &records))
    }

    /// Set a new goal (starts active)
    pub fn set_goal(&self, goal: NewGoal) -> Result<Goal> {
        goal.validate()?;
        self.store.insert_goal(&goal, Utc::now())
    }

    pub fn goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>> {
        self.store.list_goals(status)
    }

    /// Record an externally decided status transition
    pub fn set_goal_status(&self, id: i64, status: GoalStatus, note: Option<&str>) -> Result<Goal> {
        if id <= 0 {
            return Err(Error::InvalidRequest(format!("invalid goal id: {}", id)));
        }
        self.store.set_goal_status(id, status, note)
    }
}
