//! Interaction log operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::ledger::LedgerStore;
use crate::models::{Goal, GoalStatus, InteractionRecord, NewGoal, NewInteraction};

const INTERACTION_COLUMNS: &str =
    "id, timestamp, family_member, interaction_type, duration, quality_score, notes";

/// Interaction row before timestamp parsing
struct InteractionRow {
    id: i64,
    timestamp: String,
    family_member: String,
    interaction_type: String,
    duration: i64,
    quality_score: i64,
    notes: String,
}

impl InteractionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            family_member: row.get(2)?,
            interaction_type: row.get(3)?,
            duration: row.get(4)?,
            quality_score: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<InteractionRecord> {
        let quality_score = u8::try_from(self.quality_score).map_err(|_| {
            Error::InvalidData(format!(
                "Stored quality score out of range: {}",
                self.quality_score
            ))
        })?;

        Ok(InteractionRecord {
            id: self.id,
            timestamp: parse_datetime(&self.timestamp)?,
            family_member: self.family_member,
            interaction_type: self.interaction_type,
            duration: self.duration,
            quality_score,
            notes: self.notes,
        })
    }
}

impl Database {
    /// Append an interaction
    pub fn insert_interaction(
        &self,
        interaction: &NewInteraction,
        timestamp: DateTime<Utc>,
    ) -> Result<InteractionRecord> {
        let conn = self.conn()?;
        let timestamp_str = format_datetime(&timestamp);

        conn.execute(
            "INSERT INTO interactions
                 (timestamp, family_member, interaction_type, duration, quality_score, notes)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                timestamp_str,
                interaction.family_member,
                interaction.interaction_type,
                interaction.duration,
                interaction.quality_score,
                interaction.notes,
            ],
        )?;

        Ok(InteractionRecord {
            id: conn.last_insert_rowid(),
            timestamp: parse_datetime(&timestamp_str)?,
            family_member: interaction.family_member.clone(),
            interaction_type: interaction.interaction_type.clone(),
            duration: interaction.duration,
            quality_score: interaction.quality_score,
            notes: interaction.notes.clone(),
        })
    }

    /// Interactions at or after `since`, oldest first
    pub fn interactions_since(
        &self,
        since: DateTime<Utc>,
        member: Option<&str>,
    ) -> Result<Vec<InteractionRecord>> {
        let conn = self.conn()?;
        let since_str = format_datetime(&since);

        // Stored timestamps share one fixed-width format, so string order is time order
        let rows = match member {
            Some(member) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM interactions WHERE timestamp >= ? AND family_member = ?
                     ORDER BY timestamp, id",
                    INTERACTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![since_str, member], InteractionRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM interactions WHERE timestamp >= ? ORDER BY timestamp, id",
                    INTERACTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![since_str], InteractionRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter().map(InteractionRow::into_record).collect()
    }
}

impl LedgerStore for Database {
    fn insert_interaction(
        &self,
        interaction: &NewInteraction,
        timestamp: DateTime<Utc>,
    ) -> Result<InteractionRecord> {
        Database::insert_interaction(self, interaction, timestamp)
    }

    fn interactions_since(
        &self,
        since: DateTime<Utc>,
        member: Option<&str>,
    ) -> Result<Vec<InteractionRecord>> {
        Database::interactions_since(self, since, member)
    }

    fn insert_goal(&self, goal: &NewGoal, created_at: DateTime<Utc>) -> Result<Goal> {
        Database::insert_goal(self, goal, created_at)
    }

    fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>> {
        Database::list_goals(self, status)
    }

    fn set_goal_status(&self, id: i64, status: GoalStatus, note: Option<&str>) -> Result<Goal> {
        Database::set_goal_status(self, id, status, note)
    }
}
