//! Goal operations

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Goal, GoalStatus, NewGoal};

const GOAL_COLUMNS: &str =
    "id, created_at, category, description, target_date, status, progress_notes";

/// Goal row before date and status parsing
struct GoalRow {
    id: i64,
    created_at: String,
    category: String,
    description: String,
    target_date: Option<String>,
    status: String,
    progress_notes: Option<String>,
}

impl GoalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            category: row.get(2)?,
            description: row.get(3)?,
            target_date: row.get(4)?,
            status: row.get(5)?,
            progress_notes: row.get(6)?,
        })
    }

    fn into_goal(self) -> Result<Goal> {
        let target_date = self
            .target_date
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|e| {
                    Error::InvalidData(format!("Bad stored target date '{}': {}", d, e))
                })
            })
            .transpose()?;
        let status = self.status.parse::<GoalStatus>().map_err(Error::InvalidData)?;

        Ok(Goal {
            id: self.id,
            created_at: parse_datetime(&self.created_at)?,
            category: self.category,
            description: self.description,
            target_date,
            status,
            progress_notes: self.progress_notes,
        })
    }
}

impl Database {
    /// Create a goal in the active state
    pub fn insert_goal(&self, goal: &NewGoal, created_at: DateTime<Utc>) -> Result<Goal> {
        let conn = self.conn()?;
        let target = goal.target_date.map(|d| d.format("%Y-%m-%d").to_string());

        conn.execute(
            "INSERT INTO goals (created_at, category, description, target_date, status)
             VALUES (?, ?, ?, ?, ?)",
            params![
                format_datetime(&created_at),
                goal.category,
                goal.description,
                target,
                GoalStatus::Active.as_str(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_goal(id)?
            .ok_or_else(|| Error::NotFound(format!("goal {}", id)))
    }

    /// Get a goal by ID
    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ?", GOAL_COLUMNS),
                params![id],
                GoalRow::from_row,
            )
            .optional()?;

        row.map(GoalRow::into_goal).transpose()
    }

    /// List goals, newest first, optionally filtered by status
    pub fn list_goals(&self, status: Option<GoalStatus>) -> Result<Vec<Goal>> {
        let conn = self.conn()?;

        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM goals WHERE status = ? ORDER BY created_at DESC, id DESC",
                    GOAL_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![status.as_str()], GoalRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM goals ORDER BY created_at DESC, id DESC",
                    GOAL_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], GoalRow::from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter().map(GoalRow::into_goal).collect()
    }

    /// Set a goal's status, appending a progress note when given
    pub fn set_goal_status(&self, id: i64, status: GoalStatus, note: Option<&str>) -> Result<Goal> {
        let conn = self.conn()?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        let updated = conn.execute(
            "UPDATE goals SET status = ?1,
                progress_notes = CASE
                    WHEN ?2 IS NULL THEN progress_notes
                    WHEN progress_notes IS NULL OR progress_notes = '' THEN ?2
                    ELSE progress_notes || char(10) || ?2
                END
             WHERE id = ?3",
            params![status.as_str(), note, id],
        )?;
        drop(conn);

        if updated == 0 {
            return Err(Error::NotFound(format!("goal {}", id)));
        }

        self.get_goal(id)?
            .ok_or_else(|| Error::NotFound(format!("goal {}", id)))
    }
}
