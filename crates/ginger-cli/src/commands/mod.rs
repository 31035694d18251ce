//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config, build_engine)
//! - `ledger` - Interaction log, goals and analytics
//! - `insights` - Calendar analysis, advice, planning, progress and ad hoc insights
//! - `prompts` - Prompt library management commands
//! - `travel` - Family trip planning

use anyhow::{Context, Result};
use chrono::NaiveDate;

pub mod core;
pub mod insights;
pub mod ledger;
pub mod prompts;
pub mod travel;

// Re-export command functions for main.rs
pub use core::*;
pub use insights::*;
pub use ledger::*;
pub use prompts::*;
pub use travel::*;

/// Parse a YYYY-MM-DD argument
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}
