//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Ginger - Family assistant for quality time
#[derive(Parser)]
#[command(name = "ginger")]
#[command(
    about = "Family assistant: calendar insights, interaction log and recommendations",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "ginger.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set GINGER_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Log a family interaction
    Log {
        /// Family member id (e.g. son)
        #[arg(short, long)]
        member: String,

        /// Interaction type (e.g. homework, play, date)
        #[arg(short = 't', long = "type")]
        interaction_type: String,

        /// Duration in minutes
        #[arg(short, long)]
        duration: i64,

        /// Quality score, 0-10
        #[arg(short, long)]
        quality: u8,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Manage family goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Interaction analytics over a trailing window
    Stats {
        /// Only this family member
        #[arg(short, long)]
        member: Option<String>,

        /// Window in days (defaults to the configured window)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Attribute upcoming calendar events to family members
    Calendar {
        /// Also generate activity recommendations
        #[arg(long)]
        recommend: bool,

        /// Give up on generation after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Communication advice for a situation
    Advise {
        /// Describe what is going on
        situation: String,

        /// Give up on generation after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Plan activities around the upcoming calendar
    Plan {
        /// Give up on generation after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Interaction analytics per member plus active goals
    Progress,

    /// Generate insights for any context
    Ask {
        /// Context for the recommendation
        #[arg(short, long)]
        context: String,

        /// Knowledge domain to search (repeatable)
        #[arg(short, long = "domain", required = true)]
        domains: Vec<String>,

        /// Family member to include analytics for (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,

        /// Give up on generation after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show the configured backend and check that it responds
    Backend,

    /// Manage model prompts
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },

    /// Plan a family trip from a flight fixture file
    Trip {
        /// JSON file with destinations and flights
        #[arg(long)]
        flights: PathBuf,

        /// Total budget for the whole party
        #[arg(short, long)]
        budget: f64,

        /// Home airport code
        #[arg(long, default_value = "SFO")]
        from: String,

        /// Departure date (YYYY-MM-DD)
        #[arg(long)]
        depart: String,

        /// Return date (YYYY-MM-DD)
        #[arg(long = "return")]
        return_date: String,

        /// Adults travelling
        #[arg(long, default_value = "2")]
        adults: u32,

        /// Children travelling
        #[arg(long, default_value = "0")]
        children: u32,
    },
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Set a new goal (starts active)
    Add {
        /// Goal category (e.g. bonding, communication)
        #[arg(short, long)]
        category: String,

        /// What the goal is
        description: String,

        /// Target date (YYYY-MM-DD)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// List goals
    List {
        /// Filter by status: active, completed, abandoned
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Change a goal's status
    Status {
        /// Goal ID
        id: i64,

        /// New status: active, completed, abandoned
        status: String,

        /// Progress note to append
        #[arg(short, long)]
        note: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List prompts and whether they are overridden
    List,

    /// Show a prompt's content
    Show {
        /// Prompt ID (e.g. family_insights)
        id: String,
    },
}
