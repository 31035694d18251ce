//! Ginger CLI - Family assistant
//!
//! Usage:
//!   ginger init                               Initialize database
//!   ginger log -m son -t homework -d 45 -q 8  Log an interaction
//!   ginger calendar --recommend               Calendar analysis with recommendations
//!   ginger advise "..."                       Communication advice
//!   ginger backend                            Check the configured backend

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, &config, cli.no_encrypt),
        Commands::Log {
            member,
            interaction_type,
            duration,
            quality,
            notes,
        } => {
            let ledger = commands::open_ledger(&cli.db, cli.no_encrypt)?;
            commands::cmd_log(
                &ledger,
                &config,
                &member,
                &interaction_type,
                duration,
                quality,
                notes.as_deref(),
            )
        }
        Commands::Goal { action } => {
            let ledger = commands::open_ledger(&cli.db, cli.no_encrypt)?;
            match action {
                GoalAction::Add {
                    category,
                    description,
                    target,
                } => commands::cmd_goal_add(&ledger, &category, &description, target.as_deref()),
                GoalAction::List { status } => commands::cmd_goal_list(&ledger, status.as_deref()),
                GoalAction::Status { id, status, note } => {
                    commands::cmd_goal_status(&ledger, id, &status, note.as_deref())
                }
            }
        }
        Commands::Stats { member, days } => {
            let ledger = commands::open_ledger(&cli.db, cli.no_encrypt)?;
            let days = days.unwrap_or(config.ledger.window_days);
            commands::cmd_stats(&ledger, member.as_deref(), days)
        }
        Commands::Calendar { recommend, timeout } => {
            let engine = commands::build_engine(&cli.db, config, cli.no_encrypt).await?;
            commands::cmd_calendar(&engine, recommend, commands::request_options(timeout)).await
        }
        Commands::Advise { situation, timeout } => {
            let engine = commands::build_engine(&cli.db, config, cli.no_encrypt).await?;
            commands::cmd_advise(&engine, &situation, commands::request_options(timeout)).await
        }
        Commands::Plan { timeout } => {
            let engine = commands::build_engine(&cli.db, config, cli.no_encrypt).await?;
            commands::cmd_plan(&engine, commands::request_options(timeout)).await
        }
        Commands::Progress => {
            let engine = commands::build_engine(&cli.db, config, cli.no_encrypt).await?;
            commands::cmd_progress(&engine).await
        }
        Commands::Ask {
            context,
            domains,
            members,
            timeout,
        } => {
            let engine = commands::build_engine(&cli.db, config, cli.no_encrypt).await?;
            commands::cmd_ask(
                &engine,
                &context,
                domains,
                members,
                commands::request_options(timeout),
            )
            .await
        }
        Commands::Backend => {
            let client = ginger_core::GenerativeClient::from_config(&config.backend);
            commands::cmd_backend(&client).await.map(|_| ())
        }
        Commands::Prompts { action } => match action {
            PromptsAction::List => commands::cmd_prompts_list(),
            PromptsAction::Show { id } => commands::cmd_prompts_show(&id),
        },
        Commands::Trip {
            flights,
            budget,
            from,
            depart,
            return_date,
            adults,
            children,
        } => {
            let calendar = commands::calendar_provider(&config);
            commands::cmd_trip(
                &flights,
                calendar,
                &from,
                budget,
                &depart,
                &return_date,
                adults,
                children,
            )
            .await
        }
    }
}
