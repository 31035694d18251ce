//! Interaction log, goals and analytics commands

use anyhow::{anyhow, Context, Result};
use ginger_core::{GingerConfig, GoalStatus, InteractionLedger, NewGoal, NewInteraction};
use tracing::warn;

use super::{parse_date, print_json};

pub fn cmd_log(
    ledger: &InteractionLedger,
    config: &GingerConfig,
    member: &str,
    interaction_type: &str,
    duration: i64,
    quality: u8,
    notes: Option<&str>,
) -> Result<()> {
    if config.family.member(member).is_none() {
        warn!(member, "Member is not in the family config, logging anyway");
    }

    let mut interaction = NewInteraction::new(member, interaction_type, duration, quality);
    if let Some(notes) = notes {
        interaction = interaction.with_notes(notes);
    }

    let record = ledger
        .record(interaction)
        .context("Failed to log interaction")?;

    println!(
        "✅ Logged {} min of {} with {} (quality {}/10)",
        record.duration, record.interaction_type, record.family_member, record.quality_score
    );
    Ok(())
}

pub fn cmd_goal_add(
    ledger: &InteractionLedger,
    category: &str,
    description: &str,
    target: Option<&str>,
) -> Result<()> {
    let target_date = target.map(parse_date).transpose()?;
    let goal = ledger
        .set_goal(NewGoal {
            category: category.to_string(),
            description: description.to_string(),
            target_date,
        })
        .context("Failed to set goal")?;

    println!("✅ Goal #{} set: {}", goal.id, goal.summary_line());
    Ok(())
}

pub fn cmd_goal_list(ledger: &InteractionLedger, status: Option<&str>) -> Result<()> {
    let status = status.map(parse_status).transpose()?;
    let goals = ledger.goals(status).context("Failed to list goals")?;

    if goals.is_empty() {
        println!("No goals yet. Add one with: ginger goal add -c bonding \"...\"");
        return Ok(());
    }

    for goal in &goals {
        println!("{:>4}  {}", goal.id, goal.summary_line());
    }
    Ok(())
}

pub fn cmd_goal_status(
    ledger: &InteractionLedger,
    id: i64,
    status: &str,
    note: Option<&str>,
) -> Result<()> {
    let status = parse_status(status)?;
    let goal = ledger
        .set_goal_status(id, status, note)
        .with_context(|| format!("Failed to update goal #{}", id))?;

    println!("✅ Goal #{}: {}", goal.id, goal.summary_line());
    Ok(())
}

pub fn cmd_stats(ledger: &InteractionLedger, member: Option<&str>, days: u32) -> Result<()> {
    let summary = ledger
        .analyze(member, days)
        .context("Failed to analyze interactions")?;
    print_json(&summary)
}

fn parse_status(s: &str) -> Result<GoalStatus> {
    s.parse::<GoalStatus>().map_err(|e| anyhow!(e))
}
