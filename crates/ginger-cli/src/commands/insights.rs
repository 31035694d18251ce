//! Insight command implementations
//!
//! Every command prints the resulting insight as JSON. When generation fails
//! after context was assembled, the partial context is printed to stderr so
//! it can be inspected or retried.

use anyhow::{Context, Result};
use ginger_core::{Insight, InsightEngine, InsightRequest, RequestOptions};

use super::print_json;

pub async fn cmd_calendar(
    engine: &InsightEngine,
    recommend: bool,
    options: RequestOptions,
) -> Result<()> {
    report(engine.analyze_calendar_with(recommend, options).await)
}

pub async fn cmd_advise(
    engine: &InsightEngine,
    situation: &str,
    options: RequestOptions,
) -> Result<()> {
    report(engine.get_communication_advice_with(situation, options).await)
}

pub async fn cmd_plan(engine: &InsightEngine, options: RequestOptions) -> Result<()> {
    report(engine.plan_activities_with(options).await)
}

pub async fn cmd_progress(engine: &InsightEngine) -> Result<()> {
    report(engine.track_progress().await)
}

pub async fn cmd_ask(
    engine: &InsightEngine,
    context: &str,
    domains: Vec<String>,
    members: Vec<String>,
    options: RequestOptions,
) -> Result<()> {
    let request = InsightRequest::new(context)
        .with_domains(domains)
        .with_members(members);
    report(engine.generate_insights_with(request, options).await)
}

fn report(result: ginger_core::Result<Insight>) -> Result<()> {
    match result {
        Ok(insight) => print_json(&insight),
        Err(e) => {
            if let Some(failure) = e.generation_failure() {
                if let Ok(json) = serde_json::to_string_pretty(failure) {
                    eprintln!("{}", json);
                }
            }
            Err(e).context("Insight request failed")
        }
    }
}
