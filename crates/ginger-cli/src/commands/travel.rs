//! Family trip planning command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ginger_core::{CalendarProvider, Party, StaticFlights, TravelPlanner, TripDates};

use super::{parse_date, print_json};

#[allow(clippy::too_many_arguments)]
pub async fn cmd_trip(
    flights_path: &Path,
    calendar: Arc<dyn CalendarProvider>,
    home_airport: &str,
    budget: f64,
    depart: &str,
    return_date: &str,
    adults: u32,
    children: u32,
) -> Result<()> {
    let content = std::fs::read_to_string(flights_path)
        .with_context(|| format!("Failed to read {}", flights_path.display()))?;
    let provider = StaticFlights::from_json(&content).context("Failed to load flights")?;

    let dates = TripDates::new(parse_date(depart)?, parse_date(return_date)?)?;
    let planner = TravelPlanner::new(Arc::new(provider), calendar, home_airport);

    let trips = planner
        .plan_family_trip(budget, dates, Party::new(adults, children))
        .await
        .context("Failed to plan trip")?;

    if trips.is_empty() {
        eprintln!("No family-friendly trips fit the budget and calendar.");
    }
    print_json(&trips)
}
