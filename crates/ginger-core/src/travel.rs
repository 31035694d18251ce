//! Family trip planning
//!
//! Candidate destinations and flights come from a [`FlightProvider`]. Flights
//! are kept only when they suit a family (reasonable departure hour, at most
//! one stop, within budget for the whole party) and do not clash with anything
//! on the calendar. Trips are ranked by a family-friendliness score.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::CalendarProvider;
use crate::error::{Error, Result};
use crate::models::CalendarEvent;

/// Earliest family-friendly departure hour (inclusive)
pub const EARLIEST_DEPARTURE_HOUR: u32 = 7;
/// Latest family-friendly departure hour (inclusive, 21:00 sharp)
pub const LATEST_DEPARTURE_HOUR: u32 = 21;
/// Most stops a family-friendly flight may have
pub const MAX_FAMILY_STOPS: u32 = 1;

/// Who is travelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

impl Party {
    pub fn new(adults: u32, children: u32) -> Self {
        Self { adults, children }
    }

    pub fn total(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }
}

/// Travel window; `start` is the outbound date, `end` the return date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripDates {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TripDates {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidRequest(format!(
                "return date {} is before departure date {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub airport: String,
}

/// Flight search parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightSearch {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub passengers: Party,
}

/// One flight leg offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub airline: String,
    pub number: String,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    #[serde(default)]
    pub stops: u32,
    /// Fare per passenger
    pub price: f64,
}

impl Flight {
    /// Fare for the whole party
    pub fn party_cost(&self, party: Party) -> f64 {
        self.price * f64::from(party.total())
    }

    pub fn duration_hours(&self) -> f64 {
        (self.arrival - self.departure).num_minutes() as f64 / 60.0
    }

    /// True if the flight's time in the air overlaps the event (bounds inclusive)
    pub fn overlaps(&self, event: &CalendarEvent) -> bool {
        self.departure <= event.end_or_start() && event.start <= self.arrival
    }
}

/// A ranked trip candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripOption {
    pub destination: Destination,
    /// Family-friendly, calendar-compatible flights, best first
    pub flights: Vec<Flight>,
    /// Cheapest outbound plus cheapest return, for the whole party
    pub total_cost: f64,
    pub family_friendly_score: f64,
}

/// Source of destinations and flights
#[async_trait]
pub trait FlightProvider: Send + Sync {
    /// Destinations worth searching for this budget and window
    async fn suggest_destinations(
        &self,
        budget: f64,
        dates: &TripDates,
    ) -> Result<Vec<Destination>>;

    /// Flights for a route; return legs included when `return_date` is set
    async fn search(&self, search: &FlightSearch) -> Result<Vec<Flight>>;
}

/// Departure between 07:00 and 21:00, at most one stop, party fare within budget
pub fn is_family_friendly(flight: &Flight, budget: f64, party: Party) -> bool {
    let departure = flight.departure.time();
    let hour_ok = departure.hour() >= EARLIEST_DEPARTURE_HOUR
        && (departure.hour() < LATEST_DEPARTURE_HOUR
            || (departure.hour() == LATEST_DEPARTURE_HOUR && departure.minute() == 0));

    hour_ok && flight.stops <= MAX_FAMILY_STOPS && flight.party_cost(party) <= budget
}

/// True if the flight overlaps none of the events
pub fn fits_calendar(flight: &Flight, events: &[CalendarEvent]) -> bool {
    !events.iter().any(|e| flight.overlaps(e))
}

/// Score in 0..=100; direct, daytime, short and cheap flights score highest
pub fn family_score(flight: &Flight, budget: f64, party: Party) -> f64 {
    let mut score = 100.0;
    score -= 20.0 * f64::from(flight.stops);

    let hour = flight.departure.hour();
    if !(9..=17).contains(&hour) {
        score -= 10.0;
    }

    score -= (flight.duration_hours() * 2.0).min(30.0);

    if budget > 0.0 {
        let share = (flight.party_cost(party) / budget).clamp(0.0, 1.0);
        score -= 20.0 * share;
    }

    score.clamp(0.0, 100.0)
}

/// Plans family trips against a flight provider and the family calendar
pub struct TravelPlanner {
    provider: Arc<dyn FlightProvider>,
    calendar: Arc<dyn CalendarProvider>,
    home_airport: String,
    max_events: usize,
}

impl TravelPlanner {
    pub fn new(
        provider: Arc<dyn FlightProvider>,
        calendar: Arc<dyn CalendarProvider>,
        home_airport: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            calendar,
            home_airport: home_airport.into(),
            max_events: 50,
        }
    }

    /// How many upcoming events to check flights against
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Trips whose flights suit the family and the calendar, best score first
    ///
    /// Destinations without a usable flight, or whose round trip costs more
    /// than the budget, are left out. An unavailable calendar means no clash
    /// checking; provider failures are errors.
    pub async fn plan_family_trip(
        &self,
        budget: f64,
        dates: TripDates,
        party: Party,
    ) -> Result<Vec<TripOption>> {
        if !(budget.is_finite() && budget > 0.0) {
            return Err(Error::InvalidRequest(format!(
                "budget must be positive (got {})",
                budget
            )));
        }
        if party.adults == 0 {
            return Err(Error::InvalidRequest(
                "a trip needs at least one adult".into(),
            ));
        }

        let events = match self.calendar.list_upcoming_events(self.max_events).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Calendar unavailable, skipping clash check");
                Vec::new()
            }
        };

        let destinations = self
            .provider
            .suggest_destinations(budget, &dates)
            .await
            .map_err(travel_error)?;

        let mut trips = Vec::new();
        for destination in destinations {
            let search = FlightSearch {
                origin: self.home_airport.clone(),
                destination: destination.airport.clone(),
                departure_date: dates.start,
                return_date: Some(dates.end),
                passengers: party,
            };
            let offered = self.provider.search(&search).await.map_err(travel_error)?;
            let total = offered.len();

            let mut flights: Vec<Flight> = offered
                .into_iter()
                .filter(|f| is_family_friendly(f, budget, party) && fits_calendar(f, &events))
                .collect();
            debug!(
                destination = %destination.airport,
                offered = total,
                kept = flights.len(),
                "Filtered flights"
            );
            if flights.is_empty() {
                continue;
            }

            flights.sort_by(|a, b| {
                family_score(b, budget, party)
                    .total_cmp(&family_score(a, budget, party))
                    .then_with(|| a.price.total_cmp(&b.price))
            });

            let family_friendly_score = flights
                .iter()
                .map(|f| family_score(f, budget, party))
                .fold(0.0, f64::max);
            let total_cost = trip_cost(&flights, &self.home_airport, party);
            if total_cost > budget {
                debug!(
                    destination = %destination.airport,
                    total_cost,
                    budget,
                    "Round trip over budget"
                );
                continue;
            }

            trips.push(TripOption {
                destination,
                flights,
                total_cost,
                family_friendly_score,
            });
        }

        trips.sort_by(|a, b| {
            b.family_friendly_score
                .total_cmp(&a.family_friendly_score)
                .then_with(|| a.total_cost.total_cmp(&b.total_cost))
                .then_with(|| a.destination.name.cmp(&b.destination.name))
        });

        info!(trips = trips.len(), budget, party = party.total(), "Planned family trips");
        Ok(trips)
    }
}

/// Cheapest outbound leg plus cheapest return leg
fn trip_cost(flights: &[Flight], home: &str, party: Party) -> f64 {
    let cheapest = |outbound: bool| {
        flights
            .iter()
            .filter(|f| (f.origin == home) == outbound)
            .map(|f| f.party_cost(party))
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(0.0)
    };
    cheapest(true) + cheapest(false)
}

fn travel_error(e: Error) -> Error {
    match e {
        Error::Travel(_) => e,
        other => Error::Travel(other.to_string()),
    }
}

/// Fixed destinations and flights (fixtures, offline use)
///
/// ```json
/// {
///   "destinations": [{"name": "San Diego", "airport": "SAN"}],
///   "flights": [{"airline": "UA", "number": "UA100", "origin": "SFO", "destination": "SAN",
///                "departure": "2024-07-01T09:00:00", "arrival": "2024-07-01T10:30:00",
///                "stops": 0, "price": 120.0}]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFlights {
    pub destinations: Vec<Destination>,
    pub flights: Vec<Flight>,
    #[serde(skip)]
    unavailable: bool,
}

impl StaticFlights {
    pub fn new(destinations: Vec<Destination>, flights: Vec<Flight>) -> Self {
        Self {
            destinations,
            flights,
            unavailable: false,
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Travel(format!("malformed flight fixture: {}", e)))
    }

    /// A provider that always fails
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::Travel("flight provider unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FlightProvider for StaticFlights {
    async fn suggest_destinations(
        &self,
        _budget: f64,
        _dates: &TripDates,
    ) -> Result<Vec<Destination>> {
        self.check_available()?;
        Ok(self.destinations.clone())
    }

    async fn search(&self, search: &FlightSearch) -> Result<Vec<Flight>> {
        self.check_available()?;
        Ok(self
            .flights
            .iter()
            .filter(|f| {
                let outbound = f.origin == search.origin
                    && f.destination == search.destination
                    && f.departure.date() == search.departure_date;
                let inbound = search.return_date.is_some_and(|date| {
                    f.origin == search.destination
                        && f.destination == search.origin
                        && f.departure.date() == date
                });
                outbound || inbound
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::StaticCalendar;
    use crate::models::parse_event_time;

    fn at(s: &str) -> NaiveDateTime {
        parse_event_time(s).unwrap()
    }

    fn flight(
        number: &str,
        from: &str,
        to: &str,
        dep: &str,
        arr: &str,
        stops: u32,
        price: f64,
    ) -> Flight {
        Flight {
            airline: "UA".into(),
            number: number.into(),
            origin: from.into(),
            destination: to.into(),
            departure: at(dep),
            arrival: at(arr),
            stops,
            price,
        }
    }

    fn dates() -> TripDates {
        TripDates::new(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
        )
        .unwrap()
    }

    fn family() -> Party {
        Party::new(2, 2)
    }

    #[test]
    fn test_family_friendly_rules() {
        let ok = flight("1", "SFO", "SAN", "2024-07-01T09:00", "2024-07-01T10:30", 0, 100.0);
        assert!(is_family_friendly(&ok, 1000.0, family()));

        let red_eye = flight("2", "SFO", "SAN", "2024-07-01T23:30", "2024-07-02T01:00", 0, 100.0);
        assert!(!is_family_friendly(&red_eye, 1000.0, family()));

        let dawn = flight("3", "SFO", "SAN", "2024-07-01T06:59", "2024-07-01T08:30", 0, 100.0);
        assert!(!is_family_friendly(&dawn, 1000.0, family()));

        let last_call = flight("4", "SFO", "SAN", "2024-07-01T21:00", "2024-07-01T22:30", 0, 100.0);
        assert!(is_family_friendly(&last_call, 1000.0, family()));

        let too_late = flight("5", "SFO", "SAN", "2024-07-01T21:05", "2024-07-01T22:30", 0, 100.0);
        assert!(!is_family_friendly(&too_late, 1000.0, family()));

        let two_stops = flight("6", "SFO", "SAN", "2024-07-01T09:00", "2024-07-01T15:00", 2, 100.0);
        assert!(!is_family_friendly(&two_stops, 1000.0, family()));

        // 4 passengers at 300 each is over a 1000 budget
        let pricey = flight("7", "SFO", "SAN", "2024-07-01T09:00", "2024-07-01T10:30", 0, 300.0);
        assert!(!is_family_friendly(&pricey, 1000.0, family()));
    }

    #[test]
    fn test_calendar_overlap() {
        let f = flight("1", "SFO", "SAN", "2024-07-01T09:00", "2024-07-01T10:30", 0, 100.0);
        let clash = CalendarEvent::new("school play", at("2024-07-01T10:00"));
        let later =
            CalendarEvent::new("dinner", at("2024-07-01T18:00")).with_end(at("2024-07-01T20:00"));
        let spanning = CalendarEvent::new("conference", at("2024-07-01T08:00"))
            .with_end(at("2024-07-01T12:00"));

        assert!(!fits_calendar(&f, &[clash]));
        assert!(fits_calendar(&f, &[later.clone()]));
        assert!(!fits_calendar(&f, &[later, spanning]));
    }

    #[test]
    fn test_score_prefers_direct_daytime() {
        let direct = flight("1", "SFO", "SAN", "2024-07-01T10:00", "2024-07-01T11:30", 0, 100.0);
        let one_stop = flight("2", "SFO", "SAN", "2024-07-01T10:00", "2024-07-01T14:00", 1, 100.0);
        let early = flight("3", "SFO", "SAN", "2024-07-01T07:30", "2024-07-01T09:00", 0, 100.0);

        let direct_score = family_score(&direct, 1000.0, family());
        assert!(direct_score > family_score(&one_stop, 1000.0, family()));
        assert!(direct_score > family_score(&early, 1000.0, family()));
    }

    fn provider() -> StaticFlights {
        StaticFlights::new(
            vec![
                Destination {
                    name: "San Diego".into(),
                    airport: "SAN".into(),
                },
                Destination {
                    name: "Honolulu".into(),
                    airport: "HNL".into(),
                },
                Destination {
                    name: "Portland".into(),
                    airport: "PDX".into(),
                },
            ],
            vec![
                flight("UA1", "SFO", "SAN", "2024-07-01T10:00", "2024-07-01T11:30", 0, 120.0),
                flight("UA2", "SFO", "SAN", "2024-07-01T14:00", "2024-07-01T15:30", 0, 90.0),
                flight("UA3", "SAN", "SFO", "2024-07-05T12:00", "2024-07-05T13:30", 0, 130.0),
                flight("UA4", "SFO", "HNL", "2024-07-01T08:00", "2024-07-01T14:00", 1, 200.0),
                flight("UA5", "SFO", "PDX", "2024-07-01T05:30", "2024-07-01T07:30", 0, 80.0),
            ],
        )
    }

    #[tokio::test]
    async fn test_plan_family_trip_ranks_and_filters() {
        let calendar = StaticCalendar::new(vec![CalendarEvent::new(
            "dentist",
            at("2024-07-01T15:00"),
        )]);
        let planner = TravelPlanner::new(Arc::new(provider()), Arc::new(calendar), "SFO");

        let trips = planner
            .plan_family_trip(1000.0, dates(), family())
            .await
            .unwrap();

        // Portland only has a pre-dawn flight
        let names: Vec<&str> = trips.iter().map(|t| t.destination.name.as_str()).collect();
        assert_eq!(names, vec!["San Diego", "Honolulu"]);

        let san_diego = &trips[0];
        // UA2 clashes with the dentist appointment
        let numbers: Vec<&str> = san_diego.flights.iter().map(|f| f.number.as_str()).collect();
        assert_eq!(numbers, vec!["UA1", "UA3"]);
        assert_eq!(san_diego.total_cost, 120.0 * 4.0 + 130.0 * 4.0);
        assert!(san_diego.family_friendly_score > trips[1].family_friendly_score);
    }

    #[tokio::test]
    async fn test_round_trip_over_budget_is_dropped() {
        let calendar = StaticCalendar::new(vec![CalendarEvent::new(
            "dentist",
            at("2024-07-01T15:00"),
        )]);
        let planner = TravelPlanner::new(Arc::new(provider()), Arc::new(calendar), "SFO");

        // Each San Diego leg fits 900 on its own, the pair costs 1000
        let trips = planner
            .plan_family_trip(900.0, dates(), family())
            .await
            .unwrap();

        let names: Vec<&str> = trips.iter().map(|t| t.destination.name.as_str()).collect();
        assert_eq!(names, vec!["Honolulu"]);
        assert!(trips.iter().all(|t| t.total_cost <= 900.0));
    }

    #[tokio::test]
    async fn test_plan_family_trip_errors() {
        let planner = TravelPlanner::new(
            Arc::new(StaticFlights::unavailable()),
            Arc::new(StaticCalendar::default()),
            "SFO",
        );
        let err = planner
            .plan_family_trip(1000.0, dates(), family())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Travel(_)));

        let err = planner
            .plan_family_trip(0.0, dates(), family())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let err = planner
            .plan_family_trip(500.0, dates(), Party::new(0, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unavailable_calendar_skips_clash_check() {
        let planner = TravelPlanner::new(
            Arc::new(provider()),
            Arc::new(StaticCalendar::unavailable()),
            "SFO",
        );
        let trips = planner
            .plan_family_trip(1000.0, dates(), family())
            .await
            .unwrap();
        assert_eq!(trips[0].flights.len(), 3);
    }

    #[test]
    fn test_trip_dates_order() {
        let result = TripDates::new(
            NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_static_flights_from_json() {
        let provider = StaticFlights::from_json(
            r#"{
                "destinations": [{"name": "San Diego", "airport": "SAN"}],
                "flights": [{"airline": "UA", "number": "UA1",
                             "origin": "SFO", "destination": "SAN",
                             "departure": "2024-07-01T10:00:00", "arrival": "2024-07-01T11:30:00",
                             "price": 120.0}]
            }"#,
        )
        .unwrap();
        assert_eq!(provider.flights[0].stops, 0);

        assert!(matches!(
            StaticFlights::from_json("[]"),
            Err(Error::Travel(_))
        ));
    }
}
