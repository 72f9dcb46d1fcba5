//! Route map and GoWild calendar lookups.
//!
//! Reference data (routes and airport names) is loaded once and never
//! mutated afterwards. Availability is checked one destination at a time.

pub mod client;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Origin code to destination codes, destinations in published order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteMap {
    routes: BTreeMap<String, Vec<String>>,
}

impl RouteMap {
    pub fn insert(&mut self, origin: impl Into<String>, destinations: Vec<String>) {
        self.routes.insert(origin.into(), destinations);
    }

    /// Destinations served from `origin`; empty if the origin is unknown.
    pub fn destinations(&self, origin: &str) -> &[String] {
        self.routes.get(origin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for RouteMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

/// Airport code to display name ("Atlanta, GA (ATL)").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AirportNames {
    names: HashMap<String, String>,
}

impl AirportNames {
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.names.insert(code.into(), name.into());
    }

    /// Display name, falling back to the bare code.
    pub fn display<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Bookable window for one market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleWindow {
    pub disabled: BTreeSet<NaiveDate>,
    pub last_available: Option<NaiveDate>,
}

impl ScheduleWindow {
    /// Bookable iff on or before the last available date and not disabled.
    /// A window without a last date has nothing bookable.
    pub fn is_open(&self, date: NaiveDate) -> bool {
        match self.last_available {
            Some(last) => date <= last && !self.disabled.contains(&date),
            None => false,
        }
    }
}

/// Anything that can answer "is there a GoWild fare on this date?".
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn check_gowild_on_date(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<bool>;
}

/// Display names of `origin`'s destinations with availability on `date`,
/// in route-map order. Lookup errors count as unavailable.
pub async fn available_destinations(
    source: &dyn ScheduleSource,
    routes: &RouteMap,
    names: &AirportNames,
    origin: &str,
    date: NaiveDate,
) -> Vec<String> {
    let mut available = Vec::new();
    for destination in routes.destinations(origin) {
        match source.check_gowild_on_date(origin, destination, date).await {
            Ok(true) => available.push(names.display(destination).to_string()),
            Ok(false) => debug!(origin, %destination, %date, "no GoWild availability"),
            Err(e) => warn!(origin, %destination, "schedule lookup failed, skipping: {e}"),
        }
    }
    available
}

// Wire shapes for the two JSON endpoints.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RouteMapResponse {
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub market_details: Vec<MarketDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Market {
    pub from_station: String,
    #[serde(default)]
    pub to_stations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarketDetail {
    pub station_code: String,
    pub city_and_code: String,
}

impl RouteMapResponse {
    pub(crate) fn into_reference_data(self) -> (RouteMap, AirportNames) {
        let routes = self
            .markets
            .into_iter()
            .map(|m| (m.from_station, m.to_stations))
            .collect();
        let mut names = AirportNames::default();
        for detail in self.market_details {
            names.insert(detail.station_code, detail.city_and_code);
        }
        (routes, names)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduleResponse {
    pub calendar_selectable_days: Option<SelectableDays>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectableDays {
    #[serde(default)]
    pub disabled_dates: Vec<String>,
    pub last_available_date: Option<String>,
}

impl ScheduleResponse {
    pub(crate) fn into_window(self) -> ScheduleWindow {
        let Some(days) = self.calendar_selectable_days else {
            return ScheduleWindow::default();
        };
        ScheduleWindow {
            disabled: days
                .disabled_dates
                .iter()
                .filter_map(|d| loose_date(d))
                .collect(),
            last_available: days.last_available_date.as_deref().and_then(loose_date),
        }
    }
}

/// Dates arrive as `YYYY-MM-DD` with an optional time suffix, or `MM/DD/YYYY`.
pub(crate) fn loose_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScoutError;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct OnlyAtl;

    #[async_trait]
    impl ScheduleSource for OnlyAtl {
        async fn check_gowild_on_date(&self, _: &str, dest: &str, _: NaiveDate) -> Result<bool> {
            match dest {
                "ATL" => Ok(true),
                "MIA" => Err(ScoutError::Transient("503".into())),
                _ => Ok(false),
            }
        }
    }

    fn reference() -> (RouteMap, AirportNames) {
        let routes: RouteMap = [("JFK".to_string(), vec!["ATL".to_string(), "DEN".to_string()])]
            .into_iter()
            .collect();
        let mut names = AirportNames::default();
        names.insert("ATL", "Atlanta, GA (ATL)");
        names.insert("DEN", "Denver, CO (DEN)");
        (routes, names)
    }

    #[tokio::test]
    async fn test_available_destinations_keeps_only_open_ones() {
        let (routes, names) = reference();
        let got = available_destinations(&OnlyAtl, &routes, &names, "JFK", date("2025-07-15")).await;
        assert_eq!(got, vec!["Atlanta, GA (ATL)".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_errors_count_as_unavailable() {
        let mut routes = RouteMap::default();
        routes.insert("JFK", vec!["MIA".into(), "ATL".into(), "SJU".into()]);
        let got = available_destinations(&OnlyAtl, &routes, &AirportNames::default(), "JFK", date("2025-07-15")).await;
        assert_eq!(got, vec!["ATL".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_origin_is_empty() {
        let (routes, names) = reference();
        assert!(available_destinations(&OnlyAtl, &routes, &names, "XXX", date("2025-07-15"))
            .await
            .is_empty());
    }

    #[test]
    fn test_window_rules() {
        let window = ScheduleWindow {
            disabled: [date("2025-07-04")].into_iter().collect(),
            last_available: Some(date("2025-07-20")),
        };
        assert!(window.is_open(date("2025-07-15")));
        assert!(window.is_open(date("2025-07-20")));
        assert!(!window.is_open(date("2025-07-21")));
        assert!(!window.is_open(date("2025-07-04")));
        assert!(!ScheduleWindow::default().is_open(date("2025-07-15")));
    }

    #[test]
    fn test_schedule_response_parsing() {
        let raw = r#"{"calendarSelectableDays":{"disabledDates":["2025-07-04T00:00:00","07/05/2025","garbage"],"lastAvailableDate":"2025-07-20 00:00:00"}}"#;
        let window = serde_json::from_str::<ScheduleResponse>(raw).unwrap().into_window();
        assert_eq!(window.last_available, Some(date("2025-07-20")));
        assert_eq!(window.disabled.len(), 2);
        assert!(window.disabled.contains(&date("2025-07-05")));
    }

    #[test]
    fn test_route_map_response_parsing() {
        let raw = r#"{"markets":[{"fromStation":"JFK","toStations":["ATL","DEN"]},{"fromStation":"DEN","toStations":[]}],
                      "marketDetails":[{"stationCode":"ATL","cityAndCode":"Atlanta, GA (ATL)"}]}"#;
        let (routes, names) = serde_json::from_str::<RouteMapResponse>(raw)
            .unwrap()
            .into_reference_data();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes.destinations("JFK"), &["ATL".to_string(), "DEN".to_string()]);
        assert_eq!(names.display("ATL"), "Atlanta, GA (ATL)");
        assert_eq!(names.display("DEN"), "DEN");
    }
}
