//! HTTP client for the route-map and schedule JSON endpoints.
//!
//! A plain client: no evasion and no retries. Failures surface as
//! `ScoutError::Http` or `ScoutError::Json`.

use super::{AirportNames, RouteMap, RouteMapResponse, ScheduleResponse, ScheduleSource, ScheduleWindow};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_ROUTE_MAP_URL: &str = "https://booking.flyfrontier.com/Resource/GetRouteMap";
pub const DEFAULT_SCHEDULE_URL: &str = "https://booking.flyfrontier.com/Flight/RetrieveSchedule";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct RouteClient {
    client: reqwest::Client,
    route_map_url: Url,
    schedule_url: Url,
}

impl RouteClient {
    pub fn new(route_map_url: Url, schedule_url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(crate::stealth::DEFAULT_USER_AGENTS[0])
            .build()
            .unwrap_or_default();
        Self {
            client,
            route_map_url,
            schedule_url,
        }
    }

    /// Fetch the route map and airport names. Call once per run.
    pub async fn load_reference_data(&self) -> Result<(RouteMap, AirportNames)> {
        let body: RouteMapResponse = self
            .client
            .get(self.route_map_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let (routes, names) = body.into_reference_data();
        info!(origins = routes.len(), airports = names.len(), "route map loaded");
        Ok((routes, names))
    }

    /// Bookable window for one market.
    pub async fn fetch_schedule(&self, origin: &str, destination: &str) -> Result<ScheduleWindow> {
        let mut url = self.schedule_url.clone();
        url.query_pairs_mut()
            .append_pair("calendarSelectableDays.Origin", origin)
            .append_pair("calendarSelectableDays.Destination", destination);

        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let window = serde_json::from_str::<ScheduleResponse>(&text)?.into_window();
        debug!(
            origin,
            destination,
            disabled = window.disabled.len(),
            last = ?window.last_available,
            "schedule fetched"
        );
        Ok(window)
    }
}

#[async_trait]
impl ScheduleSource for RouteClient {
    async fn check_gowild_on_date(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        Ok(self.fetch_schedule(origin, destination).await?.is_open(date))
    }
}
