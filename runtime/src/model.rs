//! Core search types: requests, fare records and per-attempt outcomes.

use crate::errors::{Result, ScoutError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Which fare family to request from the search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FareType {
    /// Member fares (`ftype=DD`).
    #[default]
    DiscountDen,
    /// Public fares (`ftype=STD`).
    Standard,
}

impl FareType {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::DiscountDen => "DD",
            Self::Standard => "STD",
        }
    }
}

/// One fare search: a single one-way itinerary for one adult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub fare_type: FareType,
}

impl SearchRequest {
    /// Build a request from raw strings.
    ///
    /// Codes must be non-empty uppercase tokens; the date must be
    /// `YYYY-MM-DD`. Codes are not checked against the route map.
    pub fn new(origin: &str, destination: &str, date: &str) -> Result<Self> {
        Ok(Self {
            origin: validate_code(origin)?,
            destination: validate_code(destination)?,
            date: parse_iso_date(date)?,
            fare_type: FareType::default(),
        })
    }

    pub fn with_fare_type(mut self, fare_type: FareType) -> Self {
        self.fare_type = fare_type;
        self
    }

    /// The date as the search page expects it, e.g. `Jun 16, 2025`.
    pub fn formatted_date(&self) -> String {
        format_search_date(self.date)
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} on {}", self.origin, self.destination, self.date)
    }
}

fn validate_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ScoutError::Config("airport code must not be empty".into()));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ScoutError::Config(format!(
            "airport code must be an uppercase token: {code:?}"
        )));
    }
    Ok(code.to_string())
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ScoutError::Config(format!("invalid date {raw:?}, expected YYYY-MM-DD: {e}")))
}

/// `Mon DD, YYYY` with a zero-padded day, built from explicit fields.
pub fn format_search_date(date: NaiveDate) -> String {
    format!(
        "{} {:02}, {}",
        MONTH_ABBREVIATIONS[date.month0() as usize],
        date.day(),
        date.year()
    )
}

/// One priced product offering for the searched itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRecord {
    pub fare_class: String,
    pub branded_fare_class: String,
    pub total_price: Option<f64>,
    pub is_sold_out: bool,
}

impl fmt::Display for FareRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sold_out {
            return write!(f, "{} ({}): SOLD OUT", self.branded_fare_class, self.fare_class);
        }
        match self.total_price {
            Some(price) => write!(
                f,
                "{} ({}): ${price:.2}",
                self.branded_fare_class, self.fare_class
            ),
            None => write!(f, "{} ({}): price unavailable", self.branded_fare_class, self.fare_class),
        }
    }
}

/// Classification of a single search attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The results page carried a fare list.
    Success(Vec<FareRecord>),
    /// The site answered authoritatively that nothing is on sale.
    Empty(String),
    /// A bot-verification interstitial was served instead of results.
    ChallengeDetected,
    /// Network or connection trouble; worth another attempt.
    TransientError(String),
    /// Unrecognized page shape or malformed payload.
    FatalError(String),
}

impl AttemptOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Empty(_) => "empty",
            Self::ChallengeDetected => "challenge",
            Self::TransientError(_) => "transient_error",
            Self::FatalError(_) => "fatal_error",
        }
    }
}
