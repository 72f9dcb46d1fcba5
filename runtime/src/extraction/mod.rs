//! Page classification: fares, "no flights", challenge, or unknown.
//!
//! `extract` is a pure function of page content. Order matters: an
//! embedded model always wins over any marker phrase on the same page.

pub mod model;

use crate::model::AttemptOutcome;

/// Phrases the site shows when a route has nothing on sale.
pub const NO_FLIGHTS_PHRASES: &[&str] = &[
    "no direct flights are available",
    "no direct flights",
    "no flights available",
    "no flights found",
    "no results found",
];

/// Phrases that mark a bot-verification interstitial.
pub const CHALLENGE_PHRASES: &[&str] = &[
    "captcha",
    "security check",
    "verify you are human",
    "prove you are not a robot",
    "recaptcha",
];

/// Generic results-page vocabulary used to decide the page has rendered.
pub const FLIGHT_CONTENT_INDICATORS: &[&str] = &[
    "flight number",
    "departure time",
    "arrival time",
    "select flight",
    "book flight",
    "fare",
    "price",
    "outbound",
    "return",
    "passenger",
    "traveler",
];

/// Indicators needed before generic content counts as rendered.
const MIN_CONTENT_INDICATORS: usize = 3;

/// Classify page content into an attempt outcome.
pub fn extract(content: &str) -> AttemptOutcome {
    match model::find_model(content) {
        Ok(Some(value)) => return model::outcome_from_model(&value),
        Ok(None) => {}
        Err(e) => return e.into_outcome(),
    }

    let lowered = content.to_lowercase();
    if let Some(phrase) = first_match(&lowered, NO_FLIGHTS_PHRASES) {
        return AttemptOutcome::Empty(format!("site reported \"{phrase}\""));
    }
    if first_match(&lowered, CHALLENGE_PHRASES).is_some() {
        return AttemptOutcome::ChallengeDetected;
    }
    AttemptOutcome::FatalError("unrecognized page shape: no model, marker or challenge".into())
}

fn first_match<'a>(haystack: &str, phrases: &[&'a str]) -> Option<&'a str> {
    phrases.iter().copied().find(|p| haystack.contains(p))
}

/// What made a page look ready while waiting for it to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    ModelPresent,
    NoFlights,
    Challenge,
    FlightContent(Vec<&'static str>),
}

/// Cheap check used while polling: has anything meaningful rendered yet?
pub fn readiness(content: &str) -> Option<Readiness> {
    let lowered = content.to_lowercase();
    if lowered.contains("var model") {
        return Some(Readiness::ModelPresent);
    }
    if first_match(&lowered, NO_FLIGHTS_PHRASES).is_some() || lowered.contains("try different dates")
    {
        return Some(Readiness::NoFlights);
    }
    if first_match(&lowered, CHALLENGE_PHRASES).is_some() {
        return Some(Readiness::Challenge);
    }
    let found: Vec<&'static str> = FLIGHT_CONTENT_INDICATORS
        .iter()
        .copied()
        .filter(|i| lowered.contains(i))
        .collect();
    if found.len() >= MIN_CONTENT_INDICATORS {
        return Some(Readiness::FlightContent(found));
    }
    None
}
