//! Locating and decoding the `var model = {...};` payload.
//!
//! The object is cut out with a brace-balanced scan that understands JSON
//! strings, so nested objects and `};` inside string values don't end it
//! early.

use crate::errors::{Result, ScoutError};
use crate::model::{AttemptOutcome, FareRecord};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

const DEFAULT_EMPTY_MESSAGE: &str = "No flights found on this date.";

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"var\s+model\s*=\s*").expect("valid regex"))
}

/// Find and decode the model object embedded in a `<script>` tag.
///
/// `Ok(None)` means no script assigns `model`. Scripts whose object is
/// unbalanced, unterminated or not JSON are skipped; `Err` carries the first
/// such failure when no later script parses.
pub fn find_model(html: &str) -> Result<Option<Value>> {
    if !assignment_regex().is_match(html) {
        return Ok(None);
    }

    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| ScoutError::Parse(format!("invalid script selector: {e:?}")))?;

    let mut first_error = None;
    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let Some(m) = assignment_regex().find(&text) else {
            continue;
        };
        let parsed = balanced_object(&text, m.end()).and_then(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| ScoutError::Parse(format!("model is not valid JSON: {e}")))
        });
        match parsed {
            Ok(value) => return Ok(Some(value)),
            Err(e) => {
                debug!("skipping unparseable model script: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

/// Return the outermost balanced `{...}` starting at `from` (after
/// whitespace), which must be followed by `;`.
pub fn balanced_object(text: &str, from: usize) -> Result<&str> {
    let rest = text
        .get(from..)
        .ok_or_else(|| ScoutError::Parse("model offset out of range".into()))?;
    let lead = rest.len() - rest.trim_start().len();
    let start = from + lead;
    if !text[start..].starts_with('{') {
        return Err(ScoutError::Parse("model assignment is not an object".into()));
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    if !text[end..].trim_start().starts_with(';') {
                        return Err(ScoutError::Parse(
                            "model object is not terminated by ';'".into(),
                        ));
                    }
                    return Ok(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    Err(ScoutError::Parse("model object has unbalanced braces".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FareCell {
    #[serde(default)]
    fare_class_input: Option<String>,
    #[serde(default)]
    branded_fare_class: Option<String>,
    #[serde(default)]
    price_specification: Option<PriceSpecification>,
    #[serde(default)]
    is_sold_out: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceSpecification {
    #[serde(default)]
    total_price: Option<f64>,
}

impl From<FareCell> for FareRecord {
    fn from(cell: FareCell) -> Self {
        Self {
            fare_class: cell.fare_class_input.unwrap_or_else(|| "N/A".into()),
            branded_fare_class: cell.branded_fare_class.unwrap_or_else(|| "N/A".into()),
            total_price: cell.price_specification.and_then(|p| p.total_price),
            is_sold_out: cell.is_sold_out.unwrap_or(false),
        }
    }
}

/// Interpret a decoded model: `journey.isSuccess` then `journey.fareTensor.cells`.
pub fn outcome_from_model(model: &Value) -> AttemptOutcome {
    match fares_from_model(model) {
        Ok(outcome) => outcome,
        Err(e) => e.into_outcome(),
    }
}

fn fares_from_model(model: &Value) -> Result<AttemptOutcome> {
    let journey = model
        .get("journey")
        .filter(|j| j.is_object())
        .ok_or_else(|| ScoutError::Parse("model has no journey object".into()))?;

    if !journey
        .get("isSuccess")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let message = journey
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_EMPTY_MESSAGE);
        return Ok(AttemptOutcome::Empty(message.to_string()));
    }

    let cells = match journey.pointer("/fareTensor/cells") {
        None | Some(Value::Null) => return Ok(AttemptOutcome::Success(Vec::new())),
        Some(cells) => cells.clone(),
    };
    let cells: Vec<FareCell> = serde_json::from_value(cells)
        .map_err(|e| ScoutError::Parse(format!("fare cells are malformed: {e}")))?;
    Ok(AttemptOutcome::Success(
        cells.into_iter().map(FareRecord::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_braces_and_semicolon_in_string() {
        let script = r#"var model = {"journey":{"isSuccess":true,"note":"odd };value","fareTensor":{"cells":[{"fareClassInput":"Z","meta":{"deep":{"x":1}}}]}}}; var other = {};"#;
        let m = assignment_regex().find(script).unwrap();
        let raw = balanced_object(script, m.end()).unwrap();
        assert!(raw.ends_with("}}}"));
        let value: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(value["journey"]["note"], "odd };value");
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let script = r#"var model = {"journey":{"message":"say \"hi\" };"}};"#;
        let m = assignment_regex().find(script).unwrap();
        let raw = balanced_object(script, m.end()).unwrap();
        let value: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(value["journey"]["message"], "say \"hi\" };");
    }

    #[test]
    fn test_full_page_with_tricky_model_parses() {
        let html = r#"<html><script src="/x.js"></script><script>
            window.x = 1;
            var   model =  {"journey":{"isSuccess":true,"banner":"Deals {today}; book now };","fareTensor":{"cells":[
              {"fareClassInput":"Z","brandedFareClass":"GoWild","priceSpecification":{"totalPrice":0.0,"taxes":{"us":5.6}},"isSoldOut":false}
            ]}}};
        </script></html>"#;
        match outcome_from_model(&find_model(html).unwrap().unwrap()) {
            AttemptOutcome::Success(fares) => {
                assert_eq!(fares.len(), 1);
                assert_eq!(fares[0].fare_class, "Z");
                assert_eq!(fares[0].total_price, Some(0.0));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_and_unterminated_are_parse_errors() {
        assert!(balanced_object(r#"var model = {"a":{"b":1};"#, 12).is_err());
        assert!(balanced_object(r#"var model = {"a":1} var b"#, 12).is_err());
        assert!(balanced_object(r#"var model = [1,2];"#, 12).is_err());
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let html = "<script>var model = {journey: {isSuccess: true}};</script>";
        let outcome = super::super::extract(html);
        assert!(matches!(outcome, AttemptOutcome::FatalError(_)));
    }

    #[test]
    fn test_missing_journey_is_fatal() {
        let model: Value = serde_json::json!({"other": 1});
        assert!(matches!(outcome_from_model(&model), AttemptOutcome::FatalError(_)));
    }

    #[test]
    fn test_unsuccessful_journey_defaults_message() {
        let model: Value = serde_json::json!({"journey": {"isSuccess": false}});
        assert_eq!(
            outcome_from_model(&model),
            AttemptOutcome::Empty(DEFAULT_EMPTY_MESSAGE.into())
        );
    }

    #[test]
    fn test_cell_defaults() {
        let model: Value = serde_json::json!({"journey": {"isSuccess": true, "fareTensor": {"cells": [{}]}}});
        assert_eq!(
            outcome_from_model(&model),
            AttemptOutcome::Success(vec![FareRecord {
                fare_class: "N/A".into(),
                branded_fare_class: "N/A".into(),
                total_price: None,
                is_sold_out: false,
            }])
        );
    }

    #[test]
    fn test_later_script_wins_over_broken_one() {
        let html = r#"<script>var model = {"journey":</script>
            <script>var model = {"journey":{"isSuccess":true}};</script>"#;
        let model = find_model(html).unwrap().unwrap();
        assert_eq!(model["journey"]["isSuccess"], Value::Bool(true));

        let only_broken = r#"<script>var model = {"journey":</script>"#;
        assert!(matches!(find_model(only_broken), Err(ScoutError::Parse(_))));
    }

    #[test]
    fn test_no_model_returns_none() {
        assert!(find_model("<script>var modelX = 1;</script>").unwrap().is_none());
        assert!(find_model("<p>var model = {}; in prose</p>").unwrap().is_none());
    }
}
