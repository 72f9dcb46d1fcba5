//! `gowild available <ORIGIN> <DATE>`: destinations with GoWild seats on a date.

use crate::cli::output;
use crate::config::ScoutConfig;
use crate::model::parse_iso_date;
use crate::routes::available_destinations;
use crate::routes::client::RouteClient;
use anyhow::{bail, Result};

/// Run the available command.
pub async fn run(config: &ScoutConfig, origin: &str, date: &str) -> Result<()> {
    let origin = origin.trim().to_ascii_uppercase();
    let date = parse_iso_date(date)?;
    let client = RouteClient::new(config.urls.route_map.clone(), config.urls.schedule.clone());
    let (routes, names) = client.load_reference_data().await?;

    let candidates = routes.destinations(&origin).len();
    if candidates == 0 {
        bail!("no routes found from {origin}");
    }
    if !output::is_quiet() && !output::is_json() {
        eprintln!("  Checking {candidates} destination(s) from {origin} on {date}...");
    }

    let available = available_destinations(&client, &routes, &names, &origin, date).await;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "origin": origin,
            "date": date.to_string(),
            "checked": candidates,
            "available": available,
        }));
        return Ok(());
    }

    if available.is_empty() {
        println!("No GoWild availability from {origin} on {date}.");
    } else {
        for name in &available {
            println!("{name}");
        }
    }
    Ok(())
}
