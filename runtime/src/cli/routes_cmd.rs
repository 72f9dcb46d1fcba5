//! `gowild routes <ORIGIN>`: list destinations from the route map.

use crate::cli::output;
use crate::config::ScoutConfig;
use crate::routes::client::RouteClient;
use anyhow::{bail, Result};

/// Run the routes command.
pub async fn run(config: &ScoutConfig, origin: &str) -> Result<()> {
    let origin = origin.trim().to_ascii_uppercase();
    let client = RouteClient::new(config.urls.route_map.clone(), config.urls.schedule.clone());
    let (routes, names) = client.load_reference_data().await?;

    let destinations = routes.destinations(&origin);
    if destinations.is_empty() {
        bail!("no routes found from {origin}");
    }

    if output::is_json() {
        let items: Vec<serde_json::Value> = destinations
            .iter()
            .map(|code| {
                serde_json::json!({
                    "code": code,
                    "name": names.display(code),
                })
            })
            .collect();
        output::print_json(&serde_json::json!({
            "origin": origin,
            "origin_name": names.display(&origin),
            "total": destinations.len(),
            "destinations": items,
        }));
        return Ok(());
    }

    if !output::is_quiet() {
        eprintln!(
            "  {} destination(s) from {}:",
            destinations.len(),
            names.display(&origin)
        );
    }
    for code in destinations {
        println!("{code}  {}", names.display(code));
    }
    Ok(())
}
