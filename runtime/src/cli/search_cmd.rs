//! `gowild search <ORIGIN> <DEST> <DATE>`: scrape fares for one flight date.

use crate::artifacts::ArtifactStore;
use crate::cli::output;
use crate::config::ScoutConfig;
use crate::model::{FareRecord, FareType, SearchRequest};
use crate::navigation::{NavigationSequencer, NavigationTiming};
use crate::renderer::chromium::ChromiumDriver;
use crate::retry::{ControllerState, RetryController, SearchReport};
use crate::search::BrowserSearch;
use crate::stealth::proxy::{DirectEgress, EgressProvider, RotatingEndpoint};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the search command.
pub async fn run(
    config: &ScoutConfig,
    origin: &str,
    destination: &str,
    date: &str,
    standard: bool,
) -> Result<()> {
    let fare_type = if standard {
        FareType::Standard
    } else {
        config.fare_type
    };
    let request = SearchRequest::new(
        &origin.to_ascii_uppercase(),
        &destination.to_ascii_uppercase(),
        date,
    )?
    .with_fare_type(fare_type);

    let egress: Arc<dyn EgressProvider> = match &config.proxy {
        Some(proxy) => {
            info!(%proxy, "using rotating proxy endpoint");
            Arc::new(RotatingEndpoint::new(proxy.clone()))
        }
        None => {
            info!("no proxy configured, connecting directly");
            Arc::new(DirectEgress)
        }
    };
    let artifacts = if config.save_artifacts {
        ArtifactStore::new(&config.artifact_dir)
    } else {
        ArtifactStore::disabled()
    };
    let runner = BrowserSearch::new(
        Arc::new(ChromiumDriver::new(config.chromium_path.clone(), config.headless)),
        egress,
        NavigationSequencer::new(config.urls.search.clone(), NavigationTiming::default()),
    )
    .with_user_agents(config.user_agents.clone())
    .with_window_size(config.window_size)
    .with_artifacts(artifacts)
    .with_attempt_timeout(config.attempt_timeout);

    let controller = RetryController::new(runner, config.max_retries);
    let cancel = controller.cancel_signal().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping search");
            cancel.cancel();
        }
    });

    if !output::is_quiet() && !output::is_json() {
        eprintln!(
            "  Searching {request} (up to {} attempt(s))...",
            config.max_retries
        );
    }
    let report = controller.search(&request).await;
    let (status, fares, message) = summarize(&request, &report)?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "origin": request.origin,
            "destination": request.destination,
            "date": request.date.to_string(),
            "fare_type": request.fare_type.as_param(),
            "status": status,
            "attempts": report.attempts,
            "fares": fares,
            "message": message,
        }));
        return Ok(());
    }

    match message {
        Some(reason) => println!("No flights for {request}: {reason}"),
        None if fares.is_empty() => println!("No fares listed for {request}."),
        None => {
            println!("Fares for {request}:");
            for fare in fares {
                println!("- {fare}");
            }
        }
    }
    Ok(())
}

/// Status label, fares and empty-result message for a finished search.
/// A search that ran out of attempts is an error.
fn summarize<'a>(
    request: &SearchRequest,
    report: &'a SearchReport,
) -> Result<(&'static str, &'a [FareRecord], Option<&'a str>)> {
    match &report.state {
        ControllerState::Succeeded(fares) => Ok(("success", fares.as_slice(), None)),
        ControllerState::ExhaustedEmpty(reason) => Ok(("empty", &[], Some(reason.as_str()))),
        ControllerState::ExhaustedFailed(reason) => bail!(
            "no data for {request} after {} attempt(s): {reason}",
            report.attempts
        ),
        ControllerState::Attempting(n) => {
            bail!("search for {request} stopped during attempt {n}")
        }
    }
}
