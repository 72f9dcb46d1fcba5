//! Environment readiness check.

use crate::cli::output;
use crate::config::ScoutConfig;
use crate::renderer::chromium::{find_chromium, ChromiumDriver};
use crate::stealth::probe::{probe_egress, DEFAULT_PROBE_URL};
use crate::stealth::EvasionProfile;
use anyhow::Result;

/// Check Chromium availability and, when a proxy is configured, which
/// egress IP it hands out.
pub async fn run(config: &ScoutConfig) -> Result<()> {
    let chromium = config
        .chromium_path
        .clone()
        .filter(|p| p.exists())
        .or_else(find_chromium);

    let mut proxy_origin = None;
    let mut proxy_error = None;
    if let (Some(_), Some(proxy)) = (&chromium, &config.proxy) {
        let driver = ChromiumDriver::new(chromium.clone(), true);
        let profile = EvasionProfile::draw(&config.user_agents, config.window_size);
        match probe_egress(&driver, &profile, Some(proxy), DEFAULT_PROBE_URL).await {
            Ok(report) => proxy_origin = Some(report.origin),
            Err(e) => proxy_error = Some(e.to_string()),
        }
    }

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "proxy": config.proxy.as_ref().map(|p| p.to_string()),
            "proxy_origin": proxy_origin,
            "proxy_error": proxy_error,
            "artifact_dir": config.artifact_dir.display().to_string(),
            "ready": chromium.is_some() && proxy_error.is_none(),
        }));
        return Ok(());
    }

    println!("GoWild Scout Doctor");
    println!("===================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set GOWILD_CHROMIUM_PATH or install Chrome."),
    }

    match (&config.proxy, &proxy_origin, &proxy_error) {
        (None, _, _) => println!("[--] No proxy configured (GOWILD_PROXY); searches connect directly"),
        (Some(proxy), Some(origin), _) => {
            println!("[OK] Proxy {proxy} reachable, egress IP {origin}")
        }
        (Some(proxy), None, Some(err)) => println!("[!!] Proxy {proxy} probe failed: {err}"),
        (Some(proxy), None, None) => println!("[??] Proxy {proxy} not probed (no Chromium)"),
    }

    println!("[--] Artifacts: {}", config.artifact_dir.display());
    if !config.save_artifacts {
        println!("     (saving disabled)");
    }

    println!();
    if chromium.is_some() && proxy_error.is_none() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
