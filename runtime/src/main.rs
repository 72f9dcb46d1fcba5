// Copyright 2026 GoWild Scout Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use gowild_scout::cli;
use gowild_scout::config::ScoutConfig;
use gowild_scout::stealth::proxy::ProxyIdentity;

#[derive(Parser)]
#[command(
    name = "gowild",
    about = "GoWild Scout: fare and route availability lookups",
    version,
    after_help = "Run 'gowild <command> --help' for details on each command.\nSettings can also come from GOWILD_* environment variables."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape fares for one origin, destination and date
    Search {
        /// Origin airport code (e.g. "JFK")
        origin: String,
        /// Destination airport code (e.g. "ATL")
        destination: String,
        /// Travel date, YYYY-MM-DD
        date: String,
        /// Search standard fares instead of Discount Den
        #[arg(long)]
        standard: bool,
        /// Maximum number of attempts
        #[arg(long)]
        max_retries: Option<u32>,
        /// Rotating proxy endpoint (host:port)
        #[arg(long, conflicts_with = "no_proxy")]
        proxy: Option<String>,
        /// Connect directly even if GOWILD_PROXY is set
        #[arg(long)]
        no_proxy: bool,
        /// Show the browser window
        #[arg(long)]
        visible: bool,
    },
    /// List destinations served from an origin
    Routes {
        /// Origin airport code
        origin: String,
    },
    /// List destinations with GoWild availability on a date
    Available {
        /// Origin airport code
        origin: String,
        /// Travel date, YYYY-MM-DD
        date: String,
    },
    /// Check Chromium and proxy setup
    Doctor {
        /// Proxy endpoint to probe (host:port)
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("GOWILD_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("GOWILD_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("GOWILD_VERBOSE", "1");
    }
    cli::logging::init(cli.verbose, cli.quiet, cli.json);

    let result = run(cli.command).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !cli::output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}

async fn run(command: Commands) -> Result<()> {
    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "gowild", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = ScoutConfig::from_env()?;
    match command {
        Commands::Search {
            origin,
            destination,
            date,
            standard,
            max_retries,
            proxy,
            no_proxy,
            visible,
        } => {
            if let Some(n) = max_retries {
                config.max_retries = n.max(1);
            }
            if no_proxy {
                config.proxy = None;
            } else if let Some(raw) = proxy {
                config.proxy = Some(ProxyIdentity::parse(&raw)?);
            }
            if visible {
                config.headless = false;
            }
            cli::search_cmd::run(&config, &origin, &destination, &date, standard).await
        }
        Commands::Routes { origin } => cli::routes_cmd::run(&config, &origin).await,
        Commands::Available { origin, date } => {
            cli::available_cmd::run(&config, &origin, &date).await
        }
        Commands::Doctor { proxy } => {
            if let Some(raw) = proxy {
                config.proxy = Some(ProxyIdentity::parse(&raw)?);
            }
            cli::doctor::run(&config).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}
