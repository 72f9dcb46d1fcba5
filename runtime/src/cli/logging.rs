//! Tracing subscriber setup. Logs go to stderr so stdout stays clean for
//! results and JSON.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init(verbose: bool, quiet: bool, json: bool) {
    let default_directive = if verbose {
        "gowild_scout=debug,gowild=debug"
    } else if quiet {
        "gowild_scout=warn,gowild=warn"
    } else {
        "gowild_scout=info,gowild=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
