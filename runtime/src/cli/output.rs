//! Output mode flags shared by every subcommand.
//!
//! The binary records the global `--json`/`--quiet`/`--verbose` flags in
//! `GOWILD_*` environment variables so commands can check them anywhere.

use serde::Serialize;

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

pub fn is_json() -> bool {
    flag("GOWILD_JSON")
}

pub fn is_quiet() -> bool {
    flag("GOWILD_QUIET")
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to encode JSON output: {e}"),
    }
}
