//! CLI subcommand implementations for the `gowild` binary.

pub mod available_cmd;
pub mod doctor;
pub mod logging;
pub mod output;
pub mod routes_cmd;
pub mod search_cmd;
