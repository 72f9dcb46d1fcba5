//! Error taxonomy for fare searches and route lookups.
//!
//! Every failure inside a search attempt is converted into an
//! [`AttemptOutcome`] at the attempt boundary; nothing here escapes the
//! retry controller.

use crate::model::AttemptOutcome;
use thiserror::Error;

/// All errors raised by the session driver, navigation, extraction and
/// the route client.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("session init failed: {0}")]
    SessionInit(String),

    #[error("navigation did not settle within {elapsed_secs}s (last url: {url})")]
    NavigationTimeout { url: String, elapsed_secs: u64 },

    #[error("bot challenge detected")]
    ChallengeDetected,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("search cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Whether a retry with a fresh connection could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transient(_) | Self::Http(_) | Self::Io(_) | Self::NavigationTimeout { .. }
        )
    }

    /// Convert into the outcome the retry controller consumes.
    pub fn into_outcome(self) -> AttemptOutcome {
        match self {
            Self::ChallengeDetected => AttemptOutcome::ChallengeDetected,
            e if e.is_transient() => AttemptOutcome::TransientError(e.to_string()),
            e => AttemptOutcome::FatalError(e.to_string()),
        }
    }
}
