//! Retry/rotation controller for one overall search.
//!
//! Each attempt is fully independent: a fresh session, a fresh evasion
//! profile and a new outbound connection. Only the attempt counter carries
//! over. The transition rules live in [`advance`] so they can be checked
//! without running anything.

use crate::model::{AttemptOutcome, FareRecord, SearchRequest};
use crate::pacing::{CancelSignal, DelayRange};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Runs one complete search attempt and classifies it.
#[async_trait]
pub trait SearchAttempt: Send + Sync {
    async fn attempt(
        &self,
        request: &SearchRequest,
        attempt: u32,
        cancel: &CancelSignal,
    ) -> AttemptOutcome;
}

/// Waits between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// After a challenge; long enough for the egress IP to rotate.
    pub challenge: DelayRange,
    /// After a connection or page failure.
    pub transient: DelayRange,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            challenge: DelayRange::from_secs(15, 25),
            transient: DelayRange::from_secs(5, 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Challenge,
    Transient,
}

impl BackoffPolicy {
    pub fn range(&self, kind: BackoffKind) -> DelayRange {
        match kind {
            BackoffKind::Challenge => self.challenge,
            BackoffKind::Transient => self.transient,
        }
    }
}

/// Controller state for one search request.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    /// About to run attempt `n` (1-based).
    Attempting(u32),
    Succeeded(Vec<FareRecord>),
    /// The site said there is nothing to sell. Authoritative, not retried.
    ExhaustedEmpty(String),
    /// Attempts ran out, or the search was cancelled.
    ExhaustedFailed(String),
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

/// Result of applying one attempt outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub next: ControllerState,
    /// Wait to take before `next` when it is another attempt.
    pub backoff: Option<BackoffKind>,
}

/// Transition rule: attempt `attempt` of `max_attempts` produced `outcome`.
pub fn advance(attempt: u32, max_attempts: u32, outcome: AttemptOutcome) -> Advance {
    let retry_or_fail = |kind: BackoffKind, detail: String| {
        if attempt < max_attempts {
            Advance {
                next: ControllerState::Attempting(attempt + 1),
                backoff: Some(kind),
            }
        } else {
            Advance {
                next: ControllerState::ExhaustedFailed(detail),
                backoff: None,
            }
        }
    };

    match outcome {
        AttemptOutcome::Success(fares) => Advance {
            next: ControllerState::Succeeded(fares),
            backoff: None,
        },
        AttemptOutcome::Empty(message) => Advance {
            next: ControllerState::ExhaustedEmpty(message),
            backoff: None,
        },
        AttemptOutcome::ChallengeDetected => retry_or_fail(
            BackoffKind::Challenge,
            format!("challenge still served after {attempt} attempt(s)"),
        ),
        AttemptOutcome::TransientError(detail) | AttemptOutcome::FatalError(detail) => {
            retry_or_fail(BackoffKind::Transient, detail)
        }
    }
}

/// Everything the caller needs after a search finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    /// Always a terminal state.
    pub state: ControllerState,
    pub attempts: u32,
    /// Waits actually taken between attempts, in order.
    pub backoffs: Vec<Duration>,
}

impl SearchReport {
    pub fn fares(&self) -> Option<&[FareRecord]> {
        match &self.state {
            ControllerState::Succeeded(fares) => Some(fares),
            _ => None,
        }
    }

    pub fn into_fares(self) -> Option<Vec<FareRecord>> {
        match self.state {
            ControllerState::Succeeded(fares) => Some(fares),
            _ => None,
        }
    }

    /// Why there is no data, when there is none.
    pub fn no_data_reason(&self) -> Option<&str> {
        match &self.state {
            ControllerState::ExhaustedEmpty(reason) | ControllerState::ExhaustedFailed(reason) => {
                Some(reason)
            }
            _ => None,
        }
    }
}

/// Drives attempts until success, an authoritative empty, or exhaustion.
pub struct RetryController<A> {
    runner: A,
    max_attempts: u32,
    backoff: BackoffPolicy,
    cancel: CancelSignal,
}

impl<A: SearchAttempt> RetryController<A> {
    pub fn new(runner: A, max_attempts: u32) -> Self {
        Self {
            runner,
            max_attempts: max_attempts.max(1),
            backoff: BackoffPolicy::default(),
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn runner(&self) -> &A {
        &self.runner
    }

    /// Run the search. Never fails: the report always ends in a terminal state.
    pub async fn search(&self, request: &SearchRequest) -> SearchReport {
        let mut state = ControllerState::Attempting(1);
        let mut attempts = 0;
        let mut backoffs = Vec::new();

        while let ControllerState::Attempting(n) = state {
            if self.cancel.is_cancelled() {
                state = ControllerState::ExhaustedFailed("search cancelled".into());
                break;
            }

            info!(attempt = n, max = self.max_attempts, %request, "starting search attempt");
            let outcome = self.runner.attempt(request, n, &self.cancel).await;
            attempts = n;
            info!(attempt = n, outcome = outcome.kind(), "attempt finished");

            let step = advance(n, self.max_attempts, outcome);
            if let (Some(kind), ControllerState::Attempting(_)) = (step.backoff, &step.next) {
                if self.cancel.is_cancelled() {
                    state = ControllerState::ExhaustedFailed("search cancelled".into());
                    break;
                }
                let delay = self.backoff.range(kind).sample();
                warn!(
                    attempt = n,
                    backoff = ?kind,
                    wait_ms = delay.as_millis() as u64,
                    "retrying with a fresh session"
                );
                if self.cancel.pause(delay).await.is_err() {
                    state = ControllerState::ExhaustedFailed("search cancelled".into());
                    break;
                }
                backoffs.push(delay);
            }
            state = step.next;
        }

        match &state {
            ControllerState::Succeeded(fares) => {
                info!(attempts, fares = fares.len(), "search succeeded")
            }
            ControllerState::ExhaustedEmpty(reason) => info!(attempts, %reason, "no fares on sale"),
            ControllerState::ExhaustedFailed(reason) => {
                warn!(attempts, %reason, "search gave up without data")
            }
            ControllerState::Attempting(_) => {}
        }

        SearchReport {
            state,
            attempts,
            backoffs,
        }
    }
}
