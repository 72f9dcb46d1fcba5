//! Randomized waits and cooperative cancellation.
//!
//! Every pause in a search is drawn from a range so the traffic has no
//! fixed timing signature, and every pause races a [`CancelSignal`] so a
//! caller can abandon a search without waiting out a backoff.

use crate::errors::{Result, ScoutError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Inclusive range a randomized wait is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    /// Draw a uniformly distributed duration from the range.
    pub fn sample(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        if hi <= lo {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    pub fn contains(&self, d: Duration) -> bool {
        d >= self.min && d <= self.max
    }
}

/// Shared cancellation flag for one search.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Sleep for `duration` unless the signal fires first.
    pub async fn pause(&self, duration: Duration) -> Result<()> {
        if self.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancelled() => Err(ScoutError::Cancelled),
        }
    }

    /// Resolves once the signal fires; immediately if it already has.
    pub async fn cancelled(&self) {
        wait_for_cancel(self.tx.subscribe()).await
    }

    /// Sleep for a duration sampled from `range`; returns what was slept.
    pub async fn pause_jittered(&self, range: DelayRange) -> Result<Duration> {
        let d = range.sample();
        self.pause(d).await?;
        Ok(d)
    }
}

async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    loop {
        let flag = *rx.borrow_and_update();
        if flag {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}
