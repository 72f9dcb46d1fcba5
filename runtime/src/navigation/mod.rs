//! Scripted navigation from the search URL to the results page.
//!
//! The redirect chase is an explicit state machine ([`PollState`]) fed one
//! URL sample at a time by [`RedirectTracker`]. Each terminal condition
//! (pattern reached, URL stalled, wall-clock budget, redirect budget) is
//! decided there and can be tested without a browser.

use crate::errors::{Result, ScoutError};
use crate::extraction::{self, Readiness};
use crate::model::SearchRequest;
use crate::pacing::{CancelSignal, DelayRange};
use crate::renderer::BrowserSession;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Path fragment of the fare results page.
pub const RESULTS_PATH: &str = "/Flight/Select";

/// Timing for one navigation. Every wait is a range, never a constant.
#[derive(Debug, Clone)]
pub struct NavigationTiming {
    /// Gap between URL samples while redirects are still happening.
    pub poll_interval: DelayRange,
    /// Shorter gap used to confirm a URL that did not change.
    pub stabilize_recheck: DelayRange,
    /// Wall-clock budget for the redirect chase.
    pub max_wait: Duration,
    /// Redirect budget for the redirect chase.
    pub max_redirects: u32,
    /// Pause after the URL settles, before looking at content.
    pub settle: DelayRange,
    /// Gap between content checks while waiting for the page to render.
    pub readiness_poll: DelayRange,
    /// How long to wait for recognizable content.
    pub readiness_budget: Duration,
    /// Extra pause when nothing recognizable rendered in time.
    pub readiness_fallback: DelayRange,
    /// Number of scroll gestures before the final read.
    pub scroll_steps: u32,
    /// Pixel range of each scroll gesture.
    pub scroll_pixels: (u32, u32),
    /// Pause after each scroll gesture.
    pub scroll_pause: DelayRange,
}

impl Default for NavigationTiming {
    fn default() -> Self {
        Self {
            poll_interval: DelayRange::from_secs(2, 4),
            stabilize_recheck: DelayRange::from_secs(1, 2),
            max_wait: Duration::from_secs(60),
            max_redirects: 10,
            settle: DelayRange::from_secs(5, 8),
            readiness_poll: DelayRange::from_millis(500, 1000),
            readiness_budget: Duration::from_secs(20),
            readiness_fallback: DelayRange::from_secs(3, 6),
            scroll_steps: 3,
            scroll_pixels: (200, 400),
            scroll_pause: DelayRange::from_secs(1, 2),
        }
    }
}

/// Where the redirect chase stands after the latest URL sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PollState {
    /// Still moving; sample again after a regular poll interval.
    Polling { redirects: u32 },
    /// URL unchanged once; confirm after a short recheck.
    Settling { redirects: u32 },
    /// The results page pattern matched.
    Reached { url: String, redirects: u32 },
    /// The URL stopped changing somewhere other than the results page.
    Stalled { url: String, redirects: u32 },
    /// The wall-clock budget ran out.
    TimedOut { url: String, redirects: u32 },
    /// The redirect budget ran out.
    RedirectLimit { url: String, redirects: u32 },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling { .. } | Self::Settling { .. })
    }

    pub fn final_url(&self) -> Option<&str> {
        match self {
            Self::Reached { url, .. }
            | Self::Stalled { url, .. }
            | Self::TimedOut { url, .. }
            | Self::RedirectLimit { url, .. } => Some(url),
            Self::Polling { .. } | Self::Settling { .. } => None,
        }
    }
}

/// Consumes URL samples and decides the next [`PollState`].
#[derive(Debug, Clone)]
pub struct RedirectTracker {
    pattern: String,
    max_redirects: u32,
    max_wait: Duration,
    redirects: u32,
    unchanged: u32,
    last_url: Option<String>,
}

impl RedirectTracker {
    pub fn new(pattern: &str, max_redirects: u32, max_wait: Duration) -> Self {
        Self {
            pattern: pattern.to_string(),
            max_redirects,
            max_wait,
            redirects: 0,
            unchanged: 0,
            last_url: None,
        }
    }

    pub fn redirects(&self) -> u32 {
        self.redirects
    }

    /// Feed one URL sample taken `elapsed` after navigation started.
    pub fn observe(&mut self, url: &str, elapsed: Duration) -> PollState {
        match self.last_url.as_deref() {
            Some(last) if last == url => self.unchanged += 1,
            Some(_) => {
                self.redirects += 1;
                self.unchanged = 0;
            }
            None => {}
        }
        self.last_url = Some(url.to_string());
        let redirects = self.redirects;

        if url.contains(&self.pattern) {
            return PollState::Reached {
                url: url.to_string(),
                redirects,
            };
        }
        if self.unchanged >= 2 {
            return PollState::Stalled {
                url: url.to_string(),
                redirects,
            };
        }
        if redirects >= self.max_redirects {
            return PollState::RedirectLimit {
                url: url.to_string(),
                redirects,
            };
        }
        if elapsed >= self.max_wait {
            return PollState::TimedOut {
                url: url.to_string(),
                redirects,
            };
        }
        if self.unchanged == 1 {
            PollState::Settling { redirects }
        } else {
            PollState::Polling { redirects }
        }
    }
}

/// What the sequencer hands to extraction.
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub final_url: String,
    pub page_content: String,
    pub termination: PollState,
    pub readiness: Option<Readiness>,
}

impl NavigationResult {
    pub fn reached_results(&self) -> bool {
        matches!(self.termination, PollState::Reached { .. })
    }
}

/// Build the parameterized search URL for a request.
pub fn search_url(base: &Url, request: &SearchRequest) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("o1", &request.origin)
        .append_pair("d1", &request.destination)
        .append_pair("dd1", &request.formatted_date())
        .append_pair("ADT", "1")
        .append_pair("mon", "true")
        .append_pair("promo", "")
        .append_pair("ftype", request.fare_type.as_param());
    url
}

/// Drives a session from the search URL to a readable results page.
#[derive(Debug, Clone)]
pub struct NavigationSequencer {
    search_base: Url,
    timing: NavigationTiming,
}

impl NavigationSequencer {
    pub fn new(search_base: Url, timing: NavigationTiming) -> Self {
        Self {
            search_base,
            timing,
        }
    }

    pub fn timing(&self) -> &NavigationTiming {
        &self.timing
    }

    /// Load the search URL, follow redirects, let the page settle, emulate
    /// a little reading, and return whatever content was reached.
    ///
    /// Not reaching the results page is only a warning; extraction decides
    /// what the page actually is.
    pub async fn navigate_to_results(
        &self,
        session: &mut dyn BrowserSession,
        request: &SearchRequest,
        cancel: &CancelSignal,
    ) -> Result<NavigationResult> {
        let url = search_url(&self.search_base, request);
        info!(%url, "navigating to search URL");
        session.goto(url.as_str()).await?;

        let termination = self.follow_redirects(session, cancel).await?;
        let final_url = termination.final_url().unwrap_or_default().to_string();
        match &termination {
            PollState::Reached { redirects, .. } => {
                info!(redirects, url = %final_url, "reached results page")
            }
            PollState::Stalled { redirects, .. } => warn!(
                redirects,
                url = %final_url,
                "URL settled outside the results page; extracting anyway"
            ),
            PollState::TimedOut { url, redirects } => {
                let timeout = ScoutError::NavigationTimeout {
                    url: url.clone(),
                    elapsed_secs: self.timing.max_wait.as_secs(),
                };
                warn!(redirects, "{timeout}; extracting current page")
            }
            PollState::RedirectLimit { redirects, .. } => warn!(
                redirects,
                "redirect budget exhausted; extracting current page"
            ),
            PollState::Polling { .. } | PollState::Settling { .. } => {}
        }

        let settle = cancel.pause_jittered(self.timing.settle).await?;
        debug!(settle_ms = settle.as_millis() as u64, "page settle wait done");

        let readiness = self.wait_for_content(session, cancel).await?;
        self.scroll_like_a_reader(session, cancel).await?;

        let page_content = session.content().await?;
        Ok(NavigationResult {
            final_url,
            page_content,
            termination,
            readiness,
        })
    }

    async fn follow_redirects(
        &self,
        session: &mut dyn BrowserSession,
        cancel: &CancelSignal,
    ) -> Result<PollState> {
        let start = Instant::now();
        let mut tracker = RedirectTracker::new(
            RESULTS_PATH,
            self.timing.max_redirects,
            self.timing.max_wait,
        );
        loop {
            let current = session.current_url().await?;
            let state = tracker.observe(&current, start.elapsed());
            debug!(url = %current, state = ?state, "redirect poll");
            match state {
                PollState::Polling { .. } => {
                    cancel.pause_jittered(self.timing.poll_interval).await?;
                }
                PollState::Settling { .. } => {
                    cancel.pause_jittered(self.timing.stabilize_recheck).await?;
                }
                terminal => return Ok(terminal),
            }
        }
    }

    async fn wait_for_content(
        &self,
        session: &mut dyn BrowserSession,
        cancel: &CancelSignal,
    ) -> Result<Option<Readiness>> {
        let start = Instant::now();
        loop {
            match session.content().await {
                Ok(html) => {
                    if let Some(found) = extraction::readiness(&html) {
                        debug!(readiness = ?found, "page content detected");
                        return Ok(Some(found));
                    }
                }
                Err(e) => debug!("page not readable yet: {e}"),
            }
            if start.elapsed() >= self.timing.readiness_budget {
                break;
            }
            cancel.pause_jittered(self.timing.readiness_poll).await?;
        }
        info!(
            budget_secs = self.timing.readiness_budget.as_secs(),
            "no recognizable content yet; waiting a little longer"
        );
        cancel.pause_jittered(self.timing.readiness_fallback).await?;
        Ok(None)
    }

    async fn scroll_like_a_reader(
        &self,
        session: &mut dyn BrowserSession,
        cancel: &CancelSignal,
    ) -> Result<()> {
        let (lo, hi) = self.timing.scroll_pixels;
        for _ in 0..self.timing.scroll_steps {
            session.scroll_by(scroll_distance(lo, hi)).await?;
            cancel.pause_jittered(self.timing.scroll_pause).await?;
        }
        Ok(())
    }
}

fn scroll_distance(lo: u32, hi: u32) -> u32 {
    if hi > lo {
        rand::thread_rng().gen_range(lo..=hi)
    } else {
        lo
    }
}
