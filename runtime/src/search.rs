//! One browser-backed search attempt: profile, session, navigate, extract.

use crate::artifacts::ArtifactStore;
use crate::errors::{Result, ScoutError};
use crate::extraction;
use crate::model::{AttemptOutcome, SearchRequest};
use crate::navigation::NavigationSequencer;
use crate::pacing::CancelSignal;
use crate::renderer::{BrowserSession, ScopedSession, SessionDriver};
use crate::retry::SearchAttempt;
use crate::stealth::proxy::EgressProvider;
use crate::stealth::{EvasionProfile, UserAgentPool, WindowSize};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Runs attempts against a real (or scripted) browser.
pub struct BrowserSearch {
    driver: Arc<dyn SessionDriver>,
    egress: Arc<dyn EgressProvider>,
    user_agents: UserAgentPool,
    window_size: WindowSize,
    sequencer: NavigationSequencer,
    artifacts: ArtifactStore,
    attempt_timeout: Duration,
}

impl BrowserSearch {
    pub fn new(
        driver: Arc<dyn SessionDriver>,
        egress: Arc<dyn EgressProvider>,
        sequencer: NavigationSequencer,
    ) -> Self {
        Self {
            driver,
            egress,
            user_agents: UserAgentPool::default(),
            window_size: WindowSize::default(),
            sequencer,
            artifacts: ArtifactStore::disabled(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_user_agents(mut self, pool: UserAgentPool) -> Self {
        self.user_agents = pool;
        self
    }

    pub fn with_window_size(mut self, size: WindowSize) -> Self {
        self.window_size = size;
        self
    }

    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = store;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        request: &SearchRequest,
        cancel: &CancelSignal,
    ) -> Result<AttemptOutcome> {
        let nav = self
            .sequencer
            .navigate_to_results(session, request, cancel)
            .await?;
        if nav.reached_results() {
            self.artifacts.save_results_page(&nav.page_content);
        }

        let outcome = extraction::extract(&nav.page_content);
        if let AttemptOutcome::FatalError(reason) = &outcome {
            warn!(url = %nav.final_url, %reason, "page not understood");
            self.artifacts.save_unrecognized(&nav.page_content);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl SearchAttempt for BrowserSearch {
    async fn attempt(
        &self,
        request: &SearchRequest,
        attempt: u32,
        cancel: &CancelSignal,
    ) -> AttemptOutcome {
        let profile = EvasionProfile::draw(&self.user_agents, self.window_size);
        let proxy = self.egress.next_identity();
        debug!(
            attempt,
            user_agent = %profile.user_agent,
            proxy = proxy.as_ref().map(|p| p.as_str()).unwrap_or("direct"),
            "opening browser session"
        );

        let mut scoped =
            match ScopedSession::open(self.driver.as_ref(), &profile, proxy.as_ref()).await {
                Ok(scoped) => scoped,
                Err(e) => {
                    warn!(attempt, "browser session failed to start: {e}");
                    return e.into_outcome();
                }
            };

        let result = match scoped.session() {
            Some(session) => {
                let bounded =
                    tokio::time::timeout(self.attempt_timeout, self.drive(session, request, cancel));
                tokio::select! {
                    res = bounded => match res {
                        Ok(result) => result,
                        Err(_) => Err(ScoutError::Transient(format!(
                            "attempt exceeded {}s",
                            self.attempt_timeout.as_secs()
                        ))),
                    },
                    _ = cancel.cancelled() => {
                        info!(attempt, "cancelled while the browser was busy");
                        Err(ScoutError::Cancelled)
                    }
                }
            }
            None => Err(ScoutError::SessionInit("session already released".into())),
        };
        scoped.release().await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => e.into_outcome(),
        };
        info!(attempt, outcome = outcome.kind(), "attempt classified");
        outcome
    }
}
