//! Session driver abstraction over the browser engine.
//!
//! Defines the `SessionDriver` and `BrowserSession` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide), plus
//! the scoped wrapper that guarantees a session is released on every
//! exit path.

pub mod chromium;

use crate::errors::Result;
use crate::stealth::proxy::ProxyIdentity;
use crate::stealth::EvasionProfile;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Starts browser sessions with a given evasion profile and egress.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Launch a session. Fails with `ScoutError::SessionInit` if the
    /// engine cannot start or the proxy cannot be configured.
    async fn open(
        &self,
        profile: &EvasionProfile,
        proxy: Option<&ProxyIdentity>,
    ) -> Result<Box<dyn BrowserSession>>;
}

/// A single live browser session (one tab in one browser process).
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Start loading a URL.
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// The URL currently shown.
    async fn current_url(&self) -> Result<String>;
    /// Full page HTML.
    async fn content(&self) -> Result<String>;
    /// Scroll the viewport down by `pixels`.
    async fn scroll_by(&self, pixels: u32) -> Result<()>;
    /// Release the session and its external process.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Owns a session for the duration of one attempt.
///
/// Call [`ScopedSession::release`] on the way out. If the guard is dropped
/// instead (panic, cancelled future), the boxed session is dropped with it
/// and its own `Drop` tears the browser process down.
pub struct ScopedSession {
    inner: Option<Box<dyn BrowserSession>>,
}

impl ScopedSession {
    pub async fn open(
        driver: &dyn SessionDriver,
        profile: &EvasionProfile,
        proxy: Option<&ProxyIdentity>,
    ) -> Result<Self> {
        let session = driver.open(profile, proxy).await?;
        Ok(Self {
            inner: Some(session),
        })
    }

    /// Wrap an already-open session.
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            inner: Some(session),
        }
    }

    pub fn session(&mut self) -> Option<&mut (dyn BrowserSession + 'static)> {
        self.inner.as_deref_mut()
    }

    /// Close the session. Errors are logged; release always completes.
    pub async fn release(mut self) {
        if let Some(session) = self.inner.take() {
            match session.close().await {
                Ok(()) => debug!("browser session released"),
                Err(e) => warn!("browser session close reported an error: {e}"),
            }
        }
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.inner.is_some() {
            warn!("browser session dropped without explicit release; forcing teardown");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory sessions for exercising navigation and retries.

    use super::*;
    use crate::errors::ScoutError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Counters shared between a fake driver and the test.
    #[derive(Debug, Default)]
    pub struct Counters {
        pub opened: AtomicUsize,
        pub closed: AtomicUsize,
        pub scrolls: AtomicUsize,
    }

    impl Counters {
        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    /// A session that replays a fixed list of URLs, one per `current_url`
    /// call, repeating the last one forever.
    pub struct ScriptedSession {
        pub urls: Mutex<VecDeque<String>>,
        pub last: Mutex<String>,
        pub html: String,
        pub fail_goto: bool,
        /// How long `goto` blocks before returning.
        pub goto_delay: std::time::Duration,
        /// Number of leading `content` calls that fail.
        pub failing_reads: AtomicUsize,
        pub counters: Arc<Counters>,
        pub visited: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedSession {
        pub fn new(urls: &[&str], html: &str, counters: Arc<Counters>) -> Self {
            Self {
                urls: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
                last: Mutex::new(String::from("about:blank")),
                html: html.to_string(),
                fail_goto: false,
                goto_delay: std::time::Duration::ZERO,
                failing_reads: AtomicUsize::new(0),
                counters,
                visited: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn goto(&mut self, url: &str) -> Result<()> {
            if !self.goto_delay.is_zero() {
                tokio::time::sleep(self.goto_delay).await;
            }
            if self.fail_goto {
                return Err(ScoutError::Transient("net::ERR_PROXY_CONNECTION_FAILED".into()));
            }
            if let Ok(mut v) = self.visited.lock() {
                v.push(url.to_string());
            }
            Ok(())
        }

        async fn current_url(&self) -> Result<String> {
            let mut urls = self.urls.lock().map_err(|_| ScoutError::Transient("poisoned".into()))?;
            let mut last = self.last.lock().map_err(|_| ScoutError::Transient("poisoned".into()))?;
            if let Some(next) = urls.pop_front() {
                *last = next;
            }
            Ok(last.clone())
        }

        async fn content(&self) -> Result<String> {
            let failing = self
                .failing_reads
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if failing.is_ok() {
                return Err(ScoutError::Transient("Execution context was destroyed".into()));
            }
            Ok(self.html.clone())
        }

        async fn scroll_by(&self, _pixels: u32) -> Result<()> {
            self.counters.scrolls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Driver that hands out one scripted page per `open` call.
    pub struct ScriptedDriver {
        pub pages: Mutex<VecDeque<ScriptedPage>>,
        pub counters: Arc<Counters>,
        pub user_agents: Mutex<Vec<String>>,
        pub proxies: Mutex<Vec<Option<String>>>,
    }

    pub enum ScriptedPage {
        Html { urls: Vec<String>, html: String },
        InitFailure,
        GotoFailure,
        /// A page whose `goto` blocks for the given time.
        SlowGoto(std::time::Duration),
    }

    impl ScriptedDriver {
        pub fn new(pages: Vec<ScriptedPage>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                counters: Arc::new(Counters::default()),
                user_agents: Mutex::new(Vec::new()),
                proxies: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SessionDriver for ScriptedDriver {
        async fn open(
            &self,
            profile: &EvasionProfile,
            proxy: Option<&ProxyIdentity>,
        ) -> Result<Box<dyn BrowserSession>> {
            if let Ok(mut uas) = self.user_agents.lock() {
                uas.push(profile.user_agent.clone());
            }
            if let Ok(mut ps) = self.proxies.lock() {
                ps.push(proxy.map(|p| p.to_string()));
            }
            let page = self
                .pages
                .lock()
                .map_err(|_| ScoutError::SessionInit("poisoned".into()))?
                .pop_front()
                .ok_or_else(|| ScoutError::SessionInit("no scripted page left".into()))?;
            let mut goto_delay = std::time::Duration::ZERO;
            let (urls, html, fail_goto) = match page {
                ScriptedPage::InitFailure => {
                    return Err(ScoutError::SessionInit("chromium failed to start".into()))
                }
                ScriptedPage::GotoFailure => (Vec::new(), String::new(), true),
                ScriptedPage::Html { urls, html } => (urls, html, false),
                ScriptedPage::SlowGoto(delay) => {
                    goto_delay = delay;
                    (Vec::new(), String::new(), false)
                }
            };
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
            let mut session = ScriptedSession::new(&url_refs, &html, Arc::clone(&self.counters));
            session.fail_goto = fail_goto;
            session.goto_delay = goto_delay;
            Ok(Box::new(session))
        }
    }
}
