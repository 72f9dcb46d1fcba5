//! Chromium-based session driver using chromiumoxide.

use super::{BrowserSession, SessionDriver};
use crate::errors::{Result, ScoutError};
use crate::stealth::proxy::ProxyIdentity;
use crate::stealth::{EvasionProfile, STEALTH_SCRIPT};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Upper bound on a single `goto` before it counts as a transient failure.
const GOTO_TIMEOUT: Duration = Duration::from_secs(45);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. GOWILD_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("GOWILD_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.gowild/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".gowild/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".gowild/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".gowild/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".gowild/chromium/chrome-linux64/chrome"),
                home.join(".gowild/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    chromium_path: Option<PathBuf>,
    headless: bool,
}

impl ChromiumDriver {
    pub fn new(chromium_path: Option<PathBuf>, headless: bool) -> Self {
        Self {
            chromium_path,
            headless,
        }
    }

    fn build_config(
        &self,
        profile: &EvasionProfile,
        proxy: Option<&ProxyIdentity>,
    ) -> Result<BrowserConfig> {
        let chrome_path = self
            .chromium_path
            .clone()
            .or_else(find_chromium)
            .ok_or_else(|| {
                ScoutError::SessionInit(
                    "Chromium not found. Set GOWILD_CHROMIUM_PATH or install Chrome.".into(),
                )
            })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(profile.window_size.width, profile.window_size.height)
            .viewport(None::<Viewport>)
            .args(profile.launch_args());

        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(proxy) = proxy {
            builder = builder.arg(proxy.server_arg());
        }

        builder
            .build()
            .map_err(|e| ScoutError::SessionInit(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl SessionDriver for ChromiumDriver {
    async fn open(
        &self,
        profile: &EvasionProfile,
        proxy: Option<&ProxyIdentity>,
    ) -> Result<Box<dyn BrowserSession>> {
        let config = self.build_config(profile, proxy)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::SessionInit(format!("failed to launch Chromium: {e}")))?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        // From here on the session owns the process; dropping it on an
        // error path kills the browser.
        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
        };

        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScoutError::SessionInit(format!("failed to create page: {e}")))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| ScoutError::SessionInit(format!("failed to inject stealth script: {e}")))?;

        session.page = Some(page);
        info!(
            headless = self.headless,
            proxy = proxy.map(|p| p.as_str()).unwrap_or("direct"),
            "Chromium session opened"
        );
        Ok(Box::new(session))
    }
}

/// A single Chromium process with one working tab.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScoutError::SessionInit("session has no open page".into()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        match tokio::time::timeout(GOTO_TIMEOUT, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScoutError::Transient(format!("navigation failed: {e}"))),
            Err(_) => Err(ScoutError::Transient(format!(
                "navigation timed out after {}s",
                GOTO_TIMEOUT.as_secs()
            ))),
        }
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page()?
            .url()
            .await
            .map_err(|e| ScoutError::Transient(format!("failed to read URL: {e}")))?
            .unwrap_or_default();
        Ok(url)
    }

    async fn content(&self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| ScoutError::Transient(format!("failed to read page content: {e}")))
    }

    async fn scroll_by(&self, pixels: u32) -> Result<()> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {pixels});"))
            .await
            .map_err(|e| ScoutError::Transient(format!("scroll failed: {e}")))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = self;
        if let Some(page) = this.page.take() {
            let _ = page.close().await;
        }
        let _ = this.browser.close().await;
        let _ = this.browser.wait().await;
        debug!("Chromium process exited");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // chromiumoxide kills the child process when `Browser` drops.
        self.handler_task.abort();
    }
}
