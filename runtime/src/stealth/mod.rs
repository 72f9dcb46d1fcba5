//! Evasion profiles: the client-identifying signals a session presents.
//!
//! A fresh [`EvasionProfile`] is drawn for every attempt. The user-agent
//! pool is configuration, not code, so it can be swapped without a rebuild.

pub mod probe;
pub mod proxy;

use crate::errors::{Result, ScoutError};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Desktop browser strings used when no pool is configured.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Chromium switches that mask automation or quiet background chatter.
pub const DISABLED_AUTOMATION_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-features=VizDisplayCompositor",
    "--disable-background-timer-throttling",
    "--disable-renderer-backgrounding",
    "--disable-backgrounding-occluded-windows",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-sync",
    "--metrics-recording-only",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
];

/// Injected before any page script runs.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'platform', { get: () => 'Win32' });
Object.defineProperty(navigator, 'vendor', { get: () => 'Google Inc.' });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
(function () {
  const patch = function (proto) {
    if (!proto) return;
    const original = proto.getParameter;
    proto.getParameter = function (param) {
      if (param === 37445) return 'Intel Inc.';
      if (param === 37446) return 'Intel Iris OpenGL Engine';
      return original.call(this, param);
    };
  };
  patch(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patch(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
})();
"#;

/// Fixed list of user-agent strings a profile is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>) -> Result<Self> {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if agents.is_empty() {
            return Err(ScoutError::Config("user-agent pool is empty".into()));
        }
        Ok(Self { agents })
    }

    /// Parse a `|`-separated list, as carried by `GOWILD_USER_AGENTS`.
    pub fn from_delimited(raw: &str) -> Result<Self> {
        Self::new(raw.split('|').map(str::to_string).collect())
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    /// Pick one string uniformly; repeats across draws are allowed.
    pub fn choose(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl WindowSize {
    /// Parse `WIDTHxHEIGHT`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (w, h) = raw
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ScoutError::Config(format!("window size {raw:?} is not WIDTHxHEIGHT")))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| ScoutError::Config(format!("bad window width in {raw:?}")))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| ScoutError::Config(format!("bad window height in {raw:?}")))?;
        Ok(Self { width, height })
    }
}

/// Signals presented by one session. Immutable once drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvasionProfile {
    pub user_agent: String,
    pub window_size: WindowSize,
    pub disabled_automation_flags: Vec<String>,
}

impl EvasionProfile {
    /// Draw a profile for a new attempt.
    pub fn draw(pool: &UserAgentPool, window_size: WindowSize) -> Self {
        Self {
            user_agent: pool.choose().to_string(),
            window_size,
            disabled_automation_flags: DISABLED_AUTOMATION_FLAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Browser command-line switches for this profile.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.disabled_automation_flags.clone();
        args.push(format!(
            "--window-size={},{}",
            self.window_size.width, self.window_size.height
        ));
        args.push(format!("--user-agent={}", self.user_agent));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(UserAgentPool::new(vec![]).is_err());
        assert!(UserAgentPool::from_delimited(" | ").is_err());
    }

    #[test]
    fn test_injected_pool_is_used() {
        let pool = UserAgentPool::from_delimited("agent-a|agent-b").unwrap();
        for _ in 0..50 {
            let profile = EvasionProfile::draw(&pool, WindowSize::default());
            assert!(profile.user_agent == "agent-a" || profile.user_agent == "agent-b");
        }
    }

    #[test]
    fn test_launch_args_carry_profile() {
        let pool = UserAgentPool::new(vec!["test-agent".into()]).unwrap();
        let profile = EvasionProfile::draw(&pool, WindowSize { width: 1280, height: 800 });
        let args = profile.launch_args();
        assert!(args.contains(&"--user-agent=test-agent".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
        assert!(args
            .iter()
            .any(|a| a == "--disable-blink-features=AutomationControlled"));
    }

    #[test]
    fn test_window_size_parse() {
        assert_eq!(
            WindowSize::parse("1366x768").unwrap(),
            WindowSize { width: 1366, height: 768 }
        );
        assert!(WindowSize::parse("1366").is_err());
        assert!(WindowSize::parse("wide x tall").is_err());
    }
}
