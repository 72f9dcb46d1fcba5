//! Egress check: which public IP does a session actually present?

use crate::errors::{Result, ScoutError};
use crate::renderer::{ScopedSession, SessionDriver};
use crate::stealth::proxy::ProxyIdentity;
use crate::stealth::EvasionProfile;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_PROBE_URL: &str = "http://httpbin.org/ip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressReport {
    /// Address (or comma-separated chain) the echo service saw.
    pub origin: String,
    pub proxy: Option<String>,
}

/// Open a session through `proxy`, load an IP echo page and report the
/// address it saw. The session is released whether or not this succeeds.
pub async fn probe_egress(
    driver: &dyn SessionDriver,
    profile: &EvasionProfile,
    proxy: Option<&ProxyIdentity>,
    url: &str,
) -> Result<EgressReport> {
    let mut scoped = ScopedSession::open(driver, profile, proxy).await?;
    let content = match scoped.session() {
        Some(session) => match session.goto(url).await {
            Ok(()) => session.content().await,
            Err(e) => Err(e),
        },
        None => Err(ScoutError::SessionInit("session already released".into())),
    };
    scoped.release().await;

    let origin = parse_origin(&content?)?;
    info!(%origin, proxy = proxy.map(|p| p.as_str()).unwrap_or("direct"), "egress probe done");
    Ok(EgressReport {
        origin,
        proxy: proxy.map(|p| p.to_string()),
    })
}

#[derive(Deserialize)]
struct IpEcho {
    origin: String,
}

/// Pull `origin` out of the echo JSON, which Chromium wraps in a `<pre>`.
pub fn parse_origin(content: &str) -> Result<String> {
    let trimmed = content.trim_start();
    let body = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let document = Html::parse_document(content);
        let pre = Selector::parse("pre")
            .map_err(|e| ScoutError::Parse(format!("invalid pre selector: {e:?}")))?;
        match document.select(&pre).next() {
            Some(el) => el.text().collect(),
            None => document.root_element().text().collect(),
        }
    };
    let echo: IpEcho = serde_json::from_str(body.trim())
        .map_err(|e| ScoutError::Parse(format!("IP echo response is not JSON: {e}")))?;
    Ok(echo.origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::{ScriptedDriver, ScriptedPage};
    use crate::stealth::{UserAgentPool, WindowSize};

    #[test]
    fn test_parse_origin_from_wrapped_json() {
        let html = r#"<html><head></head><body><pre style="word-wrap: break-word;">{
  "origin": "203.0.113.7"
}
</pre></body></html>"#;
        assert_eq!(parse_origin(html).unwrap(), "203.0.113.7");
        assert_eq!(parse_origin(r#"{"origin": "198.51.100.1"}"#).unwrap(), "198.51.100.1");
        assert!(matches!(parse_origin("<p>blocked</p>"), Err(ScoutError::Parse(_))));
    }

    #[tokio::test]
    async fn test_probe_releases_session() {
        let driver = ScriptedDriver::new(vec![ScriptedPage::Html {
            urls: vec![DEFAULT_PROBE_URL.into()],
            html: r#"<pre>{"origin": "203.0.113.7"}</pre>"#.into(),
        }]);
        let profile = EvasionProfile::draw(&UserAgentPool::default(), WindowSize::default());
        let proxy = ProxyIdentity::parse("gate.test:7000").unwrap();
        let report = probe_egress(&driver, &profile, Some(&proxy), DEFAULT_PROBE_URL)
            .await
            .unwrap();
        assert_eq!(report.origin, "203.0.113.7");
        assert_eq!(report.proxy.as_deref(), Some("gate.test:7000"));
        assert_eq!(driver.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_probe_goto_failure_still_releases() {
        let driver = ScriptedDriver::new(vec![ScriptedPage::GotoFailure]);
        let profile = EvasionProfile::draw(&UserAgentPool::default(), WindowSize::default());
        let res = probe_egress(&driver, &profile, None, DEFAULT_PROBE_URL).await;
        assert!(matches!(res, Err(ScoutError::Transient(_))));
        assert_eq!(driver.counters.opened(), 1);
        assert_eq!(driver.counters.closed(), 1);
    }
}
