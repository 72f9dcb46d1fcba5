//! Network identity for a session.
//!
//! The core never rotates addresses itself. A rotating endpoint hands out
//! a new egress IP per new connection; all the core does is open a new
//! connection per attempt. [`EgressProvider`] makes that assumption
//! explicit so tests can swap in a double.

use crate::errors::{Result, ScoutError};
use std::fmt;

/// A `host:port` proxy endpoint, IP-authenticated (no credentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity(String);

impl ProxyIdentity {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix("http://").unwrap_or(raw);
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| ScoutError::Config(format!("proxy {raw:?} is not host:port")))?;
        if host.is_empty() || host.contains('@') {
            return Err(ScoutError::Config(format!("proxy {raw:?} has an invalid host")));
        }
        port.parse::<u16>()
            .map_err(|_| ScoutError::Config(format!("proxy {raw:?} has an invalid port")))?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chromium switch routing all traffic through this endpoint.
    pub fn server_arg(&self) -> String {
        format!("--proxy-server=http://{}", self.0)
    }
}

impl fmt::Display for ProxyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the proxy (if any) for each new attempt.
pub trait EgressProvider: Send + Sync {
    fn next_identity(&self) -> Option<ProxyIdentity>;
}

/// A single rotating endpoint; the provider swaps the egress IP per connection.
#[derive(Debug, Clone)]
pub struct RotatingEndpoint {
    endpoint: ProxyIdentity,
}

impl RotatingEndpoint {
    pub fn new(endpoint: ProxyIdentity) -> Self {
        Self { endpoint }
    }
}

impl EgressProvider for RotatingEndpoint {
    fn next_identity(&self) -> Option<ProxyIdentity> {
        Some(self.endpoint.clone())
    }
}

/// Direct connection, no proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEgress;

impl EgressProvider for DirectEgress {
    fn next_identity(&self) -> Option<ProxyIdentity> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proxy() {
        let p = ProxyIdentity::parse("p.webshare.io:9999").unwrap();
        assert_eq!(p.as_str(), "p.webshare.io:9999");
        assert_eq!(p.server_arg(), "--proxy-server=http://p.webshare.io:9999");
        assert_eq!(
            ProxyIdentity::parse("http://10.0.0.1:8080").unwrap().as_str(),
            "10.0.0.1:8080"
        );
    }

    #[test]
    fn test_parse_proxy_rejects_garbage() {
        assert!(ProxyIdentity::parse("no-port").is_err());
        assert!(ProxyIdentity::parse(":8080").is_err());
        assert!(ProxyIdentity::parse("host:99999").is_err());
        assert!(ProxyIdentity::parse("user:pw@host:80").is_err());
    }

    #[test]
    fn test_providers() {
        let endpoint = ProxyIdentity::parse("proxy.local:9000").unwrap();
        let rotating = RotatingEndpoint::new(endpoint.clone());
        assert_eq!(rotating.next_identity(), Some(endpoint.clone()));
        assert_eq!(rotating.next_identity(), Some(endpoint));
        assert_eq!(DirectEgress.next_identity(), None);
    }
}
