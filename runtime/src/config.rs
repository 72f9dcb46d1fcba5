//! Runtime configuration.
//!
//! Resolved in three layers: built-in defaults, then `GOWILD_*`
//! environment variables, then CLI flags applied by the binary.

use crate::errors::{Result, ScoutError};
use crate::model::FareType;
use crate::retry::DEFAULT_MAX_RETRIES;
use crate::routes::client::{DEFAULT_ROUTE_MAP_URL, DEFAULT_SCHEDULE_URL};
use crate::search::DEFAULT_ATTEMPT_TIMEOUT;
use crate::stealth::proxy::ProxyIdentity;
use crate::stealth::{UserAgentPool, WindowSize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SEARCH_URL: &str = "https://booking.flyfrontier.com/Flight/InternalSelect";

/// Endpoints of the booking site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    pub search: Url,
    pub route_map: Url,
    pub schedule: Url,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            search: Url::parse(DEFAULT_SEARCH_URL).expect("default URL is valid"),
            route_map: Url::parse(DEFAULT_ROUTE_MAP_URL).expect("default URL is valid"),
            schedule: Url::parse(DEFAULT_SCHEDULE_URL).expect("default URL is valid"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub max_retries: u32,
    pub proxy: Option<ProxyIdentity>,
    pub headless: bool,
    pub user_agents: UserAgentPool,
    pub window_size: WindowSize,
    pub artifact_dir: PathBuf,
    pub save_artifacts: bool,
    pub chromium_path: Option<PathBuf>,
    pub urls: SiteUrls,
    /// Hard cap on one attempt, session launch to release.
    pub attempt_timeout: Duration,
    pub fare_type: FareType,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            proxy: None,
            headless: true,
            user_agents: UserAgentPool::default(),
            window_size: WindowSize::default(),
            artifact_dir: default_artifact_dir(),
            save_artifacts: true,
            chromium_path: None,
            urls: SiteUrls::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            fare_type: FareType::default(),
        }
    }
}

impl ScoutConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read_string = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let proxy = read_string("GOWILD_PROXY")
            .map(|raw| ProxyIdentity::parse(&raw))
            .transpose()?;
        let user_agents = match read_string("GOWILD_USER_AGENTS") {
            Some(raw) => UserAgentPool::from_delimited(&raw)?,
            None => defaults.user_agents,
        };
        let window_size = match read_string("GOWILD_WINDOW_SIZE") {
            Some(raw) => WindowSize::parse(&raw)?,
            None => defaults.window_size,
        };
        let fare_type = match read_string("GOWILD_FARE_TYPE").as_deref() {
            Some(raw) => parse_fare_type(raw)?,
            None => defaults.fare_type,
        };

        Ok(Self {
            max_retries: read_u32(&read_string, "GOWILD_MAX_RETRIES", defaults.max_retries).max(1),
            proxy,
            headless: read_bool(&read_string, "GOWILD_HEADLESS", defaults.headless),
            user_agents,
            window_size,
            artifact_dir: read_string("GOWILD_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            save_artifacts: read_bool(&read_string, "GOWILD_SAVE_ARTIFACTS", defaults.save_artifacts),
            chromium_path: read_string("GOWILD_CHROMIUM_PATH").map(PathBuf::from),
            urls: SiteUrls {
                search: read_url(&read_string, "GOWILD_SEARCH_URL", defaults.urls.search)?,
                route_map: read_url(&read_string, "GOWILD_ROUTE_MAP_URL", defaults.urls.route_map)?,
                schedule: read_url(&read_string, "GOWILD_SCHEDULE_URL", defaults.urls.schedule)?,
            },
            attempt_timeout: Duration::from_secs(
                read_u64(
                    &read_string,
                    "GOWILD_ATTEMPT_TIMEOUT_SECS",
                    defaults.attempt_timeout.as_secs(),
                )
                .max(1),
            ),
            fare_type,
        })
    }
}

pub fn default_artifact_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".gowild")
        .join("artifacts")
}

pub fn parse_fare_type(raw: &str) -> Result<FareType> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "DD" => Ok(FareType::DiscountDen),
        "STD" | "STANDARD" => Ok(FareType::Standard),
        other => Err(ScoutError::Config(format!("unknown fare type {other:?}"))),
    }
}

fn read_u64(read: &dyn Fn(&str) -> Option<String>, name: &str, default_value: u64) -> u64 {
    read(name)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_u32(read: &dyn Fn(&str) -> Option<String>, name: &str, default_value: u32) -> u32 {
    read(name)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn read_bool(read: &dyn Fn(&str) -> Option<String>, name: &str, default_value: bool) -> bool {
    match read(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default_value,
    }
}

fn read_url(read: &dyn Fn(&str) -> Option<String>, name: &str, default_value: Url) -> Result<Url> {
    match read(name) {
        Some(raw) => {
            Url::parse(&raw).map_err(|e| ScoutError::Config(format!("{name}={raw:?}: {e}")))
        }
        None => Ok(default_value),
    }
}
