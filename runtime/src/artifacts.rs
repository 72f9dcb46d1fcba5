//! On-disk copies of fetched pages for offline diagnosis.
//!
//! Artifacts are best effort: a failed write is logged and never changes
//! the outcome of a search.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RESULTS_PREFIX: &str = "flight_select_page";
const UNRECOGNIZED_PREFIX: &str = "debug_page_source";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: Option<PathBuf>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Save a page that reached the results URL.
    pub fn save_results_page(&self, content: &str) -> Option<PathBuf> {
        self.save(RESULTS_PREFIX, content)
    }

    /// Save a page extraction could not make sense of.
    pub fn save_unrecognized(&self, content: &str) -> Option<PathBuf> {
        self.save(UNRECOGNIZED_PREFIX, content)
    }

    fn save(&self, prefix: &str, content: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        match write_artifact(dir, prefix, content) {
            Ok(path) => {
                info!(path = %path.display(), "saved page artifact");
                Some(path)
            }
            Err(e) => {
                warn!("failed to save {prefix} artifact in {}: {e}", dir.display());
                None
            }
        }
    }
}

fn write_artifact(dir: &Path, prefix: &str, content: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dir.join(format!("{prefix}_{stamp}.html"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{prefix}_{stamp}_{n}.html"));
        n += 1;
    }
    fs::write(&path, content)?;
    Ok(path)
}
