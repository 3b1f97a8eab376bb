use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

use crate::aggregate::DEFAULT_INDEX_NAME;
use crate::fetch::{DirFetcher, Fetch, HttpFetcher};

const ENV_PREFIX: &str = "CONPUBS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid CONPUBS_* settings: {0}")]
    Source(#[from] config::ConfigError),
    #[error("no document source: set CONPUBS_BASE_URL or CONPUBS_MIRROR_DIR (or pass --base-url / --mirror)")]
    NoSource,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Run settings. Built from `CONPUBS_*` environment variables, then
/// overridden field by field from the command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root URL of the published site.
    pub base_url: Option<String>,
    /// Local mirror of the site; preferred over `base_url` when both are set.
    pub mirror_dir: Option<PathBuf>,
    pub index_name: String,
    /// Worker threads for sibling pages; 0 lets rayon decide.
    pub jobs: usize,
    pub timeout_secs: u64,
    /// Only count series whose name contains this text.
    pub series_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: None,
            mirror_dir: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            jobs: 0,
            timeout_secs: 30,
            series_filter: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn fetcher(&self) -> Result<Box<dyn Fetch>, SettingsError> {
        if let Some(dir) = &self.mirror_dir {
            return Ok(Box::new(DirFetcher::new(dir.clone())));
        }
        match &self.base_url {
            Some(url) => Ok(Box::new(HttpFetcher::new(
                url,
                Duration::from_secs(self.timeout_secs),
            )?)),
            None => Err(SettingsError::NoSource),
        }
    }

    pub fn wants_series(&self, name: &str) -> bool {
        self.series_filter
            .as_deref()
            .map_or(true, |f| name.contains(f))
    }
}
