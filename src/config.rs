//! Client configuration.
//!
//! `KitOpenConfig` is a plain value: build it in code, or deserialize it from
//! whatever format the caller loads. Every field has a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::archive::ArchiveLayout;
use crate::error::SearchError;
use crate::search::{BatchingStrategy, ExportSettings, SearchDefaults};
use crate::transport::LoggingMode;

pub const DEFAULT_SEARCH_URL: &str = "https://publikationen.bibliothek.kit.edu/auswertungen/report.php";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitOpenConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default)]
    pub batching: BatchingStrategy,

    #[serde(default = "default_export_timeout_secs")]
    pub export_timeout_secs: u64,
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub logging_mode: LoggingMode,

    #[serde(default)]
    pub archive: ArchiveLayout,
    #[serde(default)]
    pub defaults: SearchDefaults,
}

fn default_search_url() -> String { DEFAULT_SEARCH_URL.to_string() }
fn default_export_timeout_secs() -> u64 { 600 }
fn default_poll_initial_ms() -> u64 { 1000 }
fn default_poll_max_ms() -> u64 { 10_000 }
fn default_request_timeout_secs() -> u64 { 300 }
fn default_user_agent() -> String { format!("kitopen/{}", env!("CARGO_PKG_VERSION")) }

impl Default for KitOpenConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            batching: BatchingStrategy::default(),
            export_timeout_secs: default_export_timeout_secs(),
            poll_initial_ms: default_poll_initial_ms(),
            poll_max_ms: default_poll_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            logging_mode: LoggingMode::default(),
            archive: ArchiveLayout::default(),
            defaults: SearchDefaults::default(),
        }
    }
}

impl KitOpenConfig {
    /// Checks values that would only fail later, mid-search.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::Configuration` for an unparsable search URL, a
    /// zero timeout or poll interval, or `poll_max_ms < poll_initial_ms`.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.parsed_search_url()?;

        if self.export_timeout_secs == 0 {
            return Err(SearchError::Configuration(
                "export_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SearchError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll_initial_ms == 0 {
            return Err(SearchError::Configuration(
                "poll_initial_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_max_ms < self.poll_initial_ms {
            return Err(SearchError::Configuration(format!(
                "poll_max_ms ({}) is below poll_initial_ms ({})",
                self.poll_max_ms, self.poll_initial_ms
            )));
        }
        if let BatchingStrategy::YearWindow { years: 0 } = self.batching {
            return Err(SearchError::Configuration(
                "year window must span at least one year".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parsed_search_url(&self) -> Result<Url, SearchError> {
        Url::parse(&self.search_url).map_err(|e| {
            SearchError::Configuration(format!("invalid search_url '{}': {}", self.search_url, e))
        })
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            export_timeout: self.export_timeout(),
            poll_initial: Duration::from_millis(self.poll_initial_ms),
            poll_max: Duration::from_millis(self.poll_max_ms),
        }
    }
}
