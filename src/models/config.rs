//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::IdentityKey;
use crate::services::EntryFailurePolicy;
use crate::utils::log::LogStyle;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feed source and HTTP behavior
    #[serde(default)]
    pub feed: FeedConfig,

    /// Store and audit file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Polling behavior
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Console output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.feed.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "feed.url must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        if self.schedule.interval_secs == 0 {
            return Err(AppError::validation("schedule.interval_secs must be > 0"));
        }
        for (name, value) in [
            ("paths.store_file", &self.paths.store_file),
            ("paths.latest_file", &self.paths.latest_file),
            ("paths.prior_file", &self.paths.prior_file),
            ("paths.output_file", &self.paths.output_file),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
        }
        self.paths.check_distinct()
    }
}

/// Feed source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// URL of the RSS document
    #[serde(default = "defaults::feed_url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Field used to recognize already-seen entries
    #[serde(default)]
    pub identity: IdentityKey,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: defaults::feed_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            identity: IdentityKey::default(),
        }
    }
}

/// File locations. Relative names are resolved against `storage_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::storage_dir")]
    pub storage_dir: PathBuf,

    /// Main store of every entry seen so far
    #[serde(default = "defaults::store_file")]
    pub store_file: String,

    /// Audit copy of the most recent fetch
    #[serde(default = "defaults::latest_file")]
    pub latest_file: String,

    /// Audit copy of the store as loaded by the last cycle
    #[serde(default = "defaults::prior_file")]
    pub prior_file: String,

    /// Output of one-shot mode
    #[serde(default = "defaults::output_file")]
    pub output_file: String,
}

impl PathsConfig {
    /// Resolve a file name against `storage_dir`, dropping `.` components.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.storage_dir.join(name).components().collect()
    }

    /// Store, audit and output files must not share a path, or one write
    /// would clobber another within the same cycle.
    fn check_distinct(&self) -> Result<()> {
        let files = [
            ("paths.store_file", &self.store_file),
            ("paths.latest_file", &self.latest_file),
            ("paths.prior_file", &self.prior_file),
            ("paths.output_file", &self.output_file),
        ];
        for (i, (name, value)) in files.iter().enumerate() {
            let path = self.resolve(value);
            for (other, other_value) in &files[i + 1..] {
                if path == self.resolve(other_value) {
                    return Err(AppError::validation(format!(
                        "{name} and {other} both resolve to {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            storage_dir: defaults::storage_dir(),
            store_file: defaults::store_file(),
            latest_file: defaults::latest_file(),
            prior_file: defaults::prior_file(),
            output_file: defaults::output_file(),
        }
    }
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between cycle starts
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Drop entries that fail to normalize instead of failing the cycle
    #[serde(default = "defaults::skip_malformed")]
    pub skip_malformed_entries: bool,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn entry_policy(&self) -> EntryFailurePolicy {
        if self.skip_malformed_entries {
            EntryFailurePolicy::Skip
        } else {
            EntryFailurePolicy::Abort
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            skip_malformed_entries: defaults::skip_malformed(),
        }
    }
}

/// Console output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,

    #[serde(default)]
    pub style: LogStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            style: LogStyle::default(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Feed defaults
    pub fn feed_url() -> String {
        "https://this-week-in-rust.org/rss.xml".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; feedwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Path defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn store_file() -> String {
        "feed.json".into()
    }
    pub fn latest_file() -> String {
        "latest.json".into()
    }
    pub fn prior_file() -> String {
        "previous.json".into()
    }
    pub fn output_file() -> String {
        "output.json".into()
    }

    // Schedule defaults
    pub fn interval() -> u64 {
        600
    }
    pub fn skip_malformed() -> bool {
        true
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
