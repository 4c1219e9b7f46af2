//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{FetcherConfig, DEFAULT_MAX_PAGES, DEFAULT_SEARCH_MAX_PAGES};
use crate::models::{Season, Timeframe};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Upstream leaderboard API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds; 0 disables the timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Page cap for full leaderboard fetches
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Page cap for single-user lookups
    #[serde(default = "default_search_max_pages")]
    pub search_max_pages: u32,
}

fn default_base_url() -> String {
    FetcherConfig::default().base_url
}

fn default_user_agent() -> String {
    FetcherConfig::default().user_agent
}

fn default_timeout() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}

fn default_search_max_pages() -> u32 {
    DEFAULT_SEARCH_MAX_PAGES
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            max_pages: default_max_pages(),
            search_max_pages: default_search_max_pages(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.timeout(),
        }
    }
}

/// Where the scheduler gets its snapshot rows from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScrapeSource {
    /// Snapshot the live upstream API
    Api {
        #[serde(default)]
        timeframe: Timeframe,
    },

    /// Scrape the public program page
    Html { url: String },
}

impl Default for ScrapeSource {
    fn default() -> Self {
        ScrapeSource::Api {
            timeframe: Timeframe::Month,
        }
    }
}

/// Periodic scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Run interval (e.g. "60s", "15m", "6h")
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Season the snapshots are stored under
    #[serde(default = "default_season")]
    pub season: Season,

    #[serde(default)]
    pub source: ScrapeSource,
}

fn default_interval() -> String {
    "60s".to_string()
}

fn default_season() -> Season {
    Season::LIVE
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_interval(),
            season: default_season(),
            source: ScrapeSource::default(),
        }
    }
}

impl ScraperConfig {
    pub fn interval(&self) -> Option<Duration> {
        parse_interval(&self.interval)
    }
}

/// Parse an interval such as "90s", "15m" or "6h". A bare number is seconds.
/// Values too large to represent parse as `None`.
pub fn parse_interval(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit_secs) = match s.char_indices().last()? {
        (i, 'h') => (&s[..i], 3600),
        (i, 'm') => (&s[..i], 60),
        (i, 's') => (&s[..i], 1),
        _ => (s, 1),
    };

    let count: u64 = digits.trim().parse().ok()?;
    count.checked_mul(unit_secs).map(Duration::from_secs)
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub scraper: ScraperConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.upstream.max_pages == 0 || self.upstream.search_max_pages == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream page caps must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.upstream.base_url).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Invalid upstream base_url: {}",
                self.upstream.base_url
            )));
        }

        match self.scraper.interval() {
            Some(d) if !d.is_zero() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid scraper interval: {}",
                    self.scraper.interval
                )))
            }
        }

        Ok(())
    }
}
