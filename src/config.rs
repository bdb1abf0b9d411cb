//! YAML configuration
//!
//! Every provider setting is optional; providers fill in their own defaults
//! when a value is missing, so a config file only has to carry the database
//! url and the list of enabled providers.
//!
//! ```yaml
//! database:
//!   url: sqlite://pxier.db?mode=rwc
//! fetcher:
//!   fetch_interval: 10
//!   selected: [str, tsx, cpl, ihuan]
//! providers:
//!   ihuan:
//!     zone: 美国
//!     proxy: socks5://127.0.0.1:1080
//! ```

use crate::error::ConfigError;
use crate::proxy::models::ProviderKind;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default seconds between two ticks
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 10;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_MAX_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub providers: ProvidersConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            fetcher: FetcherConfig::default(),
            providers: ProvidersConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read and parse a config file. Does not validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        content.parse()
    }

    /// Check mandatory settings and resolve the selected providers, in order.
    pub fn validate(&self) -> Result<Vec<ProviderKind>, ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        self.fetcher.selected_providers()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/// Store connection pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds a pooled connection may live
    pub max_lifetime: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_lifetime: DEFAULT_MAX_LIFETIME_SECS,
        }
    }
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Seconds between ticks; 0 or missing means the default
    pub fetch_interval: u64,
    /// Provider identifiers, any case
    pub selected: Vec<String>,
}

impl FetcherConfig {
    pub fn interval(&self) -> Duration {
        match self.fetch_interval {
            0 => Duration::from_secs(DEFAULT_FETCH_INTERVAL_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn selected_providers(&self) -> Result<Vec<ProviderKind>, ConfigError> {
        if self.selected.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        self.selected
            .iter()
            .map(|s| s.parse::<ProviderKind>().map_err(ConfigError::UnknownProvider))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub str: DualListConfig,
    pub tsx: DualListConfig,
    pub cpl: SingleListConfig,
    pub ihuan: IhuanConfig,
}

/// Provider serving one HTTP list and one SOCKS5 list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DualListConfig {
    pub http_url: Option<String>,
    pub socks5_url: Option<String>,
    /// Seconds
    pub timeout: Option<u64>,
    /// Upstream proxy to dial through
    pub proxy: Option<String>,
}

/// Provider serving a single combined list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SingleListConfig {
    pub url: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IhuanConfig {
    pub http_url: Option<String>,
    pub statistics_url: Option<String>,
    pub key_url: Option<String>,
    pub timeout: Option<u64>,
    /// Page size requested per fetch
    pub each_fetch_num: Option<u32>,
    /// Geographic filter passed as the `address` form field
    pub zone: Option<String>,
    pub proxy: Option<String>,
}

/// Treat `Some("")` the same as a missing value
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
