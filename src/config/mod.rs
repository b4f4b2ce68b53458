//! Configuration for the dashboard client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/dialdeck/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::EngineSettings;
use crate::query::QueryPolicy;
use crate::status::StatusPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;
mod sync;

#[cfg(test)]
mod tests;

pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use sync::{CacheConfig, FileCache, FileStatus, StatusConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why the configuration could not be loaded
#[derive(Debug)]
pub enum ConfigError {
    /// Config file exists but cannot be read
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A value is out of range
    Invalid(String),
}

impl ConfigError {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "cannot parse {}: {}", path.display(), source)
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the dialer server
    pub api_url: String,

    /// Per-request timeout for every API call
    pub request_timeout_secs: u64,

    /// Base delay before retrying a failed lead/campaign fetch (doubles per attempt)
    pub retry_delay_ms: u64,

    /// Whether to run the terminal dashboard (disabled for headless mode)
    pub enable_tui: bool,

    /// Status polling
    pub status: StatusConfig,

    /// Lead page cache
    pub leads: CacheConfig,

    /// Campaign list cache
    pub campaigns: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            enable_tui: true,
            status: StatusConfig::default(),
            leads: CacheConfig::leads_default(),
            campaigns: CacheConfig::campaigns_default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub retry_delay_ms: Option<u64>,

    /// Optional [status] section
    pub status: Option<FileStatus>,

    /// Optional [leads] section
    pub leads: Option<FileCache>,

    /// Optional [campaigns] section
    pub campaigns: Option<FileCache>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/dialdeck/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("dialdeck").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        // Config::default().to_toml() is the single source of truth
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A missing file means defaults. A file that exists but cannot be read
    /// or parsed is an error: silently falling back to defaults would leave
    /// the user debugging the wrong thing.
    fn load_file_config() -> Result<FileConfig, ConfigError> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse_file_config(&contents, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub(crate) fn parse_file_config(contents: &str, path: PathBuf) -> Result<FileConfig, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Load configuration: env vars > file > defaults
    pub fn load() -> Result<Self, ConfigError> {
        let file = Self::load_file_config()?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values with environment overrides
    pub(crate) fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // API URL: env > file > default
        let api_url = env("DIALDECK_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = api_url.trim_end_matches('/').to_string();

        // Timeout: env > file > default
        let request_timeout_secs = match env("DIALDECK_REQUEST_TIMEOUT_SECS") {
            Some(v) => v.parse().map_err(|_| {
                ConfigError::Invalid(format!("DIALDECK_REQUEST_TIMEOUT_SECS={:?} is not a number", v))
            })?,
            None => file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let retry_delay_ms = file.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS);

        // TUI toggle: env only (runtime flag)
        let enable_tui = env("DIALDECK_NO_TUI")
            .map(|v| v != "1" && v.to_lowercase() != "true")
            .unwrap_or(true);

        let config = Self {
            api_url,
            request_timeout_secs,
            retry_delay_ms,
            enable_tui,
            status: StatusConfig::from_file(file.status),
            leads: CacheConfig::from_file(file.leads, CacheConfig::leads_default()),
            campaigns: CacheConfig::from_file(file.campaigns, CacheConfig::campaigns_default()),
            logging: LoggingConfig::from_file(file.logging),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must start with http:// or https:// (got {:?})",
                self.api_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.status.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("status.poll_interval_ms must be > 0".into()));
        }
        if self.status.max_failures == 0 {
            return Err(ConfigError::Invalid("status.max_failures must be >= 1".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Polling and cache policies for the engine
    pub fn engine_settings(&self) -> EngineSettings {
        let retry_delay = Duration::from_millis(self.retry_delay_ms);
        EngineSettings {
            status: StatusPolicy {
                poll_interval: Duration::from_millis(self.status.poll_interval_ms),
                max_failures: self.status.max_failures,
            },
            leads: QueryPolicy {
                stale_time: Duration::from_secs(self.leads.stale_secs),
                retries: self.leads.retries,
                retry_delay,
            },
            campaigns: QueryPolicy {
                stale_time: Duration::from_secs(self.campaigns.stale_secs),
                retries: self.campaigns.retries,
                retry_delay,
            },
        }
    }
}
