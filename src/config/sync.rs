//! Polling and cache configuration
//!
//! - Status: poll interval and the failure budget before polling pauses
//! - Leads / campaigns: freshness window and retry count per cache

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Status Polling
// ─────────────────────────────────────────────────────────────────────────────

/// Status polling configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    /// Milliseconds between polls
    pub poll_interval_ms: u64,
    /// Consecutive failures before polling pauses (until a manual refresh)
    pub max_failures: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_failures: 3,
        }
    }
}

/// Status settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileStatus {
    pub poll_interval_ms: Option<u64>,
    pub max_failures: Option<u32>,
}

impl StatusConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileStatus>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            poll_interval_ms: file.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            max_failures: file.max_failures.unwrap_or(defaults.max_failures),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Caches
// ─────────────────────────────────────────────────────────────────────────────

/// Freshness and retry settings for one cached query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Seconds a fetched value is served without refetching
    pub stale_secs: u64,
    /// Extra attempts after a failed fetch (network errors only)
    pub retries: u32,
}

impl CacheConfig {
    /// Lead pages: 2 minutes fresh
    pub fn leads_default() -> Self {
        Self {
            stale_secs: 120,
            retries: 2,
        }
    }

    /// Campaign list: 5 minutes fresh
    pub fn campaigns_default() -> Self {
        Self {
            stale_secs: 300,
            retries: 2,
        }
    }

    pub fn from_file(file: Option<FileCache>, defaults: Self) -> Self {
        let file = file.unwrap_or_default();

        Self {
            stale_secs: file.stale_secs.unwrap_or(defaults.stale_secs),
            retries: file.retries.unwrap_or(defaults.retries),
        }
    }
}

/// Cache settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileCache {
    pub stale_secs: Option<u64>,
    pub retries: Option<u32>,
}
