//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        format!(
            r#"# dialdeck configuration

# Dialer server base URL (DIALDECK_API_URL overrides)
api_url = "{api_url}"

# Timeout for every API request, in seconds
request_timeout_secs = {timeout}

# Base delay before retrying a failed lead/campaign fetch (doubles per attempt, max 30s)
retry_delay_ms = {retry_delay}

# Call status polling. After max_failures consecutive failures polling pauses
# until a manual refresh ('r' in the dashboard).
[status]
poll_interval_ms = {poll_interval}
max_failures = {max_failures}

# Lead pages are served from cache for stale_secs after each fetch
[leads]
stale_secs = {leads_stale}
retries = {leads_retries}

# Campaign list cache
[campaigns]
stale_secs = {campaigns_stale}
retries = {campaigns_retries}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# File logging (in addition to dashboard buffer or stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            api_url = self.api_url,
            timeout = self.request_timeout_secs,
            retry_delay = self.retry_delay_ms,
            poll_interval = self.status.poll_interval_ms,
            max_failures = self.status.max_failures,
            leads_stale = self.leads.stale_secs,
            leads_retries = self.leads.retries,
            campaigns_stale = self.campaigns.stale_secs,
            campaigns_retries = self.campaigns.retries,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}
