//! Runtime configuration for sync orchestration.

use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "KICKFEED_API_URL";

/// Environment variable overriding the periodic sync interval (seconds).
pub const SYNC_INTERVAL_ENV: &str = "KICKFEED_SYNC_INTERVAL_SECS";

/// Default backend used when no override is configured.
pub const DEFAULT_API_URL: &str = "https://api.kickfeed.app";

/// Periodic sync cadence in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60 * 60;

/// Maximum jitter (seconds) added to periodic intervals.
pub const DEFAULT_SYNC_INTERVAL_JITTER_SECS: u64 = 30;

/// How long the "data changed" pulse stays raised.
pub const DEFAULT_DATA_CHANGED_PULSE_MS: u64 = 1_500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_url: String,
    pub sync_interval: Duration,
    pub interval_jitter: Duration,
    pub data_changed_pulse: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            interval_jitter: Duration::from_secs(DEFAULT_SYNC_INTERVAL_JITTER_SECS),
            data_changed_pulse: Duration::from_millis(DEFAULT_DATA_CHANGED_PULSE_MS),
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `KICKFEED_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(SYNC_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.sync_interval = Duration::from_secs(secs),
                _ => log::warn!(
                    "[Config] Ignoring invalid {}='{}', keeping {}s",
                    SYNC_INTERVAL_ENV,
                    raw,
                    config.sync_interval.as_secs()
                ),
            }
        }
        config
    }
}
