use std::time::Duration;

use kickfeed_core::config::SyncConfig;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl NetworkConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl From<&SyncConfig> for NetworkConfig {
    fn from(config: &SyncConfig) -> Self {
        Self::new(&config.api_url)
    }
}
