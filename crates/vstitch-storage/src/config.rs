//! Fetcher configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Asset retrieval configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Service-account JSON; falls back to GOOGLE_APPLICATION_CREDENTIALS
    pub credentials_path: Option<PathBuf>,
    /// Hosts that receive the bearer token
    pub authorized_hosts: Vec<String>,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            authorized_hosts: vec!["www.googleapis.com".to_string()],
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            credentials_path: std::env::var("CREDENTIALS_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            authorized_hosts: std::env::var("AUTHORIZED_HOSTS")
                .map(|s| {
                    s.split(',')
                        .map(|h| h.trim().to_ascii_lowercase())
                        .filter(|h| !h.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.authorized_hosts),
            timeout: Duration::from_secs(
                std::env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("FETCH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}
