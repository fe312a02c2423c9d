//! Configuration Module
//!
//! Handles loading and managing client configuration from environment variables.

use std::env;

use serde::Deserialize;

use crate::cache::DEFAULT_MAX_LOCAL_ENTRIES;

/// Cache client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix placed before every logical key, joined with a dot
    pub key_prefix: Option<String>,
    /// Suffix placed after every logical key, joined with a dot
    pub key_suffix: Option<String>,
    /// Default expiration in seconds for writes without an explicit one (0 = never)
    pub default_expiration: u64,
    /// Maximum number of entries an in-memory front retains
    pub max_local_entries: usize,
    /// Whether operations are reported to the metric sink
    pub metrics_enabled: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_KEY_PREFIX` - Key prefix (default: none)
    /// - `CACHE_KEY_SUFFIX` - Key suffix (default: none)
    /// - `CACHE_DEFAULT_EXPIRATION` - Default expiration in seconds (default: 0)
    /// - `CACHE_MAX_LOCAL_ENTRIES` - Front capacity (default: 100)
    /// - `CACHE_METRICS_ENABLED` - `true`/`1` enables metrics (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            key_prefix: non_empty_var("CACHE_KEY_PREFIX"),
            key_suffix: non_empty_var("CACHE_KEY_SUFFIX"),
            default_expiration: env::var("CACHE_DEFAULT_EXPIRATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_expiration),
            max_local_entries: env::var("CACHE_MAX_LOCAL_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_local_entries),
            metrics_enabled: env::var("CACHE_METRICS_ENABLED")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Sets the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the key suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = Some(suffix.into());
        self
    }

    /// Sets the default expiration in seconds.
    pub fn with_default_expiration(mut self, seconds: u64) -> Self {
        self.default_expiration = seconds;
        self
    }

    /// Sets the front capacity.
    pub fn with_max_local_entries(mut self, max: usize) -> Self {
        self.max_local_entries = max;
        self
    }

    /// Enables or disables metric reporting.
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: None,
            key_suffix: None,
            default_expiration: 0,
            max_local_entries: DEFAULT_MAX_LOCAL_ENTRIES,
            metrics_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.key_prefix, None);
        assert_eq!(config.key_suffix, None);
        assert_eq!(config.default_expiration, 0);
        assert_eq!(config.max_local_entries, 100);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_KEY_PREFIX");
        env::remove_var("CACHE_KEY_SUFFIX");
        env::remove_var("CACHE_DEFAULT_EXPIRATION");
        env::remove_var("CACHE_MAX_LOCAL_ENTRIES");
        env::remove_var("CACHE_METRICS_ENABLED");

        let config = CacheConfig::from_env();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_config_builders() {
        let config = CacheConfig::default()
            .with_prefix("app")
            .with_suffix("v2")
            .with_default_expiration(60)
            .with_max_local_entries(3)
            .with_metrics(true);

        assert_eq!(config.key_prefix.as_deref(), Some("app"));
        assert_eq!(config.key_suffix.as_deref(), Some("v2"));
        assert_eq!(config.default_expiration, 60);
        assert_eq!(config.max_local_entries, 3);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"key_prefix": "sessions", "default_expiration": 30}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.key_prefix.as_deref(), Some("sessions"));
        assert_eq!(config.default_expiration, 30);
        assert_eq!(config.max_local_entries, 100);
        assert!(!config.metrics_enabled);
    }
}
