//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `cache_prefix` or `origin` is empty
    /// - `offline_url`, `placeholder_url` or a bypass prefix is not an absolute path
    /// - `precache_concurrency` is outside 1..=16
    ///
    /// Returns `ConfigError::Missing` if `version` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set SWCACHE_VERSION to the cache generation to serve".into(),
            });
        }
        if self.cache_prefix.trim().is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.origin.trim().is_empty() {
            return Err(invalid("origin", "must not be empty"));
        }

        if !self.offline_url.starts_with('/') {
            return Err(invalid("offline_url", "must be an absolute path"));
        }
        if !self.placeholder_url.starts_with('/') {
            return Err(invalid("placeholder_url", "must be an absolute path"));
        }
        if let Some(prefix) = self.bypass_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "bypass_prefixes".into(),
                reason: format!("{prefix:?} must be an absolute path"),
            });
        }
        if self.manifest_name.is_empty() {
            return Err(invalid("manifest_name", "must not be empty"));
        }

        if self.precache_concurrency == 0 || self.precache_concurrency > 16 {
            return Err(invalid("precache_concurrency", "must be between 1 and 16"));
        }

        if !self.precache.iter().any(|u| u == &self.offline_url) {
            tracing::warn!(
                offline_url = %self.offline_url,
                "offline_url is not listed in precache; it will be added to the install list"
            );
        }

        Ok(())
    }
}
