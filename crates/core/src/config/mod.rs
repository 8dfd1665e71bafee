//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network fetch timeout in milliseconds.
    ///
    /// A timed out fetch is treated like any other network rejection and
    /// triggers the strategy's cache fallback.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed by the network fetcher.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Origin the worker is registered for. Relative manifest entries are
    /// resolved against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of every cache name; the version is appended.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache version. Bump it to retire the previous generation on the next
    /// activation.
    #[serde(default = "default_version")]
    pub version: String,

    /// URLs fetched and stored on install.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path regexes eligible for opportunistic caching.
    #[serde(default = "default_runtime_patterns")]
    pub runtime_patterns: Vec<String>,

    /// Page served when a navigation fails and nothing is cached for it.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Image served when an image request fails and nothing is cached for it.
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,

    /// File name that routes a request to the manifest strategy.
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Path prefixes the worker never intercepts.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    /// Maximum number of concurrent precache fetches during install.
    #[serde(default = "default_precache_concurrency")]
    pub precache_concurrency: usize,

    /// Whether the host installs and activates the worker at startup.
    #[serde(default = "default_true")]
    pub auto_activate: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_cache_prefix() -> String {
    "urbandream-cache".into()
}

fn default_version() -> String {
    "v3.0.2".into()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/static/styles.css",
        "/static/js/order_detail.js",
        "/static/js/homepage.js",
        "/static/images/favicon.png",
        "/static/images/bg.jpeg",
        "/static/images/bg-pattern.jpg",
        "/manifest.json",
        "/offline/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_runtime_patterns() -> Vec<String> {
    vec!["^/static/".into(), "^/media/".into()]
}

fn default_offline_url() -> String {
    "/offline/".into()
}

fn default_placeholder_url() -> String {
    "/static/images/placeholder.png".into()
}

fn default_manifest_name() -> String {
    "manifest.json".into()
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["/backend/".into(), "/api/".into()]
}

fn default_precache_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            precache: default_precache(),
            runtime_patterns: default_runtime_patterns(),
            offline_url: default_offline_url(),
            placeholder_url: default_placeholder_url(),
            manifest_name: default_manifest_name(),
            bypass_prefixes: default_bypass_prefixes(),
            precache_concurrency: default_precache_concurrency(),
            auto_activate: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the cache owned by the configured version.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
