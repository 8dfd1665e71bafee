//! Immutable engine configuration.
//!
//! Built once from [`AppConfig`] and shared by every handler. Nothing in it
//! changes at runtime; a new version means a new worker.

use regex::Regex;
use reqwest::Url;
use swcache_core::{AppConfig, ConfigError, Error};

use crate::fetch::resolve;

/// Browser-extension schemes the worker never intercepts.
pub const EXTENSION_SCHEMES: &[&str] = &["chrome-extension", "moz-extension", "safari-web-extension"];

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub version: String,
    /// `{prefix}-{version}`; the only cache that survives activation.
    pub cache_name: String,
    pub origin: Url,
    /// Manifest entries exactly as configured (paths or absolute URLs).
    pub precache: Vec<String>,
    pub runtime_patterns: Vec<Regex>,
    pub offline_url: Url,
    pub placeholder_url: Url,
    pub manifest_name: String,
    pub bypass_prefixes: Vec<String>,
    pub extension_schemes: Vec<String>,
    pub precache_concurrency: usize,
}

impl WorkerConfig {
    /// Build the engine configuration, compiling patterns and resolving
    /// fallback URLs against the origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin, a fallback URL or a
    /// runtime pattern doesn't parse.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = Url::parse(&config.origin).map_err(|e| ConfigError::Invalid {
            field: "origin".into(),
            reason: e.to_string(),
        })?;

        let runtime_patterns = config
            .runtime_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::Invalid {
                    field: "runtime_patterns".into(),
                    reason: format!("{p:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let offline_url = resolve(&origin, &config.offline_url)
            .map_err(|e| ConfigError::Invalid { field: "offline_url".into(), reason: e.to_string() })?;
        let placeholder_url = resolve(&origin, &config.placeholder_url)
            .map_err(|e| ConfigError::Invalid { field: "placeholder_url".into(), reason: e.to_string() })?;

        Ok(Self {
            version: config.version.clone(),
            cache_name: config.cache_name(),
            origin,
            precache: config.precache.clone(),
            runtime_patterns,
            offline_url,
            placeholder_url,
            manifest_name: config.manifest_name.clone(),
            bypass_prefixes: config.bypass_prefixes.clone(),
            extension_schemes: EXTENSION_SCHEMES.iter().map(|s| s.to_string()).collect(),
            precache_concurrency: config.precache_concurrency,
        })
    }

    /// Resolve a path or URL against the worker origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// URLs fetched on install: the precache manifest, deduplicated, with the
    /// offline page appended when the manifest leaves it out.
    pub fn install_list(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut list = Vec::with_capacity(self.precache.len() + 1);

        for entry in &self.precache {
            let identity = self.resolve(entry).map(|u| u.to_string()).unwrap_or_else(|_| entry.clone());
            if seen.insert(identity) {
                list.push(entry.clone());
            }
        }

        if seen.insert(self.offline_url.to_string()) {
            list.push(self.offline_url.path().to_string());
        }

        list
    }

    /// Whether a path is eligible for opportunistic caching.
    pub fn is_runtime_cacheable(&self, path: &str) -> bool {
        self.runtime_patterns.iter().any(|p| p.is_match(path))
    }
}
