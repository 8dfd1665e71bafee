//! Request classification.
//!
//! Decides, before any cache or network access, whether the engine handles a
//! request and with which strategy.

use reqwest::Method;
use serde::Serialize;

use super::config::WorkerConfig;
use crate::fetch::FetchRequest;

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    NonGet,
    ExtensionScheme,
    BypassPrefix,
}

/// Strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "route", content = "reason")]
pub enum Route {
    /// No cache read or write; the host forwards the request as-is.
    Passthrough(BypassReason),
    /// Network first, cached copy when offline.
    Manifest,
    /// Network first, then cache, then the offline page.
    Navigation,
    /// Cache first, then network with opportunistic caching.
    Asset,
}

/// Classify `request` against the routing table.
///
/// Rows are checked in order; the first match wins.
pub fn classify(config: &WorkerConfig, request: &FetchRequest) -> Route {
    if request.method != Method::GET {
        return Route::Passthrough(BypassReason::NonGet);
    }

    let scheme = request.url.scheme();
    if config.extension_schemes.iter().any(|s| s == scheme) {
        return Route::Passthrough(BypassReason::ExtensionScheme);
    }

    let path = request.url.path();
    if config.bypass_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
        return Route::Passthrough(BypassReason::BypassPrefix);
    }

    if path.ends_with(config.manifest_name.as_str()) {
        return Route::Manifest;
    }

    if request.accepts_html() {
        return Route::Navigation;
    }

    Route::Asset
}
