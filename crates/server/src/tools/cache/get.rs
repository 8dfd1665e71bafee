//! cache_get tool implementation.
//!
//! Looks up a stored response by request URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_core::{CacheDb, CachedResponse, Error, RequestKey};
use url::Url;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or origin-relative path of the cached request.
    pub url: String,

    /// Only look in this cache. Searches every cache in creation order when
    /// omitted.
    #[serde(default)]
    pub cache: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body, lossily decoded as UTF-8.
    pub body: String,
    pub body_bytes: usize,
    pub stored_at: String,
}

impl From<CachedResponse> for CacheGetOutput {
    fn from(cached: CachedResponse) -> Self {
        Self {
            body: String::from_utf8_lossy(&cached.body).into_owned(),
            body_bytes: cached.body.len(),
            url: cached.url,
            status: cached.status,
            headers: cached.headers,
            stored_at: cached.stored_at,
        }
    }
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = RequestKey::get(url.as_str());

    let found = match params.cache.as_deref() {
        Some(name) => {
            if !cache.has_cache(name).await? {
                return Err(Error::CacheMiss(format!("no cache named {name}")).into());
            }
            cache.open_cache(name).await?.match_key(&key).await?
        }
        None => cache.match_any(&key).await?,
    };

    let cached = found.ok_or_else(|| Error::CacheMiss(key.to_string()))?;
    json_result(&CacheGetOutput::from(cached))
}
