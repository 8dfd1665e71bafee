//! cache_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, CacheSummary};

use crate::tools::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Name of the cache owned by the running worker version.
    pub current: String,
    /// Every cache in creation order.
    pub caches: Vec<CacheSummary>,
}

pub async fn list_impl(cache: &CacheDb, current: &str) -> Result<CallToolResult, McpError> {
    let caches = cache.cache_summaries().await?;
    json_result(&CacheListOutput { current: current.to_string(), caches })
}
