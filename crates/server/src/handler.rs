//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker engine and the cache store.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheGetParams, get_impl, list_impl},
    worker_fetch::{WorkerFetchParams, fetch_impl},
    worker_lifecycle::{WorkerSyncParams, activate_impl, install_impl, sync_impl},
    worker_message::{WorkerMessageParams, message_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::ServiceWorker;

/// The main MCP server handler for mcp-swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: open the versioned cache and precache the asset manifest. Returns which entries were cached and which failed.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate an installed worker: delete every cache generation except the current one and claim open pages.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route a request through the worker.
    ///
    /// Network-first for the manifest and HTML navigations, cache-first for
    /// everything else. Non-GET, extension and API requests pass through and
    /// are forwarded to the network unmodified.
    #[tool(description = "Send a request through the caching worker. Returns the route taken, where the response came from, and the response itself. Pass-through requests are forwarded to the network without touching the cache.")]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a message to the worker. SKIP_WAITING activates an installed, waiting worker immediately; CACHE_URLS caches a list of URLs all-or-nothing.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire a background sync event with the given tag.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Look up a cached response by URL, across all caches or within one named cache.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.cache(), &self.worker.config().origin, params.0).await
    }

    #[tool(description = "List every cache with its entry count, in creation order.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.worker.cache(), &self.worker.config().cache_name).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Offline caching worker for cache version {}.", self.worker.config().version)),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::offline_worker;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = SwCacheServer::new(offline_worker().await);
        let names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();

        for expected in [
            "worker_install",
            "worker_activate",
            "worker_fetch",
            "worker_message",
            "worker_sync",
            "cache_get",
            "cache_list",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SwCacheServer::new(offline_worker().await);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "mcp-swcache");
        assert!(info.instructions.unwrap().contains("v3.0.2"));
    }
}
