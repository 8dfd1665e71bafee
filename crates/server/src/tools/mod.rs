//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

pub mod cache;
pub mod worker_fetch;
pub mod worker_lifecycle;
pub mod worker_message;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Encode a tool output as a pretty JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Pull the JSON text back out of a tool result.
#[cfg(test)]
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("expected text content");
    serde_json::from_str(text).unwrap()
}

/// Worker for `origin` backed by a real HTTP fetcher and an in-memory store.
#[cfg(test)]
pub(crate) async fn worker_at(origin: &str) -> std::sync::Arc<swcache_client::ServiceWorker> {
    use swcache_client::{FetchConfig, HttpFetcher, ServiceWorker, WorkerConfig};
    use swcache_core::{AppConfig, CacheDb};

    let config = AppConfig { origin: origin.into(), timeout_ms: 2000, ..Default::default() };
    let fetcher = HttpFetcher::new(FetchConfig::from(&config)).unwrap();
    let db = CacheDb::open_in_memory().await.unwrap();
    std::sync::Arc::new(ServiceWorker::new(WorkerConfig::from_app(&config).unwrap(), db, std::sync::Arc::new(fetcher)))
}

/// Worker pointed at a closed local port, so every fetch rejects.
#[cfg(test)]
pub(crate) async fn offline_worker() -> std::sync::Arc<swcache_client::ServiceWorker> {
    worker_at("http://127.0.0.1:9").await
}

/// Local HTTP origin answering every request with `200` and `body`.
/// Returns the origin URL.
#[cfg(test)]
pub(crate) async fn serve_ok(body: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}
