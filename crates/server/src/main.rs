//! mcp-swcache server entry point.
//!
//! Boots the caching worker, installs and activates it when configured to,
//! and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpFetcher, ServiceWorker, WorkerConfig};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version,
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "starting mcp-swcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;
    let worker = Arc::new(ServiceWorker::new(WorkerConfig::from_app(&config)?, db, Arc::new(fetcher)));

    if config.auto_activate {
        worker.on_install().await?;
        worker.activate_if_waiting().await?;
    }

    let handler = handler::SwCacheServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    worker.flush_writes().await;
    tracing::info!("mcp-swcache server stopped");

    Ok(())
}
