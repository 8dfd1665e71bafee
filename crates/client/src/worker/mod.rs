//! Offline caching worker engine.
//!
//! The engine is driven entirely through explicit hooks, each taking
//! constructed inputs and returning a value:
//!
//! - [`ServiceWorker::on_install`]: open the current cache and precache the manifest
//! - [`ServiceWorker::on_activate`]: delete every other cache generation, claim clients
//! - [`ServiceWorker::on_fetch`]: route a request and run its caching strategy
//! - [`ServiceWorker::on_message`]: `SKIP_WAITING` / `CACHE_URLS` commands from pages
//! - [`ServiceWorker::on_sync`]: background sync tags
//!
//! ### Concurrency
//! Any number of `on_fetch` calls may run at once. The cache store is the
//! only shared state. Opportunistic cache writes are spawned and never
//! awaited on the response path; concurrent writes to one key are last
//! writer wins.

pub mod config;
pub mod lifecycle;
pub mod message;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use swcache_core::{CacheDb, CachedResponse, Error, RequestKey};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

pub use config::WorkerConfig;
pub use lifecycle::{ActivateReport, InstallReport, PrecacheFailure, WorkerState};
pub use message::{MessageOutcome, WorkerMessage};
pub use router::{BypassReason, Route, classify};

/// Where a delivered response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
    Placeholder,
}

/// Result of handling an intercepted request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker did not handle the request; forward it to the network
    /// unmodified.
    Passthrough,
    /// The worker produced a response.
    Respond { response: FetchResponse, source: ResponseSource },
    /// Network and cache both failed; the page sees a network error.
    NetworkError(Error),
}

impl FetchOutcome {
    fn network(response: FetchResponse) -> Self {
        FetchOutcome::Respond { response, source: ResponseSource::Network }
    }

    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Outcome of a background sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Handled,
    Ignored,
}

/// Tag pages register to replay orders placed while offline.
pub const SYNC_ORDERS_TAG: &str = "sync-orders";

/// The caching worker for one cache version.
pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    writes: Mutex<JoinSet<()>>,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            fetcher,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.db
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether immediate activation has been requested, by install or by a
    /// `SKIP_WAITING` message.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation has taken control of open pages.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Route for `request`, without handling it.
    pub fn route(&self, request: &FetchRequest) -> Route {
        classify(&self.config, request)
    }

    /// Handle an intercepted request.
    ///
    /// Only an activated worker intercepts; before that every request passes
    /// through.
    pub async fn on_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let state = self.state().await;
        if !state.can_intercept_fetch() {
            tracing::debug!(url = %request.url, %state, "worker not active, passing request through");
            return FetchOutcome::Passthrough;
        }

        let route = self.route(request);
        tracing::debug!(url = %request.url, ?route, "routing request");

        match route {
            Route::Passthrough(_) => FetchOutcome::Passthrough,
            Route::Manifest => self.network_first_manifest(request).await,
            Route::Navigation => self.network_first_page(request).await,
            Route::Asset => self.cache_first_asset(request).await,
        }
    }

    /// Send `request` to the network unmodified, without touching any cache.
    ///
    /// This is what the host does with a [`FetchOutcome::Passthrough`].
    pub async fn forward(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        tracing::debug!(method = %request.method, url = %request.url, "forwarding request to network");
        self.fetcher.fetch(request).await
    }

    /// Handle a background sync event.
    pub async fn on_sync(&self, tag: &str) -> SyncOutcome {
        if tag == SYNC_ORDERS_TAG {
            // Orders are queued and replayed by the page itself; the worker
            // only marks the sync point.
            tracing::info!(tag, version = %self.config.version, "syncing offline orders");
            SyncOutcome::Handled
        } else {
            tracing::debug!(tag, "ignoring unknown sync tag");
            SyncOutcome::Ignored
        }
    }

    /// Store a response in the current cache without blocking the caller.
    ///
    /// The write runs as its own task. Failures are logged and dropped; the
    /// page already has its response.
    pub(crate) async fn best_effort_store(&self, key: RequestKey, response: CachedResponse) {
        let db = self.db.clone();
        let cache_name = self.config.cache_name.clone();

        let mut writes = self.writes.lock().await;
        while writes.try_join_next().is_some() {}

        writes.spawn(async move {
            // A retired generation stays deleted; its late writes are dropped.
            let result = match db.existing_cache(&cache_name).await {
                Ok(Some(cache)) => cache.put(&key, &response).await.map(|()| true),
                Ok(None) => Ok(false),
                Err(e) => Err(e),
            };
            match result {
                Ok(true) => tracing::debug!(cache = %cache_name, %key, "stored response"),
                Ok(false) => tracing::debug!(cache = %cache_name, %key, "cache no longer exists, write dropped"),
                Err(e) => tracing::warn!(cache = %cache_name, %key, error = %e, "cache write dropped"),
            }
        });
    }

    /// Wait for every pending best-effort write to finish.
    pub async fn flush_writes(&self) {
        let mut pending = std::mem::take(&mut *self.writes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "cache write task failed");
            }
        }
    }

    /// Look `key` up across all caches. Storage failures count as a miss.
    pub(crate) async fn lookup(&self, key: &RequestKey) -> Option<FetchResponse> {
        match self.db.match_any(key).await {
            Ok(Some(cached)) => match FetchResponse::from_cached(&cached) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "unreadable cache entry treated as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }
}
