//! Install and activate hooks.
//!
//! Install fills the current cache generation; activate deletes every other
//! generation. Whole-generation deletion is the only eviction there is.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde::Serialize;
use swcache_core::{Error, NamedCache};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::ServiceWorker;
use super::config::WorkerConfig;
use crate::fetch::{FetchRequest, Fetcher};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, not yet installed
    Parsed,
    Installing,
    /// Installed, waiting to activate
    Installed,
    Activating,
    /// Active and intercepting fetches
    Activated,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
        }
    }
}

/// A manifest entry that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub error: String,
}

/// Result of an install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    /// Manifest entries now in the cache, in manifest order.
    pub cached: Vec<String>,
    /// Manifest entries that failed, in manifest order.
    pub failed: Vec<PrecacheFailure>,
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Stale generations that were deleted.
    pub deleted: Vec<String>,
}

async fn precache_one(
    fetcher: &dyn Fetcher, cache: &NamedCache, config: &WorkerConfig, entry: &str,
) -> Result<(), Error> {
    let url = config.resolve(entry)?;
    let request = FetchRequest::get(url);
    let response = fetcher.fetch(&request).await?;

    if !response.is_cacheable() {
        return Err(Error::Network(format!("bad response status {}", response.status.as_u16())));
    }

    cache.put(&request.cache_key(), &response.to_cached()).await
}

impl ServiceWorker {
    async fn transition(&self, allowed: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !allowed.contains(&*state) {
            return Err(Error::InvalidState(format!("cannot move from {} to {}", *state, to)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    /// Install this version: open its cache and precache the manifest.
    ///
    /// Individual manifest entries may fail; they are reported, not fatal.
    /// Only failing to open the cache fails the install.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Installed], WorkerState::Installing)
            .await?;

        tracing::info!(version = %self.config.version, "installing worker");

        let cache = match self.db.open_cache(&self.config.cache_name).await {
            Ok(cache) => cache,
            Err(e) => {
                self.set_state(WorkerState::Parsed).await;
                tracing::error!(cache = %self.config.cache_name, error = %e, "install failed");
                return Err(e);
            }
        };

        let install_list = self.config.install_list();
        tracing::info!(cache = %self.config.cache_name, entries = install_list.len(), "precaching assets");

        let semaphore = Arc::new(Semaphore::new(self.config.precache_concurrency));
        let mut join_set = JoinSet::new();

        for (index, entry) in install_list.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let cache = cache.clone();
            let config = self.config.clone();

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = semaphore.acquire_owned().await;
                let result = precache_one(fetcher.as_ref(), &cache, &config, &entry).await;
                (index, entry, result)
            });
        }

        let mut results = Vec::with_capacity(install_list.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!(error = %e, "precache task failed"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = InstallReport { cache_name: self.config.cache_name.clone(), cached: Vec::new(), failed: Vec::new() };
        for (_, entry, result) in results {
            match result {
                Ok(()) => report.cached.push(entry),
                Err(e) => {
                    tracing::warn!(url = %entry, error = %e, "precache failed, continuing");
                    report.failed.push(PrecacheFailure { url: entry, error: e.to_string() });
                }
            }
        }

        let offline_path = self.config.offline_url.path();
        if !report.cached.iter().any(|entry| entry == offline_path || entry == self.config.offline_url.as_str()) {
            tracing::warn!(
                offline_url = %self.config.offline_url,
                "offline page was not precached; offline navigations will fail"
            );
        }

        self.skip_waiting.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Installed).await;

        tracing::info!(
            version = %self.config.version,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "worker installed, skip waiting"
        );

        Ok(report)
    }

    /// Activate this version: delete every other cache generation and take
    /// control of open pages.
    ///
    /// A storage error aborts activation and leaves the worker installed.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        tracing::info!(version = %self.config.version, "activating worker");

        match self.delete_stale_caches().await {
            Ok(deleted) => {
                self.clients_claimed.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Activated).await;
                tracing::info!(cache = %self.config.cache_name, deleted = deleted.len(), "worker activated, clients claimed");
                Ok(ActivateReport { cache_name: self.config.cache_name.clone(), deleted })
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                tracing::error!(error = %e, "activation failed, previous version stays in control");
                Err(e)
            }
        }
    }

    /// Activate now if skip-waiting was requested and the worker is
    /// installed and waiting. Returns `None` when there was nothing to do.
    pub async fn activate_if_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        if !self.skip_waiting.load(Ordering::SeqCst) {
            return Ok(None);
        }
        if self.state().await != WorkerState::Installed {
            return Ok(None);
        }
        self.on_activate().await.map(Some)
    }

    async fn delete_stale_caches(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.cache_names().await? {
            if name != self.config.cache_name {
                tracing::info!(cache = %name, "deleting old cache");
                if self.db.delete_cache(&name).await? {
                    deleted.push(name);
                }
            }
        }
        Ok(deleted)
    }
}
