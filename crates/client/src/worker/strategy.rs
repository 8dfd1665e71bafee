//! Caching strategies.
//!
//! | route | first source | fallback chain |
//! |---|---|---|
//! | manifest | network (store on success) | cache |
//! | navigation | network (store on success) | cache, offline page |
//! | asset | cache | network (store if runtime pattern matches), placeholder for images |
//!
//! No strategy waits for its cache write before answering.

use swcache_core::RequestKey;

use super::{FetchOutcome, ResponseSource, ServiceWorker};
use crate::fetch::{Destination, FetchRequest, FetchResponse};

impl ServiceWorker {
    /// Manifest: always try the network so install prompts see fresh data.
    pub(crate) async fn network_first_manifest(&self, request: &FetchRequest) -> FetchOutcome {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_if_cacheable(key, &response).await;
                FetchOutcome::network(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "manifest fetch failed, trying cache");
                match self.lookup(&key).await {
                    Some(response) => FetchOutcome::Respond { response, source: ResponseSource::Cache },
                    None => FetchOutcome::NetworkError(err),
                }
            }
        }
    }

    /// Navigation: fresh HTML when online, the last good copy or the offline
    /// page when not.
    pub(crate) async fn network_first_page(&self, request: &FetchRequest) -> FetchOutcome {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store_if_cacheable(key, &response).await;
                FetchOutcome::network(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation failed, trying cache");
                if let Some(response) = self.lookup(&key).await {
                    return FetchOutcome::Respond { response, source: ResponseSource::Cache };
                }

                let offline_key = RequestKey::get(self.config.offline_url.as_str());
                match self.lookup(&offline_key).await {
                    Some(response) => FetchOutcome::Respond { response, source: ResponseSource::OfflineFallback },
                    None => {
                        tracing::warn!(
                            url = %request.url,
                            offline_url = %self.config.offline_url,
                            "offline page is not cached, navigation fails"
                        );
                        FetchOutcome::NetworkError(err)
                    }
                }
            }
        }
    }

    /// Asset: cached copies are served as-is with no freshness check.
    pub(crate) async fn cache_first_asset(&self, request: &FetchRequest) -> FetchOutcome {
        let key = request.cache_key();

        if let Some(response) = self.lookup(&key).await {
            return FetchOutcome::Respond { response, source: ResponseSource::Cache };
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if self.config.is_runtime_cacheable(request.url.path()) {
                    self.store_if_cacheable(key, &response).await;
                }
                FetchOutcome::network(response)
            }
            Err(err) => {
                tracing::info!(url = %request.url, error = %err, "asset fetch failed");
                if request.destination != Destination::Image {
                    return FetchOutcome::NetworkError(err);
                }

                let placeholder_key = RequestKey::get(self.config.placeholder_url.as_str());
                match self.lookup(&placeholder_key).await {
                    Some(response) => FetchOutcome::Respond { response, source: ResponseSource::Placeholder },
                    None => FetchOutcome::NetworkError(err),
                }
            }
        }
    }

    async fn store_if_cacheable(&self, key: RequestKey, response: &FetchResponse) {
        if response.is_cacheable() {
            self.best_effort_store(key, response.to_cached()).await;
        } else {
            tracing::debug!(%key, status = response.status.as_u16(), "response not cacheable");
        }
    }
}
