//! Commands posted to the worker by open pages.

use std::sync::atomic::Ordering;

use serde::{Deserialize, Serialize};
use swcache_core::{Error, RequestKey};
use tokio::task::JoinSet;

use super::ServiceWorker;
use crate::fetch::{FetchRequest, FetchResponse};

/// A page-to-worker message, tagged by its `type` field.
///
/// Unrecognized types deserialize to [`WorkerMessage::Unknown`] and are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
    CacheUrls {
        #[serde(default)]
        urls: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

impl WorkerMessage {
    /// Parse a message payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the payload is not a JSON object with
    /// a string `type`.
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload).map_err(|e| Error::InvalidInput(format!("malformed worker message: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    /// `activated` is set when a waiting worker was activated by the request.
    SkipWaitingRequested { activated: bool },
    Cached { count: usize },
    Ignored,
}

impl ServiceWorker {
    /// Handle a message from a page.
    pub async fn on_message(&self, message: WorkerMessage) -> Result<MessageOutcome, Error> {
        match message {
            WorkerMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(version = %self.config.version, "skip waiting requested by page");
                let activated = self.activate_if_waiting().await?.is_some();
                Ok(MessageOutcome::SkipWaitingRequested { activated })
            }
            WorkerMessage::CacheUrls { urls } => {
                let count = self.cache_urls(&urls).await?;
                Ok(MessageOutcome::Cached { count })
            }
            WorkerMessage::Unknown => {
                tracing::debug!("ignoring unknown worker message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Fetch every URL and store them all, or store nothing.
    async fn cache_urls(&self, urls: &[String]) -> Result<usize, Error> {
        if urls.is_empty() {
            return Ok(0);
        }

        let requests = urls
            .iter()
            .map(|u| self.config.resolve(u).map(FetchRequest::get))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = requests.len(), cache = %self.config.cache_name, "caching urls on request");

        let mut join_set = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            join_set.spawn(async move {
                let result = fetcher.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<(usize, RequestKey, FetchResponse)> = Vec::with_capacity(urls.len());
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::BatchFailed(format!("fetch task failed: {e}")))?;
            let response = result.map_err(|e| Error::BatchFailed(format!("{}: {e}", request.url)))?;
            if !response.is_cacheable() {
                return Err(Error::BatchFailed(format!(
                    "{}: bad response status {}",
                    request.url,
                    response.status.as_u16()
                )));
            }
            fetched.push((index, request.cache_key(), response));
        }
        fetched.sort_by_key(|(index, _, _)| *index);

        let entries = fetched.into_iter().map(|(_, key, response)| (key, response.to_cached())).collect::<Vec<_>>();
        let count = entries.len();

        let cache = self.db.open_cache(&self.config.cache_name).await?;
        cache.put_all(entries).await?;

        tracing::info!(count, cache = %self.config.cache_name, "cached urls");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use swcache_core::CacheDb;

    use super::*;
    use crate::worker::testing::{ORIGIN, ScriptedFetcher, activated_worker, app_config, installed_worker, url, worker_with};
    use crate::worker::{ResponseSource, WorkerState};

    #[test]
    fn test_parse_messages() {
        assert_eq!(WorkerMessage::from_json(r#"{"type":"SKIP_WAITING"}"#).unwrap(), WorkerMessage::SkipWaiting);
        assert_eq!(
            WorkerMessage::from_json(r#"{"type":"CACHE_URLS","urls":["/a","/b"]}"#).unwrap(),
            WorkerMessage::CacheUrls { urls: vec!["/a".into(), "/b".into()] }
        );
        assert_eq!(WorkerMessage::from_json(r#"{"type":"CLEAR_ALL"}"#).unwrap(), WorkerMessage::Unknown);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(WorkerMessage::from_json("not json"), Err(Error::InvalidInput(_))));
        assert!(matches!(WorkerMessage::from_json(r#"{"urls":[]}"#), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_skip_waiting_on_active_worker() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let (worker, _db) = activated_worker(fetcher).await;

        let outcome = worker.on_message(WorkerMessage::SkipWaiting).await.unwrap();
        assert_eq!(outcome, MessageOutcome::SkipWaitingRequested { activated: false });
        assert!(worker.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_waiting_worker() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let (worker, db) = installed_worker(fetcher.clone()).await;
        db.open_cache("urbandream-cache-v3.0.1").await.unwrap();

        let outcome = worker.on_message(WorkerMessage::SkipWaiting).await.unwrap();

        assert_eq!(outcome, MessageOutcome::SkipWaitingRequested { activated: true });
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(worker.clients_claimed());
        assert_eq!(db.cache_names().await.unwrap(), vec!["urbandream-cache-v3.0.2"]);

        let before = fetcher.calls();
        let outcome = worker.on_fetch(&FetchRequest::get(url("/static/styles.css"))).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(fetcher.calls(), before);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_only_records_request() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = worker_with(app_config(), db, fetcher);

        let outcome = worker.on_message(WorkerMessage::SkipWaiting).await.unwrap();
        assert_eq!(outcome, MessageOutcome::SkipWaitingRequested { activated: false });
        assert_eq!(worker.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_unknown_is_ignored() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let (worker, db) = activated_worker(fetcher.clone()).await;
        let before = db.cache_summaries().await.unwrap();
        let calls = fetcher.calls();

        assert_eq!(worker.on_message(WorkerMessage::Unknown).await.unwrap(), MessageOutcome::Ignored);
        assert_eq!(fetcher.calls(), calls);
        assert_eq!(db.cache_summaries().await.unwrap().len(), before.len());
    }

    #[tokio::test]
    async fn test_cache_urls_stores_all() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        fetcher.respond("/menu/", 200, "menu");
        fetcher.respond("/media/food/burger.jpg", 200, "burger");
        let (worker, db) = activated_worker(fetcher).await;

        let outcome = worker
            .on_message(WorkerMessage::CacheUrls { urls: vec!["/menu/".into(), "/media/food/burger.jpg".into()] })
            .await
            .unwrap();

        assert_eq!(outcome, MessageOutcome::Cached { count: 2 });
        for path in ["/menu/", "/media/food/burger.jpg"] {
            assert!(db.match_any(&RequestKey::get(&format!("{ORIGIN}{path}"))).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_cache_urls_is_all_or_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        fetcher.respond("/menu/", 200, "menu");
        fetcher.respond("/deals/", 200, "deals");
        fetcher.fail("/gone/");
        let (worker, db) = activated_worker(fetcher).await;
        let cache = db.open_cache(&worker.config().cache_name).await.unwrap();
        let before = cache.len().await.unwrap();

        let result = worker
            .on_message(WorkerMessage::CacheUrls { urls: vec!["/menu/".into(), "/gone/".into(), "/deals/".into()] })
            .await;

        assert!(matches!(result, Err(Error::BatchFailed(_))));
        assert_eq!(cache.len().await.unwrap(), before);
        assert!(db.match_any(&RequestKey::get(&format!("{ORIGIN}/menu/"))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_urls_rejects_error_status() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        fetcher.respond("/menu/", 200, "menu");
        let (worker, db) = activated_worker(fetcher).await;

        let result = worker
            .on_message(WorkerMessage::CacheUrls { urls: vec!["/menu/".into(), "/not-there/".into()] })
            .await;

        assert!(matches!(result, Err(Error::BatchFailed(msg)) if msg.contains("404")));
        assert!(db.match_any(&RequestKey::get(&format!("{ORIGIN}/menu/"))).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_urls_rejects_bad_url() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let (worker, _db) = activated_worker(fetcher.clone()).await;
        let calls = fetcher.calls();

        let result = worker.on_message(WorkerMessage::CacheUrls { urls: vec!["ftp://cafe.test/menu".into()] }).await;

        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_cache_urls_empty() {
        let fetcher = Arc::new(ScriptedFetcher::with_site());
        let (worker, _db) = installed_worker(fetcher).await;
        let outcome = worker.on_message(WorkerMessage::CacheUrls { urls: Vec::new() }).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Cached { count: 0 });
    }
}
