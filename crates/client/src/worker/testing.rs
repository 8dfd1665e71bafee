//! Scripted network and worker builders shared by the worker tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use swcache_core::{AppConfig, CacheDb, Error};

use super::{ServiceWorker, WorkerConfig};
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

pub(crate) const ORIGIN: &str = "https://cafe.test";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn app_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

/// In-memory origin server keyed by path.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    routes: Mutex<HashMap<String, (u16, String)>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    /// Serves every default precache entry.
    pub(crate) fn with_site() -> Self {
        let fetcher = Self::default();
        for path in app_config().precache {
            fetcher.respond(&path, 200, &format!("content of {path}"));
        }
        fetcher.respond("/offline/", 200, "you are offline");
        fetcher.respond("/manifest.json", 200, r#"{"name":"Urban Dream","start_url":"/"}"#);
        fetcher
    }

    pub(crate) fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), (status, body.to_string()));
        self.failing.lock().unwrap().remove(path);
    }

    /// Make fetches of `path` reject.
    pub(crate) fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    /// Make every fetch reject.
    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = request.url.path();

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        if self.failing.lock().unwrap().contains(path) {
            return Err(Error::Network(format!("connection refused: {}", request.url)));
        }

        let (status, body) =
            self.routes.lock().unwrap().get(path).cloned().unwrap_or((404, "not found".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes: Bytes::from(body),
            fetch_ms: 1,
        })
    }
}

pub(crate) fn worker_with(config: AppConfig, db: CacheDb, fetcher: Arc<ScriptedFetcher>) -> ServiceWorker {
    ServiceWorker::new(WorkerConfig::from_app(&config).unwrap(), db, fetcher)
}

pub(crate) async fn installed_worker(fetcher: Arc<ScriptedFetcher>) -> (ServiceWorker, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = worker_with(app_config(), db.clone(), fetcher);
    worker.on_install().await.unwrap();
    (worker, db)
}

pub(crate) async fn activated_worker(fetcher: Arc<ScriptedFetcher>) -> (ServiceWorker, CacheDb) {
    let (worker, db) = installed_worker(fetcher).await;
    worker.on_activate().await.unwrap();
    (worker, db)
}
