//! Network fetch primitive.
//!
//! ### Contract
//! - A fetch either yields a response (any status) or rejects.
//! - Non-2xx statuses are responses, not errors; callers decide what is
//!   cacheable.
//! - Rejections cover offline, DNS, connection and timeout failures.
//!
//! ### Bounds
//! - Request timeout: 20s (configurable); a hung connection becomes a
//!   rejection so cache fallbacks still run.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use std::time::{Duration, Instant};

pub use request::{Destination, FetchRequest};
pub use url::{UrlError, canonicalize, resolve};

use swcache_core::{AppConfig, CachedResponse, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// Response from the network or rebuilt from a cache entry.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL the response belongs to
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds (0 for cache hits)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Content-Type header, if present and valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Whether this response may be written to a cache.
    ///
    /// Any 2xx except 206: a partial body must never be replayed as the
    /// whole resource.
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success() && self.status != StatusCode::PARTIAL_CONTENT
    }

    /// Snapshot for storage.
    pub fn to_cached(&self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        CachedResponse {
            url: self.url.to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.bytes.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    pub fn from_cached(cached: &CachedResponse) -> Result<Self, Error> {
        let url = Url::parse(&cached.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", cached.url)))?;
        let status = StatusCode::from_u16(cached.status)
            .map_err(|e| Error::CorruptEntry(format!("status {}: {e}", cached.status)))?;

        let mut headers = HeaderMap::with_capacity(cached.headers.len());
        for (name, value) in &cached.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header {name}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(format!("header {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, bytes: Bytes::from(cached.body.clone()), fetch_ms: 0 })
    }
}

/// The network, as seen by the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform `request`, yielding any response or rejecting.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{} after {:?}", request.url, self.config.timeout))
                } else {
                    Error::Network(format!("{}: {}", request.url, e))
                }
            })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{} body after {:?}", request.url, self.config.timeout))
            } else {
                Error::Network(format!("failed to read response: {}", e))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, status, headers, bytes, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(status: StatusCode) -> FetchResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
        FetchResponse {
            url: Url::parse("https://cafe.test/static/styles.css").unwrap(),
            status,
            headers,
            bytes: Bytes::from_static(b"body{}"),
            fetch_ms: 12,
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, user_agent: "cafe/2".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "cafe/2");
    }

    #[test]
    fn test_is_cacheable() {
        assert!(make_response(StatusCode::OK).is_cacheable());
        assert!(make_response(StatusCode::NO_CONTENT).is_cacheable());
        assert!(!make_response(StatusCode::PARTIAL_CONTENT).is_cacheable());
        assert!(!make_response(StatusCode::NOT_FOUND).is_cacheable());
        assert!(!make_response(StatusCode::INTERNAL_SERVER_ERROR).is_cacheable());
    }

    #[test]
    fn test_cached_snapshot_restores_response() {
        let response = make_response(StatusCode::OK);
        let restored = FetchResponse::from_cached(&response.to_cached()).unwrap();

        assert_eq!(restored.url, response.url);
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.bytes, response.bytes);
        assert_eq!(restored.content_type(), Some("text/css"));
        assert_eq!(restored.headers.get(header::VARY).unwrap(), "Accept-Encoding");
        assert_eq!(restored.fetch_ms, 0);
    }

    #[test]
    fn test_from_cached_rejects_corrupt_status() {
        let mut cached = make_response(StatusCode::OK).to_cached();
        cached.status = 42;
        assert!(matches!(FetchResponse::from_cached(&cached), Err(Error::CorruptEntry(_))));
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    /// Origin that accepts connections and never answers.
    async fn silent_origin() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_hung_connection_times_out() {
        let origin = silent_origin().await;
        let fetcher = HttpFetcher::new(FetchConfig { timeout: Duration::from_millis(200), ..Default::default() }).unwrap();

        let started = Instant::now();
        let result = fetcher.fetch(&FetchRequest::get(Url::parse(&format!("{origin}/menu/")).unwrap())).await;

        assert!(matches!(result, Err(Error::FetchTimeout(_))), "got {result:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_hung_navigation_falls_back_to_offline_page() {
        use crate::worker::{ResponseSource, ServiceWorker, WorkerConfig};
        use swcache_core::{CacheDb, RequestKey};

        let origin = silent_origin().await;
        let config = AppConfig { origin: origin.clone(), timeout_ms: 200, precache: vec!["/".into()], ..Default::default() };
        let fetcher = HttpFetcher::new(FetchConfig::from(&config)).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::new(WorkerConfig::from_app(&config).unwrap(), db.clone(), std::sync::Arc::new(fetcher));

        let report = worker.on_install().await.unwrap();
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().all(|f| f.error.contains("FETCH_TIMEOUT")));

        let offline_url = format!("{origin}/offline/");
        let offline = CachedResponse {
            url: offline_url.clone(),
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: b"you are offline".to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        db.open_cache(&config.cache_name()).await.unwrap().put(&RequestKey::get(&offline_url), &offline).await.unwrap();
        worker.on_activate().await.unwrap();

        let request = FetchRequest::navigate(Url::parse(&format!("{origin}/menu/")).unwrap());
        let outcome = worker.on_fetch(&request).await;

        assert_eq!(outcome.source(), Some(ResponseSource::OfflineFallback));
        assert_eq!(outcome.response().unwrap().bytes.as_ref(), b"you are offline");
    }
}
