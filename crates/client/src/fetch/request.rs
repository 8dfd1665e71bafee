//! Intercepted request model.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use swcache_core::RequestKey;

/// What the page intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl std::str::FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(format!("unknown destination: {other}")),
        }
    }
}

/// A request intercepted from a page.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub destination: Destination,
}

impl FetchRequest {
    /// A plain GET with no headers.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, headers: HeaderMap::new(), destination: Destination::Empty }
    }

    /// A top-level page navigation, as a browser would issue it.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .with_destination(Destination::Document)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header. Values that are not valid header text are dropped.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Whether the `Accept` header asks for HTML. A missing header does not.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }

    /// Normalized cache identity: method plus URL without fragment.
    pub fn cache_key(&self) -> RequestKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey::new(self.method.as_str(), url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_navigate_accepts_html() {
        let request = FetchRequest::navigate(url("https://cafe.test/menu/"));
        assert!(request.accepts_html());
        assert_eq!(request.destination, Destination::Document);
    }

    #[test]
    fn test_missing_accept_is_not_html() {
        let request = FetchRequest::get(url("https://cafe.test/menu/"));
        assert!(!request.accepts_html());
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let request = FetchRequest::get(url("https://cafe.test/menu/?page=2#specials"));
        let key = request.cache_key();
        assert_eq!(key.method, "GET");
        assert_eq!(key.url, "https://cafe.test/menu/?page=2");
    }

    #[test]
    fn test_destination_from_str() {
        assert_eq!("image".parse::<Destination>().unwrap(), Destination::Image);
        assert_eq!("Style".parse::<Destination>().unwrap(), Destination::Style);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
        assert!("video".parse::<Destination>().is_err());
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let request = FetchRequest::get(url("https://cafe.test/")).with_header(header::ACCEPT, "text/html\n");
        assert!(request.headers.is_empty());
    }
}
