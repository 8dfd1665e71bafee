//! worker_fetch tool implementation.
//!
//! Runs one request through the worker's router and caching strategy and
//! reports what the page would have received.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::{Destination, FetchOutcome, FetchRequest, Method, ResponseSource, Route, ServiceWorker, header};
use swcache_core::Error;
use url::Url;

use super::json_result;
use crate::error::ToolError;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// URL or origin-relative path to request. Browser-extension URLs are
    /// accepted and always pass through.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Accept header. Values containing "text/html" make the request a navigation.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request destination: document, image, script, style, font, manifest or empty.
    #[serde(default)]
    pub destination: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub route: Route,
    /// False when the worker passed the request through and it was
    /// forwarded to the network unmodified.
    pub handled: bool,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    /// Response body, lossily decoded as UTF-8.
    pub body: Option<String>,
    /// Set when both network and cache failed.
    pub error: Option<String>,
}

fn build_request(worker: &ServiceWorker, params: &WorkerFetchParams) -> Result<FetchRequest, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    // Extension URLs are kept as-is so they reach the router's scheme check.
    let url = match Url::parse(params.url.trim()) {
        Ok(url) if worker.config().extension_schemes.iter().any(|s| s == url.scheme()) => url,
        _ => resolve(&worker.config().origin, &params.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?,
    };

    let method = reqwest_method(&params.method)?;
    let mut request = FetchRequest::get(url).with_method(method);

    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header(header::ACCEPT, accept);
    }

    if let Some(destination) = params.destination.as_deref() {
        let destination = destination
            .parse::<Destination>()
            .map_err(|e| ToolError::InvalidParams(format!("destination: {e}")))?;
        request = request.with_destination(destination);
    }

    Ok(request)
}

fn reqwest_method(method: &str) -> Result<Method, McpError> {
    method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| ToolError::InvalidParams(format!("method: {method}")).into())
}

pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params)?;
    let route = worker.route(&request);
    let outcome = worker.on_fetch(&request).await;

    let mut output = WorkerFetchOutput {
        url: request.url.to_string(),
        route,
        handled: false,
        source: None,
        status: None,
        content_type: None,
        body: None,
        error: None,
    };

    let delivered = match outcome {
        FetchOutcome::Passthrough => worker.forward(&request).await.map(|r| (r, ResponseSource::Network)),
        FetchOutcome::Respond { response, source } => {
            output.handled = true;
            Ok((response, source))
        }
        FetchOutcome::NetworkError(e) => {
            output.handled = true;
            Err(e)
        }
    };

    match delivered {
        Ok((response, source)) => {
            output.source = Some(source);
            output.status = Some(response.status.as_u16());
            output.content_type = response.content_type().map(str::to_string);
            output.body = Some(String::from_utf8_lossy(&response.bytes).into_owned());
        }
        Err(e) => output.error = Some(e.to_string()),
    }

    json_result(&output)
}
