//! worker_message tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{MessageOutcome, ServiceWorker, WorkerMessage, WorkerState};

use super::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message type: "SKIP_WAITING" or "CACHE_URLS". Other types are ignored.
    #[serde(rename = "type")]
    pub kind: String,

    /// URLs or paths to cache (CACHE_URLS only).
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerMessageOutput {
    #[serde(flatten)]
    pub outcome: MessageOutcome,
    pub skip_waiting: bool,
    pub state: WorkerState,
}

pub async fn message_impl(worker: &ServiceWorker, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let payload = serde_json::json!({ "type": params.kind, "urls": params.urls });
    let message = WorkerMessage::from_json(&payload.to_string())?;

    let outcome = worker.on_message(message).await?;
    json_result(&WorkerMessageOutput {
        outcome,
        skip_waiting: worker.skip_waiting_requested(),
        state: worker.state().await,
    })
}
