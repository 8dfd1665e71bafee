//! worker_install, worker_activate and worker_sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ServiceWorker, SyncOutcome, WorkerState};

use super::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize)]
pub struct InstallOutput {
    #[serde(flatten)]
    pub report: swcache_client::InstallReport,
    pub state: WorkerState,
    pub skip_waiting: bool,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateOutput {
    #[serde(flatten)]
    pub report: swcache_client::ActivateReport,
    pub state: WorkerState,
    pub clients_claimed: bool,
}

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Background sync tag, e.g. "sync-orders".
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub tag: String,
    pub outcome: SyncOutcome,
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    let output =
        InstallOutput { report, state: worker.state().await, skip_waiting: worker.skip_waiting_requested() };
    json_result(&output)
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    let output = ActivateOutput { report, state: worker.state().await, clients_claimed: worker.clients_claimed() };
    json_result(&output)
}

pub async fn sync_impl(worker: &ServiceWorker, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.on_sync(&params.tag).await;
    json_result(&SyncOutput { tag: params.tag, outcome })
}
