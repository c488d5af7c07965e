//! Connectivity, offline queue and health commands

use clubhouse_common::resilience::{
    ConnectivityState, DrainReport, ErrorRecord, OperationId, PendingOperation,
};
use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;
use crate::utils::health::HealthStatus;

/// Data behind the offline banner and the pending-actions badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub state: ConnectivityState,
    pub queued: usize,
    pub pending: Vec<PendingOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedReplay {
    pub id: OperationId,
    pub error: ErrorRecord,
}

/// Serialisable view of a [`DrainReport`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainSummary {
    pub succeeded: Vec<OperationId>,
    pub failed: Vec<FailedReplay>,
    pub requeued: Vec<OperationId>,
    pub remaining: usize,
    pub interrupted: bool,
}

impl From<DrainReport> for DrainSummary {
    fn from(report: DrainReport) -> Self {
        Self {
            succeeded: report.succeeded,
            failed: report
                .failed
                .into_iter()
                .map(|(id, error)| FailedReplay { id, error })
                .collect(),
            requeued: report.requeued,
            remaining: report.remaining,
            interrupted: report.interrupted,
        }
    }
}

pub fn get_connectivity_status(ctx: &AppContext) -> ConnectivityStatus {
    let queue = ctx.resilience.queue();
    ConnectivityStatus {
        state: ctx.resilience.monitor().current(),
        queued: queue.count(),
        pending: queue.pending(),
    }
}

/// Probe the API now, then replay the queue if it answered
pub async fn sync_offline_queue(ctx: &AppContext) -> Result<DrainSummary, String> {
    execute_command("status::sync_offline_queue", async {
        if !ctx.refresh_connectivity().await {
            return Err("Still offline. Queued actions will be sent once the connection returns."
                .to_string());
        }
        Ok(DrainSummary::from(ctx.resilience.drain_now().await))
    })
    .await
}

/// Drop every queued action without sending it
pub fn clear_offline_queue(ctx: &AppContext) -> usize {
    let removed = ctx.resilience.queue().clear();
    info!(removed, "offline queue cleared by user");
    removed
}

/// Forget every cached snapshot
pub fn clear_snapshot_cache(ctx: &AppContext) -> Result<usize, String> {
    let removed = ctx.resilience.cache().clear().map_err(|err| err.to_string())?;
    info!(removed, "snapshot cache cleared by user");
    Ok(removed)
}

pub async fn get_app_health(ctx: &AppContext) -> HealthStatus {
    ctx.health_check().await
}
