//! Application review commands

use clubhouse_core::{BulkExecution, FetchOutcome, OperationOutcome};
use clubhouse_domain::{Application, ApplicationId, BulkOutcome};
use tracing::debug;

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

/// Pending applications, served from the snapshot cache when offline
///
/// The presentation layer shows a staleness banner for `Cached` results
/// whose `isStale` flag is set.
pub async fn list_pending_applications(ctx: &AppContext) -> FetchOutcome<Vec<Application>> {
    execute_command("applications::list_pending", ctx.applications.list_pending()).await
}

pub async fn approve_application(ctx: &AppContext, id: String) -> OperationOutcome<()> {
    execute_command("applications::approve", ctx.applications.approve(ApplicationId::new(id)))
        .await
}

pub async fn reject_application(
    ctx: &AppContext,
    id: String,
    reason: Option<String>,
) -> OperationOutcome<()> {
    let reason = reason.filter(|r| !r.trim().is_empty());
    execute_command(
        "applications::reject",
        ctx.applications.reject(ApplicationId::new(id), reason),
    )
    .await
}

/// Start a bulk approval and hand back its progress channel
pub fn start_bulk_approve(ctx: &AppContext, ids: Vec<String>) -> BulkExecution {
    let ids: Vec<ApplicationId> = ids.into_iter().map(ApplicationId::new).collect();
    debug!(count = ids.len(), "starting bulk approve");
    ctx.applications.bulk_approve(ids)
}

/// Approve a batch and wait for the partitioned result
pub async fn bulk_approve_applications(
    ctx: &AppContext,
    ids: Vec<String>,
) -> OperationOutcome<BulkOutcome> {
    let execution = start_bulk_approve(ctx, ids);
    execute_command("applications::bulk_approve", execution.outcome()).await
}
