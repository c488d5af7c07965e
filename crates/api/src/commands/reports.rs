//! Report export commands

use clubhouse_common::resilience::CachedSnapshot;
use clubhouse_core::OperationOutcome;
use clubhouse_domain::{ExportedReport, ReportRequest};

use crate::context::AppContext;
use crate::utils::command_helpers::execute_command;

pub async fn export_report(
    ctx: &AppContext,
    request: ReportRequest,
) -> OperationOutcome<ExportedReport> {
    execute_command("reports::export", ctx.reports.export(request)).await
}

/// Last successful export for `request`, for download while offline
pub fn last_exported_report(
    ctx: &AppContext,
    request: &ReportRequest,
) -> Option<CachedSnapshot<ExportedReport>> {
    ctx.reports.last_export(request)
}
