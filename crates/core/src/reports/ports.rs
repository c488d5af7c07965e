//! Port interface for report exports

use async_trait::async_trait;
use clubhouse_domain::{ExportedReport, ReportRequest, Result};

/// Remote executor that renders report files
#[async_trait]
pub trait ReportGateway: Send + Sync {
    async fn export(&self, request: &ReportRequest) -> Result<ExportedReport>;
}
