//! Report export service

use std::sync::Arc;

use clubhouse_common::resilience::{CachedSnapshot, RawFailure};
use clubhouse_domain::{ExportedReport, ReportRequest};

use super::ports::ReportGateway;
use crate::resilience::{ExecuteOptions, OperationOutcome, ResilientOperations};

/// Exports reports through the resilience facade
pub struct ReportService {
    gateway: Arc<dyn ReportGateway>,
    operations: ResilientOperations,
}

impl ReportService {
    pub fn new(gateway: Arc<dyn ReportGateway>, operations: ResilientOperations) -> Self {
        Self { gateway, operations }
    }

    /// Export a report; the file is kept as a snapshot for offline download
    pub async fn export(&self, request: ReportRequest) -> OperationOutcome<ExportedReport> {
        if let Err(err) = request.validate() {
            let raw = RawFailure::from(err);
            return OperationOutcome::Failed(
                self.operations.context().classifier().classify(&raw, false),
            );
        }

        let options = ExecuteOptions::labeled(format!("export {}", request.file_name()))
            .cache_key(request.cache_key());
        let gateway = Arc::clone(&self.gateway);
        self.operations
            .execute(
                move || {
                    let gateway = Arc::clone(&gateway);
                    let request = request.clone();
                    async move { gateway.export(&request).await.map_err(RawFailure::from) }
                },
                options,
            )
            .await
    }

    /// Last successful export of the same kind and format
    pub fn last_export(&self, request: &ReportRequest) -> Option<CachedSnapshot<ExportedReport>> {
        self.operations.cached(&request.cache_key())
    }
}
