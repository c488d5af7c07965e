//! Application review service

use std::sync::Arc;

use clubhouse_common::resilience::RawFailure;
use clubhouse_domain::constants::PENDING_APPLICATIONS_CACHE_KEY;
use clubhouse_domain::{Application, ApplicationId, ClubhouseError};
use tracing::info;

use super::ports::ApplicationGateway;
use crate::resilience::{
    BulkExecution, ExecuteOptions, FetchOutcome, OperationOutcome, ResilientOperations,
};

/// Approve, reject and list applications through the resilience facade
pub struct ApplicationService {
    gateway: Arc<dyn ApplicationGateway>,
    operations: ResilientOperations,
}

impl ApplicationService {
    pub fn new(gateway: Arc<dyn ApplicationGateway>, operations: ResilientOperations) -> Self {
        Self { gateway, operations }
    }

    /// Pending applications, from the server or the last snapshot
    pub async fn list_pending(&self) -> FetchOutcome<Vec<Application>> {
        let gateway = Arc::clone(&self.gateway);
        self.operations
            .fetch(
                move || {
                    let gateway = Arc::clone(&gateway);
                    async move { gateway.list_pending().await.map_err(RawFailure::from) }
                },
                PENDING_APPLICATIONS_CACHE_KEY,
                None,
            )
            .await
    }

    pub async fn approve(&self, id: ApplicationId) -> OperationOutcome<()> {
        if let Some(rejected) = self.reject_blank(&id) {
            return rejected;
        }
        let options = ExecuteOptions::labeled(format!("approve application {id}"));
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        let outcome = self
            .operations
            .execute(
                move || {
                    let gateway = Arc::clone(&gateway);
                    let id = target.clone();
                    async move { gateway.approve(&id).await.map_err(RawFailure::from) }
                },
                options,
            )
            .await;
        info!(application_id = %id, disposition = outcome.label(), "application_approve");
        outcome
    }

    pub async fn reject(&self, id: ApplicationId, reason: Option<String>) -> OperationOutcome<()> {
        if let Some(rejected) = self.reject_blank(&id) {
            return rejected;
        }
        let options = ExecuteOptions::labeled(format!("reject application {id}"));
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        let outcome = self
            .operations
            .execute(
                move || {
                    let gateway = Arc::clone(&gateway);
                    let id = target.clone();
                    let reason = reason.clone();
                    async move {
                        gateway.reject(&id, reason.as_deref()).await.map_err(RawFailure::from)
                    }
                },
                options,
            )
            .await;
        info!(application_id = %id, disposition = outcome.label(), "application_reject");
        outcome
    }

    /// Approve a batch with one remote call
    pub fn bulk_approve(&self, ids: Vec<ApplicationId>) -> BulkExecution {
        let options = ExecuteOptions::labeled(format!("approve {} applications", ids.len()));
        let gateway = Arc::clone(&self.gateway);
        let batch = ids.clone();
        self.operations.execute_bulk(
            ids,
            move || {
                let gateway = Arc::clone(&gateway);
                let batch = batch.clone();
                async move { gateway.bulk_approve(&batch).await.map_err(RawFailure::from) }
            },
            options,
        )
    }

    fn reject_blank(&self, id: &ApplicationId) -> Option<OperationOutcome<()>> {
        if !id.as_str().trim().is_empty() {
            return None;
        }
        let raw = RawFailure::from(ClubhouseError::Validation(
            "application id must not be empty".into(),
        ));
        Some(OperationOutcome::Failed(self.operations.context().classifier().classify(&raw, false)))
    }
}
