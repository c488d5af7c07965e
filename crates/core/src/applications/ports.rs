//! Port interfaces for the applications API
//!
//! These traits define the boundary between the review use cases and the
//! remote API client.

use async_trait::async_trait;
use clubhouse_domain::{Application, ApplicationId, BulkResponse, Result};

/// Remote executor for application commands and queries
#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    /// Applications still waiting for a decision
    async fn list_pending(&self) -> Result<Vec<Application>>;

    async fn approve(&self, id: &ApplicationId) -> Result<()>;

    async fn reject(&self, id: &ApplicationId, reason: Option<&str>) -> Result<()>;

    /// Approve a batch in one request; the answer is reconciled by the caller
    async fn bulk_approve(&self, ids: &[ApplicationId]) -> Result<BulkResponse>;
}
