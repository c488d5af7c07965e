//! Mock gateway implementations for testing
//!
//! Every call is recorded; failures can be scripted per call.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use clubhouse_core::{ApplicationGateway, ReportGateway};
use clubhouse_domain::{
    Application, ApplicationId, ApplicationStatus, BulkResponse, ClubhouseError, ExportedReport,
    ReportRequest, Result as DomainResult,
};
use parking_lot::Mutex;

/// In-memory mock for `ApplicationGateway`.
#[derive(Default, Clone)]
pub struct MockApplicationGateway {
    pending: Arc<Mutex<Vec<Application>>>,
    bulk_response: Arc<Mutex<BulkResponse>>,
    failures: Arc<Mutex<VecDeque<ClubhouseError>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockApplicationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pending(self, applications: Vec<Application>) -> Self {
        *self.pending.lock() = applications;
        self
    }

    pub fn with_bulk_response(self, response: BulkResponse) -> Self {
        *self.bulk_response.lock() = response;
        self
    }

    /// The next call fails with `error`; scripted failures are used in order
    pub fn fail_next(&self, error: ClubhouseError) {
        self.failures.lock().push_back(error);
    }

    /// `"<method>:<id>"` per call, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> DomainResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApplicationGateway for MockApplicationGateway {
    async fn list_pending(&self) -> DomainResult<Vec<Application>> {
        self.record("list_pending".to_string())?;
        Ok(self.pending.lock().clone())
    }

    async fn approve(&self, id: &ApplicationId) -> DomainResult<()> {
        self.record(format!("approve:{id}"))
    }

    async fn reject(&self, id: &ApplicationId, reason: Option<&str>) -> DomainResult<()> {
        self.record(format!("reject:{id}:{}", reason.unwrap_or("-")))
    }

    async fn bulk_approve(&self, ids: &[ApplicationId]) -> DomainResult<BulkResponse> {
        self.record(format!("bulk_approve:{}", ids.len()))?;
        Ok(self.bulk_response.lock().clone())
    }
}

/// In-memory mock for `ReportGateway`.
#[derive(Default, Clone)]
pub struct MockReportGateway {
    failures: Arc<Mutex<VecDeque<ClubhouseError>>>,
    exports: Arc<Mutex<u32>>,
}

impl MockReportGateway {
    pub fn fail_next(&self, error: ClubhouseError) {
        self.failures.lock().push_back(error);
    }

    pub fn exports(&self) -> u32 {
        *self.exports.lock()
    }
}

#[async_trait]
impl ReportGateway for MockReportGateway {
    async fn export(&self, request: &ReportRequest) -> DomainResult<ExportedReport> {
        *self.exports.lock() += 1;
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(ExportedReport {
            file_name: request.file_name(),
            content_type: request.format.content_type().to_string(),
            body: b"id,name\n1,Robin\n".to_vec(),
        })
    }
}

/// Pending application fixture
pub fn application(id: &str, name: &str) -> Application {
    Application {
        id: ApplicationId::new(id),
        applicant_name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        opportunity: "Weekend trail cleanup".to_string(),
        submitted_at: Utc.with_ymd_and_hms(2026, 9, 1, 9, 30, 0).unwrap(),
        status: ApplicationStatus::Pending,
        note: None,
    }
}
