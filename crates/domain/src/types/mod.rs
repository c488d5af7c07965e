//! Domain types and models

pub mod application;
pub mod bulk;
pub mod report;

pub use application::{Application, ApplicationId, ApplicationStatus};
pub use bulk::{BulkFailure, BulkOutcome, BulkResponse};
pub use report::{ExportedReport, ReportFormat, ReportKind, ReportRequest};
