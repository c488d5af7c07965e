//! Report export types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{ClubhouseError, Result};
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Applications,
    VolunteerHours,
    Opportunities,
    Members,
}

impl_domain_status_conversions!(ReportKind {
    Applications => "applications",
    VolunteerHours => "volunteer_hours",
    Opportunities => "opportunities",
    Members => "members",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Pdf,
    Xlsx,
}

impl_domain_status_conversions!(ReportFormat {
    Csv => "csv",
    Pdf => "pdf",
    Xlsx => "xlsx",
});

impl ReportFormat {
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// What to export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub format: ReportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, format: ReportFormat) -> Self {
        Self { kind, format, from: None, to: None }
    }

    #[must_use]
    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(ClubhouseError::Validation(format!(
                "report range starts after it ends ({from} > {to})"
            ))),
            _ => Ok(()),
        }
    }

    /// Snapshot cache key for the last export of this kind and format
    pub fn cache_key(&self) -> String {
        format!("report:{}:{}", self.kind, self.format)
    }

    /// Suggested download name
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.kind, self.format)
    }
}

/// Rendered report file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReport {
    pub file_name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ExportedReport {
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
