//! # Clubhouse Core
//!
//! Resilient use cases for the admin dashboard.
//!
//! This crate contains:
//! - Port interfaces (traits) for the remote API
//! - The explicitly constructed [`ResilienceContext`] and the facade every
//!   mutating call goes through
//! - The render-failure containment boundary
//! - Application and report services
//!
//! ## Architecture Principles
//! - Depends on `clubhouse-common` and `clubhouse-domain` only
//! - No HTTP or database code; adapters live in `clubhouse-infra`
//! - All external collaborators via traits

pub mod applications;
pub mod containment;
pub mod reports;
pub mod resilience;

// Infrastructure ports
pub mod auth_ports;

pub use applications::ports::ApplicationGateway;
pub use applications::ApplicationService;
pub use auth_ports::AccessTokenProvider;
pub use containment::{
    BoundaryState, ContainmentBoundary, ContainmentRecord, FallbackAction, FallbackView, Rendered,
    SupportReport,
};
pub use reports::ports::ReportGateway;
pub use reports::ReportService;
pub use resilience::{
    BulkExecution, BulkProgress, ExecuteOptions, FetchOutcome, OperationOutcome,
    ResilienceContext, ResilienceContextBuilder, ResilientOperations,
};
