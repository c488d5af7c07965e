//! # Clubhouse Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The HTTP client for the club API (application and report gateways)
//! - The SQLite snapshot store behind the stale snapshot cache
//! - The health-endpoint connectivity probe
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Implements traits defined in `clubhouse-core` and `clubhouse-common`
//! - Contains all "impure" code (network, disk)

pub mod config;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod storage;

// Re-export commonly used items
pub use connectivity::{ConnectivityProbe, HealthCheck};
pub use errors::InfraError;
pub use http::{ClubApiClient, ClubApiConfig, HttpClient, StaticTokenProvider};
pub use storage::SqliteSnapshotStore;
