//! Modular resilience utilities shared across Clubhouse crates.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards so that the
//! primitives every mutating dashboard action rides on stay predictable.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error infrastructure and the pure error classifier
//! - `runtime`: async infrastructure (connectivity monitor, retry executor,
//!   stale snapshot cache, offline operation queue, clock)
//! - `observability`: optional tracing (pulled in by `runtime`)
//! - `test-utils`: fixtures for downstream test suites

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "foundation")]
pub use resilience::{
    classify, ErrorCategory, ErrorClassifier, ErrorRecord, FailureKind, RawFailure, Severity,
};
#[cfg(feature = "runtime")]
pub use resilience::{
    AttemptObserver, AttemptState, BackoffStrategy, ConnectionQuality, ConnectivityMonitor,
    ConnectivityState, ConnectivityTransition, DrainReport, LinkClass, MemorySnapshotStore,
    OfflineQueue, OperationId, PlatformSignal, QueueError, QueueEvent, QueueResult,
    RetryExecutor, RetryPhase, RetryPolicy, SnapshotStore, StaleSnapshotCache, StoreError,
};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
