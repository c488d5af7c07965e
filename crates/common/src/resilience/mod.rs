//! Resilience primitives for mutating operations
//!
//! Leaves first:
//! - **[`connectivity`]**: online/offline tracking and transition fan-out
//! - **[`classify`]**: raw failure to categorized [`ErrorRecord`]
//! - **[`retry`]**: bounded retries with backoff, driven by the classifier
//! - **[`snapshot`]**: last-known-good results with staleness flags
//! - **[`offline_queue`]**: operations deferred while offline, replayed in
//!   order on reconnect
//!
//! The classifier is pure and lives in the `foundation` tier; everything
//! else needs the async `runtime` tier.

pub mod classify;
#[cfg(feature = "runtime")]
pub mod connectivity;
#[cfg(feature = "runtime")]
pub mod offline_queue;
#[cfg(feature = "runtime")]
pub mod retry;
#[cfg(feature = "runtime")]
pub mod snapshot;

pub use classify::{classify, ErrorCategory, ErrorClassifier, ErrorRecord, FailureKind, RawFailure, Severity};
#[cfg(feature = "runtime")]
pub use connectivity::{
    ConnectionQuality, ConnectivityMonitor, ConnectivityState, ConnectivityTransition, LinkClass,
    PlatformSignal,
};
#[cfg(feature = "runtime")]
pub use offline_queue::{
    DrainReport, OfflineQueue, OperationId, PendingOperation, QueueConfig, QueueError, QueueEvent,
    QueueResult, QueueStats,
};
#[cfg(feature = "runtime")]
pub use retry::{
    AttemptObserver, AttemptState, BackoffStrategy, RetryExecutor, RetryPhase, RetryPolicy,
    RetryPolicyBuilder,
};
#[cfg(feature = "runtime")]
pub use snapshot::{
    CachedSnapshot, MemorySnapshotStore, SnapshotStore, StaleSnapshotCache, StoreError,
    StoreResult,
};
