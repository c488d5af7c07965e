//! Test fixtures for resilience scenarios

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};

use crate::resilience::classify::{ErrorCategory, ErrorRecord, RawFailure};
use crate::resilience::retry::AttemptObserver;

/// Operation that fails a fixed number of times, then succeeds
///
/// Clones share counters, so a clone can be moved into a retry or queue
/// closure while the test keeps another to inspect.
///
/// ```
/// use clubhouse_common::testing::FlakyOperation;
///
/// let op = FlakyOperation::new(2, "network unreachable");
/// assert_eq!(op.calls(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct FlakyOperation {
    failures_left: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
    failure: RawFailure,
}

impl FlakyOperation {
    pub fn new(failures: u32, failure: impl Into<RawFailure>) -> Self {
        Self {
            failures_left: Arc::new(AtomicU32::new(failures)),
            calls: Arc::new(AtomicU32::new(0)),
            failure: failure.into(),
        }
    }

    /// Never succeeds
    pub fn always_failing(failure: impl Into<RawFailure>) -> Self {
        Self::new(u32::MAX, failure)
    }

    /// Succeeds on the first call
    pub fn succeeding() -> Self {
        Self::new(0, RawFailure::null())
    }

    /// Number of invocations so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Run once; resolves to the 1-based call number on success
    pub fn invoke(&self) -> BoxFuture<'static, Result<u32, RawFailure>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        let failure = self.failure.clone();
        async move {
            if fail {
                Err(failure)
            } else {
                Ok(call)
            }
        }
        .boxed()
    }

    /// Same as [`invoke`](Self::invoke) with the value discarded, for queue
    /// replay closures
    pub fn invoke_unit(&self) -> BoxFuture<'static, Result<(), RawFailure>> {
        self.invoke().map(|result| result.map(|_| ())).boxed()
    }
}

/// Observer that records every failed attempt it is told about
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<(u32, u32, ErrorCategory)>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(attempt_number, max_attempts, category)` in notification order
    pub fn attempts(&self) -> Vec<(u32, u32, ErrorCategory)> {
        self.seen.lock().clone()
    }
}

impl AttemptObserver for RecordingObserver {
    fn on_attempt_failed(&self, attempt_number: u32, max_attempts: u32, error: &ErrorRecord) {
        self.seen.lock().push((attempt_number, max_attempts, error.category()));
    }
}

/// Deterministic identifiers for bulk scenarios
///
/// ```
/// use clubhouse_common::testing::seeded_ids;
///
/// assert_eq!(seeded_ids(3, 7), seeded_ids(3, 7));
/// ```
pub fn seeded_ids(count: usize, seed: u64) -> Vec<String> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count).map(|i| format!("app-{i:03}-{:06x}", rng.gen_range(0..0x00ff_ffff_u32))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_operation_counts_and_recovers() {
        let op = FlakyOperation::new(2, "HTTP 503");
        assert!(op.invoke().await.is_err());
        assert!(op.clone().invoke().await.is_err());
        assert_eq!(op.invoke().await.unwrap(), 3);
        assert_eq!(op.calls(), 3);
    }

    #[tokio::test]
    async fn test_succeeding_operation() {
        let op = FlakyOperation::succeeding();
        assert!(op.invoke_unit().await.is_ok());
    }

    #[test]
    fn test_seeded_ids_are_unique() {
        let ids = seeded_ids(50, 1);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 50);
    }
}
