//! Resilient operation facade
//!
//! The single entry point for remote calls made on behalf of the user:
//!
//! - offline: the call is queued and [`OperationOutcome::Queued`] comes back
//!   at once, without running the call
//! - online: the call runs under the retry executor and a successful result
//!   is written to the snapshot cache when a cache key is given
//! - terminal failure: the classified [`ErrorRecord`] comes back

use std::future::Future;
use std::time::Duration;

use clubhouse_common::resilience::{
    CachedSnapshot, ErrorCategory, ErrorRecord, OperationId, QueueError, RawFailure, RetryPolicy,
    Severity,
};
use clubhouse_domain::{ApplicationId, BulkOutcome, BulkResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::context::ResilienceContext;

/// How a call ended from the caller's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", content = "value", rename_all = "lowercase")]
pub enum OperationOutcome<T> {
    Completed(T),
    /// Deferred until connectivity returns
    Queued(OperationId),
    Failed(ErrorRecord),
}

impl<T> OperationOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// `"completed"`, `"queued"` or `"failed"`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Queued(_) => "queued",
            Self::Failed(_) => "failed",
        }
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Failed(record) => Some(record),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationOutcome<U> {
        match self {
            Self::Completed(value) => OperationOutcome::Completed(f(value)),
            Self::Queued(id) => OperationOutcome::Queued(id),
            Self::Failed(record) => OperationOutcome::Failed(record),
        }
    }
}

/// Per-call options for [`ResilientOperations::execute`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Shown in queue listings and logs
    pub label: Option<String>,
    pub cache_key: Option<String>,
    /// Falls back to the cache's default TTL
    pub cache_ttl: Option<Duration>,
    /// Falls back to the context's default policy
    pub retry_policy: Option<RetryPolicy>,
}

impl ExecuteOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()), ..Self::default() }
    }

    #[must_use]
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    fn label_or_default(&self) -> String {
        self.label.clone().unwrap_or_else(|| "operation".to_string())
    }
}

/// Result of a read through [`ResilientOperations::fetch`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum FetchOutcome<T> {
    /// Loaded from the server just now
    Fresh(T),
    /// Served from the snapshot cache; check `is_stale`
    Cached(CachedSnapshot<T>),
    /// Neither the server nor the cache could answer
    Unavailable(ErrorRecord),
}

impl<T> FetchOutcome<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Cached(snapshot) => Some(&snapshot.payload),
            Self::Unavailable(_) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Fresh(value) => Some(value),
            Self::Cached(snapshot) => Some(snapshot.payload),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Cached(snapshot) if snapshot.is_stale)
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Settled items out of a bulk call's total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkProgress {
    pub processed: usize,
    pub total: usize,
}

impl BulkProgress {
    pub fn is_done(&self) -> bool {
        self.processed >= self.total
    }
}

/// A bulk call running in the background
///
/// The batch is one remote request, so progress jumps from 0 straight to
/// `total` once that request settles. It stays at 0 when the batch was
/// queued.
#[derive(Debug)]
pub struct BulkExecution {
    progress: watch::Receiver<BulkProgress>,
    task: JoinHandle<OperationOutcome<BulkOutcome>>,
}

impl BulkExecution {
    pub fn progress(&self) -> watch::Receiver<BulkProgress> {
        self.progress.clone()
    }

    /// Wait for the batch to settle
    pub async fn outcome(self) -> OperationOutcome<BulkOutcome> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "bulk task did not complete");
                OperationOutcome::Failed(ErrorRecord::new(
                    ErrorCategory::Unknown,
                    Severity::Medium,
                    format!("Bulk action was interrupted: {err}"),
                    vec!["Refresh the page to see which items were processed.".to_string()],
                ))
            }
        }
    }
}

/// Facade over a [`ResilienceContext`]
#[derive(Debug, Clone)]
pub struct ResilientOperations {
    context: ResilienceContext,
}

impl ResilientOperations {
    pub fn new(context: ResilienceContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ResilienceContext {
        &self.context
    }

    /// Run a mutating call, or queue it while offline
    ///
    /// When the call is queued its eventual result is discarded.
    #[instrument(skip_all, fields(label = options.label.as_deref().unwrap_or("operation")))]
    pub async fn execute<T, F, Fut>(&self, action: F, options: ExecuteOptions) -> OperationOutcome<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        if !self.context.monitor().is_online() {
            return self.enqueue(action, &options);
        }
        self.run_online(action, options).await
    }

    async fn run_online<T, F, Fut>(&self, action: F, options: ExecuteOptions) -> OperationOutcome<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let policy = options.retry_policy.as_ref().unwrap_or_else(|| self.context.default_policy());
        match self.context.executor().run(|| action(), policy).await {
            Ok(value) => {
                if let Some(key) = options.cache_key.as_deref() {
                    let ttl = options.cache_ttl.unwrap_or_else(|| self.context.cache().default_ttl());
                    if let Err(err) = self.context.cache().write(key, &value, ttl) {
                        warn!(key, error = %err, "failed to cache operation result");
                    }
                }
                OperationOutcome::Completed(value)
            }
            Err(record) => OperationOutcome::Failed(record),
        }
    }

    fn enqueue<T, F, Fut>(&self, action: F, options: &ExecuteOptions) -> OperationOutcome<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RawFailure>> + Send + 'static,
        T: Send + 'static,
    {
        let label = options.label_or_default();
        let replay_label = label.clone();
        let queued = self.context.queue().enqueue(label, move || {
            let call = action();
            let label = replay_label.clone();
            async move {
                call.await.map(|_| debug!(label = %label, "replayed operation result discarded"))
            }
        });

        match queued {
            Ok(id) => OperationOutcome::Queued(id),
            Err(QueueError::CapacityExceeded(capacity)) => {
                warn!(capacity, "offline queue full, operation rejected");
                OperationOutcome::Failed(ErrorRecord::new(
                    ErrorCategory::Unknown,
                    Severity::Medium,
                    format!("Too many actions are waiting for a connection ({capacity})."),
                    vec![
                        "Reconnect to the internet so waiting actions can run.".to_string(),
                        "Try again once some of them have completed.".to_string(),
                    ],
                ))
            }
            Err(err) => {
                let raw = RawFailure::error("offline-queue", err.to_string());
                OperationOutcome::Failed(self.context.classifier().classify(&raw, true))
            }
        }
    }

    /// Read path: fresh data when possible, the last snapshot otherwise
    ///
    /// Online, the loader runs under the default retry policy and a success
    /// refreshes the snapshot. Offline, or when the loader fails for good,
    /// the snapshot is returned if there is one.
    #[instrument(skip(self, loader, ttl))]
    pub async fn fetch<T, F, Fut>(
        &self,
        mut loader: F,
        key: &str,
        ttl: Option<Duration>,
    ) -> FetchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
        T: Serialize + DeserializeOwned,
    {
        let online = self.context.monitor().is_online();

        let failure = if online {
            match self.context.executor().run(&mut loader, self.context.default_policy()).await {
                Ok(value) => {
                    let ttl = ttl.unwrap_or_else(|| self.context.cache().default_ttl());
                    if let Err(err) = self.context.cache().write(key, &value, ttl) {
                        warn!(key, error = %err, "failed to refresh snapshot");
                    }
                    return FetchOutcome::Fresh(value);
                }
                Err(record) => record,
            }
        } else {
            self.context.classifier().classify(
                &RawFailure::network(format!("offline, no snapshot for {key}")),
                true,
            )
        };

        match self.cached::<T>(key) {
            Some(snapshot) => {
                info!(key, online, is_stale = snapshot.is_stale, "serving cached snapshot");
                FetchOutcome::Cached(snapshot)
            }
            None => FetchOutcome::Unavailable(failure),
        }
    }

    /// Cache lookup only; store errors read as absent
    pub fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<CachedSnapshot<T>> {
        match self.context.cache().read(key) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(key, error = %err, "snapshot lookup failed");
                None
            }
        }
    }

    /// Run one batch call over `ids` in the background
    ///
    /// Whether the batch runs or is queued is decided by connectivity at the
    /// time of this call. The server's answer is reconciled against `ids`, so
    /// the outcome always partitions the distinct requested ids. An empty id
    /// list completes at once without calling `action`.
    pub fn execute_bulk<F, Fut>(
        &self,
        ids: Vec<ApplicationId>,
        action: F,
        options: ExecuteOptions,
    ) -> BulkExecution
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BulkResponse, RawFailure>> + Send + 'static,
    {
        let total = ids.iter().collect::<std::collections::HashSet<_>>().len();
        let (progress_tx, progress) = watch::channel(BulkProgress { processed: 0, total });

        if total == 0 {
            let task = tokio::spawn(async { OperationOutcome::Completed(BulkOutcome::default()) });
            return BulkExecution { progress, task };
        }

        let requested = ids;
        let reconciled = move || {
            let call = action();
            let requested = requested.clone();
            async move { call.await.map(|response| BulkOutcome::reconcile(&requested, response)) }
        };

        if !self.context.monitor().is_online() {
            let queued = self.enqueue(reconciled, &options);
            return BulkExecution { progress, task: tokio::spawn(async move { queued }) };
        }

        let operations = self.clone();
        let task = tokio::spawn(async move {
            let outcome = operations.run_online(reconciled, options).await;
            // Receivers may all be gone.
            let _ = progress_tx.send(BulkProgress { processed: total, total });
            if let OperationOutcome::Completed(result) = &outcome {
                info!(
                    total,
                    succeeded = result.successful_ids.len(),
                    failed = result.failed.len(),
                    "bulk_action_finished"
                );
            }
            outcome
        });

        BulkExecution { progress, task }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use clubhouse_common::resilience::BackoffStrategy;

    use super::*;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            backoff: BackoffStrategy::Fixed(Duration::from_millis(1)),
        }
    }

    fn context() -> ResilienceContext {
        ResilienceContext::builder().with_default_policy(fast_policy(3)).build().unwrap()
    }

    #[tokio::test]
    async fn test_completed_result_is_cached() {
        let ops = context().operations();
        let options = ExecuteOptions::default().cache_key("numbers");
        let outcome = ops.execute(|| async { Ok::<_, RawFailure>(vec![1, 2, 3]) }, options).await;

        assert_eq!(outcome, OperationOutcome::Completed(vec![1, 2, 3]));
        let snapshot = ops.cached::<Vec<i32>>("numbers").unwrap();
        assert_eq!(snapshot.payload, vec![1, 2, 3]);
        assert!(!snapshot.is_stale);
    }

    #[tokio::test]
    async fn test_offline_call_is_queued_not_run() {
        let context = context();
        context.monitor().set_online(false);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let outcome = context
            .operations()
            .execute(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, RawFailure>(()) }
                },
                ExecuteOptions::labeled("approve a-1"),
            )
            .await;

        assert!(outcome.is_queued());
        assert_eq!(outcome.label(), "queued");
        assert_eq!(context.queue().count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_queue_fails_with_unknown_medium() {
        let context = ResilienceContext::builder().with_queue_capacity(1).build().unwrap();
        context.monitor().set_online(false);
        let ops = context.operations();

        let first = ops.execute(|| async { Ok::<_, RawFailure>(()) }, ExecuteOptions::default()).await;
        let second = ops.execute(|| async { Ok::<_, RawFailure>(()) }, ExecuteOptions::default()).await;

        assert!(first.is_queued());
        let record = second.error().unwrap();
        assert_eq!(record.category(), ErrorCategory::Unknown);
        assert_eq!(record.severity(), Severity::Medium);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_surfaces_once() {
        let ops = context().operations();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let outcome: OperationOutcome<()> = ops
            .execute(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(RawFailure::text("HTTP 400 Bad Request: missing id")) }
                },
                ExecuteOptions::default(),
            )
            .await;

        assert_eq!(outcome.error().unwrap().category(), ErrorCategory::Validation);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_offline_without_snapshot_is_unavailable() {
        let context = context();
        context.monitor().set_online(false);
        let outcome: FetchOutcome<Vec<i32>> = context
            .operations()
            .fetch(|| async { Ok::<_, RawFailure>(vec![1]) }, "never-written", None)
            .await;

        match outcome {
            FetchOutcome::Unavailable(record) => {
                assert_eq!(record.category(), ErrorCategory::Network);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_snapshot_after_failure() {
        let ops = context().operations();
        let fresh = ops.fetch(|| async { Ok::<_, RawFailure>(7_u32) }, "answer", None).await;
        assert_eq!(fresh, FetchOutcome::Fresh(7));

        let fallback: FetchOutcome<u32> = ops
            .fetch(|| async { Err(RawFailure::text("HTTP 403 Forbidden")) }, "answer", None)
            .await;
        assert!(fallback.is_from_cache());
        assert_eq!(fallback.data(), Some(&7));
    }

    /// Tests that a bulk call started online still runs after going offline
    /// Verifies:
    /// - The batch is not queued when connectivity drops before the task runs
    /// - The action is called once and progress reaches the total
    #[tokio::test]
    async fn test_bulk_decides_at_call_time() {
        let context = context();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let ids = vec![ApplicationId::new("a-1"), ApplicationId::new("a-2")];
        let response = BulkResponse { succeeded: ids.clone(), failed: Vec::new() };

        let execution = context.operations().execute_bulk(
            ids,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let response = response.clone();
                async move { Ok::<_, RawFailure>(response) }
            },
            ExecuteOptions::default(),
        );
        context.monitor().set_online(false);
        let progress = execution.progress();

        let outcome = execution.outcome().await;
        assert_eq!(outcome.completed().map(|bulk| bulk.successful_ids.len()), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(context.queue().count(), 0);
        assert_eq!(progress.borrow().processed, 2);
    }

    #[tokio::test]
    async fn test_empty_bulk_completes_without_calling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let execution = context().operations().execute_bulk(
            Vec::new(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RawFailure>(BulkResponse::default()) }
            },
            ExecuteOptions::default(),
        );

        let outcome = execution.outcome().await;
        assert_eq!(outcome, OperationOutcome::Completed(BulkOutcome::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
