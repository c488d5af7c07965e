//! Shared resilience state
//!
//! One [`ResilienceContext`] holds the connectivity monitor, offline queue,
//! snapshot cache and default retry policy. Clones share the same instances.
//! Production code builds exactly one; tests build a fresh one each.

use std::sync::Arc;
use std::time::Duration;

use clubhouse_common::resilience::offline_queue::QueueConfig;
use clubhouse_common::resilience::snapshot::DEFAULT_SNAPSHOT_TTL;
use clubhouse_common::resilience::{
    BackoffStrategy, ConnectivityMonitor, DrainReport, ErrorClassifier, MemorySnapshotStore,
    OfflineQueue, RetryExecutor, RetryPolicy, SnapshotStore, StaleSnapshotCache,
};
use clubhouse_common::time::{Clock, SystemClock};
use clubhouse_domain::{ClubhouseError, Config, Result};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::facade::ResilientOperations;
use crate::containment::ContainmentBoundary;

struct ContextInner {
    monitor: Arc<ConnectivityMonitor>,
    queue: Arc<OfflineQueue>,
    cache: StaleSnapshotCache,
    executor: RetryExecutor,
    classifier: ErrorClassifier,
    default_policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    replay_listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(handle) = self.replay_listener.get_mut().take() {
            handle.abort();
        }
    }
}

/// Explicitly constructed holder of the resilience primitives
#[derive(Clone)]
pub struct ResilienceContext {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for ResilienceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceContext")
            .field("online", &self.inner.monitor.is_online())
            .field("queued", &self.inner.queue.count())
            .field("started", &self.is_started())
            .finish()
    }
}

impl ResilienceContext {
    pub fn builder() -> ResilienceContextBuilder {
        ResilienceContextBuilder::default()
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.inner.monitor
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.inner.queue
    }

    pub fn cache(&self) -> &StaleSnapshotCache {
        &self.inner.cache
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.inner.executor
    }

    pub fn classifier(&self) -> ErrorClassifier {
        self.inner.classifier
    }

    pub fn default_policy(&self) -> &RetryPolicy {
        &self.inner.default_policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Facade over this context
    pub fn operations(&self) -> ResilientOperations {
        ResilientOperations::new(self.clone())
    }

    /// Containment boundary sharing this context's classifier, clock and
    /// connectivity
    pub fn boundary(&self, component_context: impl Into<String>) -> ContainmentBoundary {
        let clock = Arc::clone(self.clock());
        ContainmentBoundary::with_clock(component_context, self.classifier(), clock)
            .with_monitor(Arc::clone(self.monitor()))
    }

    /// Start replaying the offline queue on every reconnect
    ///
    /// Must be called from inside a Tokio runtime. Calling it again is a
    /// no-op.
    pub fn start(&self) {
        let mut listener = self.inner.replay_listener.lock();
        if listener.is_some() {
            return;
        }
        *listener = Some(self.inner.queue.attach(&self.inner.monitor));
        info!(online = self.inner.monitor.is_online(), "resilience context started");
    }

    pub fn is_started(&self) -> bool {
        self.inner.replay_listener.lock().is_some()
    }

    /// Stop the replay listener; queued operations stay queued
    pub fn shutdown(&self) {
        if let Some(handle) = self.inner.replay_listener.lock().take() {
            handle.abort();
            debug!(pending = self.inner.queue.count(), "resilience context stopped");
        }
    }

    /// Replay the queue now instead of waiting for a transition
    pub async fn drain_now(&self) -> DrainReport {
        self.inner.queue.drain().await
    }
}

/// Builder for [`ResilienceContext`]
#[derive(Clone)]
pub struct ResilienceContextBuilder {
    store: Option<Arc<dyn SnapshotStore>>,
    clock: Option<Arc<dyn Clock>>,
    monitor: Option<Arc<ConnectivityMonitor>>,
    initially_online: bool,
    default_policy: RetryPolicy,
    default_ttl: Duration,
    queue: QueueConfig,
}

impl Default for ResilienceContextBuilder {
    fn default() -> Self {
        Self {
            store: None,
            clock: None,
            monitor: None,
            initially_online: true,
            default_policy: RetryPolicy::default(),
            default_ttl: DEFAULT_SNAPSHOT_TTL,
            queue: QueueConfig::default(),
        }
    }
}

impl ResilienceContextBuilder {
    /// Take retry, cache and queue settings from configuration
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        // Validated in `build`.
        self.default_policy = RetryPolicy {
            max_attempts: config.retry.max_attempts,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
                max_delay: Duration::from_millis(config.retry.max_delay_ms),
            },
        };
        self.default_ttl = Duration::from_millis(config.cache.default_ttl_ms);
        self.queue = QueueConfig {
            capacity: config.queue.capacity,
            max_replay_attempts: config.queue.max_replay_attempts,
        };
        self
    }

    /// Snapshot persistence; in-memory when unset
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing monitor instead of creating one
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Connectivity assumed before the first signal arrives
    #[must_use]
    pub fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }

    #[must_use]
    pub fn with_default_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_max_replay_attempts(mut self, attempts: u32) -> Self {
        self.queue.max_replay_attempts = attempts;
        self
    }

    /// Validate and assemble the context
    pub fn build(self) -> Result<ResilienceContext> {
        self.default_policy
            .validate()
            .map_err(|err| ClubhouseError::Config(format!("retry policy: {err}")))?;
        if self.default_ttl.is_zero() {
            return Err(ClubhouseError::Config("cache ttl must be positive".into()));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let monitor = self.monitor.unwrap_or_else(|| {
            Arc::new(ConnectivityMonitor::with_clock(self.initially_online, Arc::clone(&clock)))
        });
        let queue = OfflineQueue::with_config(self.queue, Arc::clone(&clock))
            .map_err(|err| ClubhouseError::Config(format!("offline queue: {err}")))?;
        let store = self.store.unwrap_or_else(|| Arc::new(MemorySnapshotStore::new()));
        let cache =
            StaleSnapshotCache::new(store, Arc::clone(&clock)).with_default_ttl(self.default_ttl);
        let classifier = ErrorClassifier::new();
        let executor = RetryExecutor::new(classifier).with_monitor(Arc::clone(&monitor));

        Ok(ResilienceContext {
            inner: Arc::new(ContextInner {
                monitor,
                queue: Arc::new(queue),
                cache,
                executor,
                classifier,
                default_policy: self.default_policy,
                clock,
                replay_listener: Mutex::new(None),
            }),
        })
    }

    /// [`build`](Self::build) then [`start`](ResilienceContext::start)
    pub fn start(self) -> Result<ResilienceContext> {
        let context = self.build()?;
        context.start();
        Ok(context)
    }
}
