use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::errors::{QueueError, QueueResult};
use super::types::{
    DrainReport, OperationId, PendingOperation, QueueConfig, QueueEvent, QueueStats,
    QueuedOperation, ReplayFn,
};
use crate::resilience::classify::{ErrorCategory, ErrorClassifier, RawFailure};
use crate::resilience::connectivity::ConnectivityMonitor;
use crate::time::{Clock, SystemClock};

const EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    replayed: AtomicU64,
    failed: AtomicU64,
    requeued: AtomicU64,
    cleared: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
        }
    }
}

/// FIFO buffer of operations issued while offline
///
/// ## Replay semantics
///
/// - `drain` replays entries one at a time in enqueue order and awaits each
///   before starting the next. Concurrent drains are serialized.
/// - An entry leaves the queue only once its replay settles, so `count`
///   never drops while a replay is still running.
/// - Before each entry the drain re-checks connectivity. If the client went
///   offline it stops and the untouched entries keep their order.
/// - An entry failing with a `network` category is set aside with its attempt
///   count bumped and the drain moves on to the next entry. Set-aside entries
///   return to the head, in their original order, once the drain ends. After
///   `max_replay_attempts` such an entry is dropped instead.
/// - Other failures are reported and dropped; the drain carries on.
pub struct OfflineQueue {
    entries: Mutex<VecDeque<QueuedOperation>>,
    in_flight: AtomicUsize,
    drain_lock: AsyncMutex<()>,
    events: broadcast::Sender<QueueEvent>,
    monitor: RwLock<Option<Arc<ConnectivityMonitor>>>,
    config: QueueConfig,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("count", &self.count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for OfflineQueue {
    fn default() -> Self {
        Self::build(QueueConfig::default(), Arc::new(SystemClock))
    }
}

impl OfflineQueue {
    /// Create a queue with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue with a validated configuration
    pub fn with_config(config: QueueConfig, clock: Arc<dyn Clock>) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: QueueConfig, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            drain_lock: AsyncMutex::new(()),
            events,
            monitor: RwLock::new(None),
            config,
            classifier: ErrorClassifier::new(),
            clock,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Append an operation; it runs on the next drain
    pub fn enqueue<F, Fut>(&self, label: impl Into<String>, mut invoke: F) -> QueueResult<OperationId>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RawFailure>> + Send + 'static,
    {
        self.enqueue_boxed(label, Box::new(move || invoke().boxed()))
    }

    /// Append an already boxed replay closure
    pub fn enqueue_boxed(&self, label: impl Into<String>, invoke: ReplayFn) -> QueueResult<OperationId> {
        let operation = QueuedOperation {
            id: OperationId::new(),
            label: label.into(),
            enqueued_at: self.clock.millis_since_epoch(),
            attempts: 0,
            invoke,
        };
        let id = operation.id;
        let label = operation.label.clone();

        let pending = {
            let mut entries = self.entries.lock();
            if let Some(capacity) = self.config.capacity {
                if entries.len() + self.in_flight.load(Ordering::SeqCst) >= capacity {
                    warn!(capacity, label = %label, "offline queue full, rejecting operation");
                    return Err(QueueError::CapacityExceeded(capacity));
                }
            }
            entries.push_back(operation);
            entries.len() + self.in_flight.load(Ordering::SeqCst)
        };

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        info!(operation_id = %id, label = %label, pending, "operation_queued");
        self.emit(QueueEvent::Enqueued { id, label, pending });
        Ok(id)
    }

    /// Pending operations, including one whose replay is still running
    pub fn count(&self) -> usize {
        let entries = self.entries.lock();
        entries.len() + self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of the operations not yet started, in replay order
    pub fn pending(&self) -> Vec<PendingOperation> {
        self.entries.lock().iter().map(QueuedOperation::summary).collect()
    }

    /// Discard every operation that has not started; none of them run
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.entries.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        self.counters.cleared.fetch_add(removed as u64, Ordering::Relaxed);
        info!(removed, "offline queue cleared");
        self.emit(QueueEvent::Cleared { removed });
        removed
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Receive queue activity from now on
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: QueueEvent) {
        // Nobody listening is not an error.
        let _ = self.events.send(event);
    }

    fn is_online(&self) -> bool {
        self.monitor.read().as_ref().map_or(true, |monitor| monitor.is_online())
    }

    fn pop_front(&self) -> Option<QueuedOperation> {
        let mut entries = self.entries.lock();
        let operation = entries.pop_front()?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(operation)
    }

    fn settle(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Put set-aside entries back at the head, keeping their relative order
    fn restore(&self, deferred: Vec<QueuedOperation>) {
        if deferred.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        let restored = deferred.len();
        for operation in deferred.into_iter().rev() {
            entries.push_front(operation);
        }
        self.in_flight.fetch_sub(restored, Ordering::SeqCst);
    }

    /// Replay queued operations in FIFO order
    #[instrument(skip(self), fields(pending = self.count()))]
    pub async fn drain(&self) -> DrainReport {
        let _guard = self.drain_lock.lock().await;
        let mut report = DrainReport::default();
        // Entries that hit a network failure; still counted as in flight.
        let mut deferred = Vec::new();

        loop {
            if !self.is_online() {
                if self.count() > 0 {
                    info!("connectivity lost mid-drain, leaving remaining operations queued");
                    report.interrupted = true;
                }
                break;
            }

            let Some(mut operation) = self.pop_front() else {
                break;
            };

            debug!(operation_id = %operation.id, label = %operation.label, "replaying operation");
            let outcome = (operation.invoke)().await;

            match outcome {
                Ok(()) => {
                    self.settle();
                    self.counters.replayed.fetch_add(1, Ordering::Relaxed);
                    info!(operation_id = %operation.id, label = %operation.label, "operation_replayed");
                    self.emit(QueueEvent::Replayed { id: operation.id });
                    report.succeeded.push(operation.id);
                }
                Err(failure) => {
                    let record = self.classifier.classify(&failure, !self.is_online());
                    operation.attempts += 1;

                    let disconnect = record.category() == ErrorCategory::Network;
                    if disconnect && operation.attempts < self.config.max_replay_attempts {
                        let (id, attempts) = (operation.id, operation.attempts);
                        deferred.push(operation);
                        self.counters.requeued.fetch_add(1, Ordering::Relaxed);
                        warn!(operation_id = %id, attempts, "replay hit a network failure");
                        self.emit(QueueEvent::Requeued { id, attempts });
                        report.requeued.push(id);
                        continue;
                    }

                    self.settle();
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        operation_id = %operation.id,
                        label = %operation.label,
                        attempts = operation.attempts,
                        category = %record.category(),
                        "queued operation failed and was dropped"
                    );
                    self.emit(QueueEvent::ReplayFailed { id: operation.id, error: record.clone() });
                    report.failed.push((operation.id, record));
                }
            }
        }

        self.restore(deferred);
        report.remaining = self.count();
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            requeued = report.requeued.len(),
            remaining = report.remaining,
            "offline_queue_drained"
        );
        self.emit(QueueEvent::DrainFinished {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            remaining: report.remaining,
        });
        report
    }

    /// Drain once per offline to online transition of `monitor`
    ///
    /// The monitor also becomes the queue's connectivity source for mid-drain
    /// checks. Abort the returned handle to detach.
    pub fn attach(self: &Arc<Self>, monitor: &Arc<ConnectivityMonitor>) -> JoinHandle<()> {
        *self.monitor.write() = Some(Arc::clone(monitor));

        let mut transitions = monitor.subscribe();
        let weak_monitor: Weak<ConnectivityMonitor> = Arc::downgrade(monitor);
        let queue = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match transitions.recv().await {
                    Ok(transition) if transition.came_online() => {
                        queue.drain().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connectivity transitions lagged");
                        let online = weak_monitor.upgrade().is_some_and(|m| m.is_online());
                        if online && queue.count() > 0 {
                            queue.drain().await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("offline queue detached from connectivity monitor");
        })
    }
}
