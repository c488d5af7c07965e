//! Integration tests for the offline queue attached to a connectivity
//! monitor

#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use clubhouse_common::resilience::{
    ConnectivityMonitor, OfflineQueue, QueueConfig, QueueEvent, QueueResult, RawFailure,
};
use clubhouse_common::testing::{FlakyOperation, SystemClock};
use parking_lot::Mutex;
use tokio::sync::Notify;

async fn wait_for_drain(events: &mut tokio::sync::broadcast::Receiver<QueueEvent>) -> QueueEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("drain finished in time")
            .expect("event channel open");
        if matches!(event, QueueEvent::DrainFinished { .. }) {
            return event;
        }
    }
}

/// Validates FIFO replay on reconnect with monotonically decreasing counts.
///
/// Assertions:
/// - Confirms `a, b, c` run in order after the online transition.
/// - Confirms `count()` observed inside each replay never increases.
#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_replays_in_order() -> QueueResult<()> {
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let queue = Arc::new(OfflineQueue::new());
    let handle = queue.attach(&monitor);
    let mut events = queue.subscribe();

    let log = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        let log = Arc::clone(&log);
        let queue_ref = Arc::downgrade(&queue);
        queue.enqueue(name, move || {
            let log = Arc::clone(&log);
            let count = queue_ref.upgrade().map_or(0, |q| q.count());
            async move {
                log.lock().push((name, count));
                Ok(())
            }
        })?;
    }
    assert_eq!(queue.count(), 3);

    monitor.set_online(true);
    wait_for_drain(&mut events).await;

    let log = log.lock().clone();
    assert_eq!(log.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(log.iter().map(|(_, c)| *c).collect::<Vec<_>>(), vec![3, 2, 1]);
    assert_eq!(queue.count(), 0);

    handle.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_drain_runs_once_per_transition() -> QueueResult<()> {
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let queue = Arc::new(OfflineQueue::new());
    let handle = queue.attach(&monitor);
    let mut events = queue.subscribe();

    let op = FlakyOperation::succeeding();
    let replay = op.clone();
    queue.enqueue("approve a-1", move || replay.invoke_unit())?;

    monitor.set_online(true);
    wait_for_drain(&mut events).await;
    // Duplicate online signals are not transitions.
    monitor.set_online(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(op.calls(), 1);
    handle.abort();
    Ok(())
}

/// Tests the mid-drain connectivity flap policy
/// Verifies:
/// - The drain stops when the monitor reports offline before the next item
/// - Untouched items keep their order and run on the next reconnect
#[tokio::test(flavor = "multi_thread")]
async fn test_flap_mid_drain_keeps_remaining_items() -> QueueResult<()> {
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let queue = Arc::new(OfflineQueue::new());
    let handle = queue.attach(&monitor);
    let mut events = queue.subscribe();
    let ran = Arc::new(Mutex::new(Vec::new()));

    let flapping = Arc::clone(&monitor);
    let ran_first = Arc::clone(&ran);
    queue.enqueue("first", move || {
        let flapping = Arc::clone(&flapping);
        let ran = Arc::clone(&ran_first);
        async move {
            ran.lock().push("first");
            flapping.set_online(false);
            Ok(())
        }
    })?;
    for name in ["second", "third"] {
        let ran = Arc::clone(&ran);
        queue.enqueue(name, move || {
            let ran = Arc::clone(&ran);
            async move {
                ran.lock().push(name);
                Ok(())
            }
        })?;
    }

    monitor.set_online(true);
    let finished = wait_for_drain(&mut events).await;
    assert_eq!(finished, QueueEvent::DrainFinished { succeeded: 1, failed: 0, remaining: 2 });
    assert_eq!(queue.pending().iter().map(|p| p.label.as_str()).collect::<Vec<_>>(), ["second", "third"]);

    monitor.set_online(true);
    wait_for_drain(&mut events).await;
    assert_eq!(*ran.lock(), vec!["first", "second", "third"]);

    handle.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_while_offline_runs_nothing() -> QueueResult<()> {
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let queue = Arc::new(OfflineQueue::with_config(QueueConfig::default(), Arc::new(SystemClock))?);
    let handle = queue.attach(&monitor);
    let ops: Vec<_> = (0..3).map(|_| FlakyOperation::succeeding()).collect();
    for op in &ops {
        let op = op.clone();
        queue.enqueue("op", move || op.invoke_unit())?;
    }

    assert_eq!(queue.clear(), 3);
    assert_eq!(queue.count(), 0);

    let drained = Arc::new(Notify::new());
    let notified = drained.notified();
    let mut events = queue.subscribe();
    let signal = Arc::clone(&drained);
    tokio::spawn(async move {
        if let Ok(QueueEvent::DrainFinished { .. }) = events.recv().await {
            signal.notify_one();
        }
    });
    monitor.set_online(true);
    tokio::time::timeout(Duration::from_secs(5), notified).await.expect("drain ran");

    assert!(ops.iter().all(|op| op.calls() == 0));
    handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_validation_failure_is_reported_and_dropped() -> QueueResult<()> {
    let queue = OfflineQueue::new();
    queue.enqueue("reject a-9", || async { Err(RawFailure::from("HTTP 400 Bad Request")) })?;

    let report = queue.drain().await;
    assert_eq!(report.failed.len(), 1);
    assert!(report.requeued.is_empty());
    assert_eq!(queue.count(), 0);
    Ok(())
}

/// Validates that a network failure while still online does not stall the
/// reconnect drain.
///
/// Assertions:
/// - Confirms both operations behind the failing one run in the same drain.
/// - Confirms only the failing operation is left queued.
#[tokio::test(flavor = "multi_thread")]
async fn test_network_failure_while_online_keeps_draining() -> QueueResult<()> {
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let queue = Arc::new(OfflineQueue::new());
    let handle = queue.attach(&monitor);
    let mut events = queue.subscribe();

    queue.enqueue("flaky", || async { Err(RawFailure::from("Failed to fetch")) })?;
    let ran = Arc::new(Mutex::new(0_u32));
    for _ in 0..2 {
        let ran = Arc::clone(&ran);
        queue.enqueue("good", move || {
            let ran = Arc::clone(&ran);
            async move {
                *ran.lock() += 1;
                Ok(())
            }
        })?;
    }

    monitor.set_online(true);
    wait_for_drain(&mut events).await;

    assert!(monitor.is_online());
    assert_eq!(*ran.lock(), 2);
    assert_eq!(queue.count(), 1);
    assert_eq!(queue.pending()[0].label, "flaky");

    handle.abort();
    Ok(())
}
