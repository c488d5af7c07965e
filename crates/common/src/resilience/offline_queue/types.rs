use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CommonError;
use crate::resilience::classify::{ErrorRecord, RawFailure};

/// Future returned by a queued operation's replay closure
pub type ReplayFuture = BoxFuture<'static, Result<(), RawFailure>>;

/// Replay closure; called once per replay attempt
pub type ReplayFn = Box<dyn FnMut() -> ReplayFuture + Send>;

/// Opaque identifier of a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An action deferred while offline
pub struct QueuedOperation {
    pub id: OperationId,
    pub label: String,
    /// Milliseconds since the UNIX epoch
    pub enqueued_at: u64,
    /// Replay attempts made so far
    pub attempts: u32,
    pub invoke: ReplayFn,
}

impl fmt::Debug for QueuedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedOperation")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enqueued_at", &self.enqueued_at)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

impl QueuedOperation {
    pub fn summary(&self) -> PendingOperation {
        PendingOperation {
            id: self.id,
            label: self.label.clone(),
            enqueued_at: self.enqueued_at,
            attempts: self.attempts,
        }
    }
}

/// What the presentation layer sees of a queued operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub id: OperationId,
    pub label: String,
    pub enqueued_at: u64,
    pub attempts: u32,
}

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of pending operations; `None` means unbounded
    pub capacity: Option<usize>,
    /// Replay attempts before a disconnect-failed operation is dropped
    pub max_replay_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: None, max_replay_attempts: 3 }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.capacity == Some(0) {
            return Err(CommonError::config_field("capacity", "capacity must be at least 1"));
        }
        if self.max_replay_attempts == 0 {
            return Err(CommonError::config_field(
                "max_replay_attempts",
                "max_replay_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of one drain pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: Vec<OperationId>,
    /// Operations dropped after failing
    pub failed: Vec<(OperationId, ErrorRecord)>,
    /// Operations that hit a network failure and went back to the head
    pub requeued: Vec<OperationId>,
    /// Operations still queued when the pass ended
    pub remaining: usize,
    /// The pass stopped early because connectivity was lost
    pub interrupted: bool,
}

impl DrainReport {
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.requeued.len()
    }
}

/// Queue activity, broadcast for UI badges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    Enqueued { id: OperationId, label: String, pending: usize },
    Replayed { id: OperationId },
    ReplayFailed { id: OperationId, error: ErrorRecord },
    Requeued { id: OperationId, attempts: u32 },
    Cleared { removed: usize },
    DrainFinished { succeeded: usize, failed: usize, remaining: usize },
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub enqueued: u64,
    pub replayed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub cleared: u64,
}
