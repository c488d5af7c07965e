//! Offline operation queue
//!
//! Buffers operations that could not run while offline and replays them in
//! order when connectivity returns.

mod core;
mod errors;
mod types;

pub use self::core::OfflineQueue;
pub use errors::{QueueError, QueueResult};
pub use types::{
    DrainReport, OperationId, PendingOperation, QueueConfig, QueueEvent, QueueStats,
    QueuedOperation, ReplayFn, ReplayFuture,
};
