//! Stale snapshot cache
//!
//! Keyed, time-boxed copies of last-known-good read results. The cache only
//! owns the staleness policy; physical storage is delegated to a
//! [`SnapshotStore`].

mod cache;
mod store;

pub use cache::{CachedSnapshot, StaleSnapshotCache, CACHE_KEY_PREFIX, DEFAULT_SNAPSHOT_TTL};
pub use store::{MemorySnapshotStore, SnapshotStore, StoreError, StoreResult};
