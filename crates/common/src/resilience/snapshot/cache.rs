use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::{SnapshotStore, StoreResult};
use crate::time::Clock;

/// Prefix under which every snapshot document is stored
pub const CACHE_KEY_PREFIX: &str = "offline-cache-";

/// Default time-to-live for snapshots (5 minutes)
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(300);

/// Physical document layout: `{ "data", "timestamp", "ttlMs" }`
///
/// Documents written without `ttlMs` fall back to the cache's default TTL.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument<T> {
    data: T,
    timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl_ms: Option<u64>,
}

/// A cached payload plus its staleness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSnapshot<T> {
    pub payload: T,
    /// Milliseconds since the UNIX epoch at write time
    pub cached_at: u64,
    #[serde(skip)]
    pub age: Duration,
    pub is_stale: bool,
}

/// Last-known-good results with explicit staleness
///
/// Stale snapshots are still returned, flagged with `is_stale`. Reads are
/// pure lookups against the store.
pub struct StaleSnapshotCache<C: Clock = Arc<dyn Clock>> {
    store: Arc<dyn SnapshotStore>,
    clock: C,
    default_ttl: Duration,
}

impl<C: Clock> std::fmt::Debug for StaleSnapshotCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleSnapshotCache").field("default_ttl", &self.default_ttl).finish()
    }
}

impl<C: Clock> StaleSnapshotCache<C> {
    pub fn new(store: Arc<dyn SnapshotStore>, clock: C) -> Self {
        Self { store, clock, default_ttl: DEFAULT_SNAPSHOT_TTL }
    }

    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn physical_key(key: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{key}")
    }

    /// Store `payload` under `key`, replacing any earlier snapshot
    pub fn write<T: Serialize>(&self, key: &str, payload: &T, ttl: Duration) -> StoreResult<()> {
        let document = SnapshotDocument {
            data: payload,
            timestamp: self.clock.millis_since_epoch(),
            ttl_ms: Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
        };
        let encoded = serde_json::to_string(&document)?;
        self.store.set(&Self::physical_key(key), encoded)?;
        debug!(key, ttl_ms = document.ttl_ms, "snapshot_written");
        Ok(())
    }

    /// Look up `key`; corrupt documents read as absent
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<CachedSnapshot<T>>> {
        let Some(raw) = self.store.get(&Self::physical_key(key))? else {
            return Ok(None);
        };

        let document: SnapshotDocument<T> = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                warn!(key, error = %err, "discarding unreadable snapshot");
                return Ok(None);
            }
        };

        let ttl = document.ttl_ms.map_or(self.default_ttl, Duration::from_millis);
        let age =
            Duration::from_millis(self.clock.millis_since_epoch().saturating_sub(document.timestamp));
        let is_stale = age > ttl;
        debug!(key, age_ms = age.as_millis() as u64, is_stale, "snapshot_read");

        Ok(Some(CachedSnapshot { payload: document.data, cached_at: document.timestamp, age, is_stale }))
    }

    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        self.store.remove(&Self::physical_key(key))
    }

    /// Drop every snapshot, returning how many were removed
    pub fn clear(&self) -> StoreResult<usize> {
        let keys = self.store.keys_with_prefix(CACHE_KEY_PREFIX)?;
        let mut removed = 0;
        for key in &keys {
            if self.store.remove(key)? {
                removed += 1;
            }
        }
        debug!(removed, "snapshot_cache_cleared");
        Ok(removed)
    }
}
