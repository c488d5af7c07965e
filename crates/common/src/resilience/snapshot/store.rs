//! Key-value backends for snapshot documents

use std::collections::BTreeMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::error::{CommonError, ErrorSeverity};
use crate::{impl_error_classification, impl_error_conversion};

/// Snapshot store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("Snapshot key must not be empty")]
    EmptyKey,

    #[error("Snapshot store unavailable: {0}")]
    Unavailable(String),
}

impl_error_conversion!(StoreError, Common);

impl_error_classification!(StoreError, Common,
    Self::EmptyKey => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Unavailable(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
);

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent string key-value store holding serialized snapshots
///
/// Implementations must be cheap to call from async code: lookups are
/// expected to be local (memory, an embedded database) and never touch the
/// network.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite; last writer wins
    fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Remove a key, returning whether it existed
    fn remove(&self, key: &str) -> StoreResult<bool>;

    /// Every stored key starting with `prefix`, in lexical order
    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// In-process store, used in tests and as a fallback when no database path
/// is configured
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
