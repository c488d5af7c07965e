//! Bulk action results
//!
//! The server answers a batch call with two lists. [`BulkOutcome::reconcile`]
//! turns that answer into an exact partition of the ids that were asked for:
//! every requested id ends up in exactly one of `successful_ids` or `failed`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::BULK_MISSING_RESULT;
use crate::types::application::ApplicationId;

/// One id the server rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: ApplicationId,
    pub error: String,
}

impl BulkFailure {
    pub fn new(id: impl Into<ApplicationId>, error: impl Into<String>) -> Self {
        Self { id: id.into(), error: error.into() }
    }
}

/// Raw per-item result of a batch call, as the server sent it
///
/// Nothing about it is trusted: ids may be missing, repeated, unknown, or
/// listed on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkResponse {
    pub succeeded: Vec<ApplicationId>,
    pub failed: Vec<BulkFailure>,
}

/// Partition of a requested id set into accepted and rejected ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub successful_ids: Vec<ApplicationId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Build the outcome for `requested` from a server response
    ///
    /// - duplicate requested ids count once, first occurrence wins the slot
    /// - an id reported as failed is failed even if also reported as succeeded
    /// - an id the server never mentions fails with [`BULK_MISSING_RESULT`]
    /// - ids that were not requested are ignored
    ///
    /// Both output lists follow the order of `requested`.
    pub fn reconcile(requested: &[ApplicationId], response: BulkResponse) -> Self {
        let succeeded: HashSet<ApplicationId> = response.succeeded.into_iter().collect();
        let mut errors: HashMap<ApplicationId, String> = HashMap::new();
        for failure in response.failed {
            errors.entry(failure.id).or_insert(failure.error);
        }

        let mut seen = HashSet::with_capacity(requested.len());
        let mut outcome = Self::default();
        for id in requested {
            if !seen.insert(id) {
                continue;
            }
            if let Some(error) = errors.remove(id) {
                outcome.failed.push(BulkFailure { id: id.clone(), error });
            } else if succeeded.contains(id) {
                outcome.successful_ids.push(id.clone());
            } else {
                outcome.failed.push(BulkFailure::new(id.clone(), BULK_MISSING_RESULT));
            }
        }
        outcome
    }

    /// Every id in `requested` fails with the same error
    pub fn fail_all(requested: &[ApplicationId], error: &str) -> Self {
        Self::reconcile(
            requested,
            BulkResponse {
                succeeded: Vec::new(),
                failed: requested.iter().map(|id| BulkFailure::new(id.clone(), error)).collect(),
            },
        )
    }

    /// Number of ids covered
    pub fn total(&self) -> usize {
        self.successful_ids.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &ApplicationId> {
        self.failed.iter().map(|failure| &failure.id)
    }

    /// Whether the two lists are disjoint and together cover exactly the
    /// distinct ids of `requested`
    pub fn is_partition_of(&self, requested: &[ApplicationId]) -> bool {
        let expected: HashSet<&ApplicationId> = requested.iter().collect();
        let mut covered = HashSet::with_capacity(self.total());
        for id in self.successful_ids.iter().chain(self.failed_ids()) {
            if !covered.insert(id) {
                return false;
            }
        }
        covered == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ApplicationId> {
        raw.iter().map(|id| ApplicationId::new(*id)).collect()
    }

    #[test]
    fn test_failure_wins_over_success() {
        let requested = ids(&["a"]);
        let response = BulkResponse {
            succeeded: ids(&["a"]),
            failed: vec![BulkFailure::new("a", "already approved")],
        };
        let outcome = BulkOutcome::reconcile(&requested, response);
        assert!(outcome.successful_ids.is_empty());
        assert_eq!(outcome.failed, vec![BulkFailure::new("a", "already approved")]);
    }

    #[test]
    fn test_missing_ids_fail_and_extra_ids_are_ignored() {
        let requested = ids(&["a", "b"]);
        let response = BulkResponse { succeeded: ids(&["a", "zzz"]), failed: Vec::new() };
        let outcome = BulkOutcome::reconcile(&requested, response);
        assert_eq!(outcome.successful_ids, ids(&["a"]));
        assert_eq!(outcome.failed, vec![BulkFailure::new("b", BULK_MISSING_RESULT)]);
        assert!(outcome.is_partition_of(&requested));
    }

    #[test]
    fn test_duplicate_requests_count_once() {
        let requested = ids(&["a", "a", "b"]);
        let response = BulkResponse { succeeded: ids(&["a", "b"]), failed: Vec::new() };
        let outcome = BulkOutcome::reconcile(&requested, response);
        assert_eq!(outcome.total(), 2);
        assert!(outcome.all_succeeded());
        assert!(outcome.is_partition_of(&requested));
    }

    #[test]
    fn test_is_partition_rejects_overlap() {
        let outcome = BulkOutcome {
            successful_ids: ids(&["a"]),
            failed: vec![BulkFailure::new("a", "x")],
        };
        assert!(!outcome.is_partition_of(&ids(&["a"])));
    }

    #[test]
    fn test_fail_all() {
        let requested = ids(&["a", "b"]);
        let outcome = BulkOutcome::fail_all(&requested, "batch rejected");
        assert_eq!(outcome.failed.len(), 2);
        assert!(outcome.failed.iter().all(|f| f.error == "batch rejected"));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let json = serde_json::to_value(BulkOutcome::default()).unwrap();
        assert!(json.get("successfulIds").is_some());
    }
}
