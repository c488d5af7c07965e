//! Domain constants
//!
//! Defaults mirror the values the dashboard has always shipped with.

/// Snapshot TTL for cached read results (5 minutes)
pub const DEFAULT_CACHE_TTL_MS: u64 = 300_000;

/// Default retry budget for mutating calls
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Replays before a disconnect-failed queued operation is dropped
pub const DEFAULT_MAX_REPLAY_ATTEMPTS: u32 = 3;

pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 15_000;

/// Cache key for the pending-applications list
pub const PENDING_APPLICATIONS_CACHE_KEY: &str = "applications:pending";

/// Error text recorded for ids the server left out of a bulk response
pub const BULK_MISSING_RESULT: &str = "No result reported for this id";
