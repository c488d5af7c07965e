//! Testing utilities and helpers
//!
//! - **[`fixtures`]**: flaky operations, recording observers, seeded ids
//! - Clock abstractions re-exported from [`crate::time`]
//!
//! ```rust
//! use std::time::Duration;
//!
//! use clubhouse_common::testing::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! ```

pub mod fixtures;

pub use fixtures::{seeded_ids, FlakyOperation, RecordingObserver};

pub use crate::time::{Clock, MockClock, SystemClock};
