//! Time abstractions
//!
//! Snapshot timestamps, queue entry times and support-report timestamps all
//! come from a [`Clock`] so tests can drive them with [`MockClock`].

mod clock;

pub use clock::{Clock, MockClock, SystemClock};
