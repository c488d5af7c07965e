//! Shared test helpers for `clubhouse-core` integration tests.
//!
//! In-memory gateways plus a context factory, so the tests can focus on
//! resilience behaviour instead of wiring.

#![allow(dead_code)]

pub mod gateways;

use std::sync::Arc;
use std::time::Duration;

use clubhouse_common::resilience::{BackoffStrategy, RetryPolicy};
use clubhouse_common::testing::MockClock;
use clubhouse_core::ResilienceContext;

/// Retry policy with millisecond backoff for fast tests
pub fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { max_attempts, backoff: BackoffStrategy::Fixed(Duration::from_millis(1)) }
}

/// Fresh started context on a mock clock
pub fn context(online: bool) -> (ResilienceContext, MockClock) {
    let clock = MockClock::at_epoch_millis(1_760_000_000_000);
    let context = ResilienceContext::builder()
        .with_clock(Arc::new(clock.clone()))
        .with_default_policy(quick_policy(3))
        .initially_online(online)
        .start()
        .expect("valid context");
    (context, clock)
}
