//! Bounded retry with backoff
//!
//! [`RetryExecutor::run`] invokes an async operation, classifies each failure
//! and re-attempts only while attempts remain and the failure's category is
//! retryable (`network`, `server`). Attempts are strictly sequential and the
//! executor suspends for the policy's backoff between them.
//!
//! ```text
//! Idle -> Running -> Success
//!            |
//!            v
//!       AttemptFailed -> Running   (attempts left and retryable)
//!            |
//!            v
//!          Failed
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, trace, warn};

use super::classify::{ErrorClassifier, ErrorRecord, RawFailure};
use super::connectivity::ConnectivityMonitor;
use crate::error::{CommonError, CommonResult};

/// Backoff strategy for calculating delays between attempts
///
/// Delays are computed from the 1-based number of the attempt that just
/// failed, and every built-in strategy is non-decreasing in that number.
#[derive(Debug, Clone)]
#[allow(unpredictable_function_pointer_comparisons)]
#[derive(PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed delay between attempts
    Fixed(Duration),
    /// `initial_delay + (attempt - 1) * increment`
    Linear { initial_delay: Duration, increment: Duration },
    /// `initial_delay * 2^(attempt - 1)`, capped at `max_delay`
    Exponential { initial_delay: Duration, max_delay: Duration },
    /// Custom backoff function
    Custom(fn(u32) -> Duration),
}

impl BackoffStrategy {
    /// Delay to wait after the given failed attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let step = attempt.saturating_sub(1);
        match self {
            Self::Fixed(delay) => *delay,
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(step))
            }
            Self::Exponential { initial_delay, max_delay } => {
                let factor = 2_u32.saturating_pow(step);
                initial_delay.saturating_mul(factor).min(*max_delay)
            }
            Self::Custom(f) => f(attempt),
        }
    }
}

/// Attempt budget plus backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
            },
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that never re-attempts
    pub fn single_attempt() -> Self {
        Self { max_attempts: 1, backoff: BackoffStrategy::Fixed(Duration::ZERO) }
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts == 0 {
            return Err(CommonError::config_field(
                "max_attempts",
                "max_attempts must be greater than 0",
            ));
        }
        if let BackoffStrategy::Exponential { initial_delay, max_delay } = &self.backoff {
            if max_delay < initial_delay {
                return Err(CommonError::config_field(
                    "max_delay",
                    "max_delay must not be shorter than initial_delay",
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`RetryPolicy`] with fluent API
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.policy.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn linear_backoff(mut self, initial_delay: Duration, increment: Duration) -> Self {
        self.policy.backoff = BackoffStrategy::Linear { initial_delay, increment };
        self
    }

    pub fn exponential_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.policy.backoff = BackoffStrategy::Exponential { initial_delay, max_delay };
        self
    }

    pub fn custom_backoff(mut self, f: fn(u32) -> Duration) -> Self {
        self.policy.backoff = BackoffStrategy::Custom(f);
        self
    }

    pub fn build(self) -> CommonResult<RetryPolicy> {
        self.policy.validate()?;
        Ok(self.policy)
    }
}

/// Phase of a single retry run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPhase {
    #[default]
    Idle,
    Running,
    AttemptFailed,
    Success,
    Failed,
}

impl RetryPhase {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Per-run bookkeeping, dropped when the run ends
#[derive(Debug, Clone, Default)]
pub struct AttemptState {
    pub attempt_number: u32,
    pub last_error: Option<ErrorRecord>,
    pub phase: RetryPhase,
}

impl AttemptState {
    fn transition(&mut self, to: RetryPhase) {
        trace!(attempt = self.attempt_number, from = ?self.phase, to = ?to, "retry_phase");
        self.phase = to;
    }
}

/// Receives `(attempt_number, max_attempts, record)` after every failed
/// attempt
pub trait AttemptObserver {
    fn on_attempt_failed(&self, attempt_number: u32, max_attempts: u32, error: &ErrorRecord);
}

impl<F> AttemptObserver for F
where
    F: Fn(u32, u32, &ErrorRecord),
{
    fn on_attempt_failed(&self, attempt_number: u32, max_attempts: u32, error: &ErrorRecord) {
        self(attempt_number, max_attempts, error);
    }
}

struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn on_attempt_failed(&self, _: u32, _: u32, _: &ErrorRecord) {}
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    classifier: ErrorClassifier,
    monitor: Option<Arc<ConnectivityMonitor>>,
}

impl RetryExecutor {
    pub fn new(classifier: ErrorClassifier) -> Self {
        Self { classifier, monitor: None }
    }

    /// Classify failures with the monitor's live offline flag
    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    fn is_offline(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_online())
    }

    /// Run `op` until it succeeds or the policy gives up
    pub async fn run<F, Fut, T, E>(&self, op: F, policy: &RetryPolicy) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run_observed(op, policy, &NoopObserver).await
    }

    /// Like [`run`](Self::run), reporting each failed attempt to `observer`
    ///
    /// A policy with `max_attempts == 0` is treated as a single attempt.
    #[instrument(skip_all, fields(max_attempts = policy.max_attempts))]
    pub async fn run_observed<F, Fut, T, E, O>(
        &self,
        mut op: F,
        policy: &RetryPolicy,
        observer: &O,
    ) -> Result<T, ErrorRecord>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
        O: AttemptObserver + ?Sized,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut state = AttemptState::default();
        let mut last_delay = Duration::ZERO;

        loop {
            state.attempt_number += 1;
            state.transition(RetryPhase::Running);

            let failure = match op().await {
                Ok(value) => {
                    state.transition(RetryPhase::Success);
                    if state.attempt_number > 1 {
                        debug!(attempts = state.attempt_number, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err.into(),
            };

            let record = self.classifier.classify(&failure, self.is_offline());
            state.transition(RetryPhase::AttemptFailed);
            observer.on_attempt_failed(state.attempt_number, max_attempts, &record);

            if state.attempt_number >= max_attempts || !record.is_retryable() {
                state.transition(RetryPhase::Failed);
                warn!(
                    attempts = state.attempt_number,
                    category = %record.category(),
                    retryable = record.is_retryable(),
                    "operation failed"
                );
                return Err(record);
            }

            let delay = policy.backoff.calculate_delay(state.attempt_number).max(last_delay);
            last_delay = delay;
            debug!(
                attempt = state.attempt_number,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                category = %record.category(),
                "attempt failed, backing off"
            );
            state.last_error = Some(record);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for backoff strategies and the retry state machine

    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::resilience::classify::ErrorCategory;

    /// Validates `BackoffStrategy::Exponential` behavior for the backoff
    /// strategy exponential scenario.
    ///
    /// Assertions:
    /// - Confirms delays double from 1s per attempt.
    /// - Confirms the delay caps at `max_delay`.
    #[test]
    fn test_backoff_strategy_exponential() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };

        assert_eq!(strategy.calculate_delay(1), Duration::from_secs(1));
        assert_eq!(strategy.calculate_delay(2), Duration::from_secs(2));
        assert_eq!(strategy.calculate_delay(3), Duration::from_secs(4));
        assert_eq!(strategy.calculate_delay(4), Duration::from_secs(8));
        assert_eq!(strategy.calculate_delay(5), Duration::from_secs(10));
        assert_eq!(strategy.calculate_delay(64), Duration::from_secs(10));
    }

    /// Validates `BackoffStrategy::Linear` behavior for the backoff strategy
    /// linear scenario.
    ///
    /// Assertions:
    /// - Confirms `strategy.calculate_delay(1)` equals
    ///   `Duration::from_millis(100)`.
    /// - Confirms `strategy.calculate_delay(3)` equals
    ///   `Duration::from_millis(200)`.
    #[test]
    fn test_backoff_strategy_linear() {
        let strategy = BackoffStrategy::Linear {
            initial_delay: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };

        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(150));
        assert_eq!(strategy.calculate_delay(3), Duration::from_millis(200));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let strategies = [
            BackoffStrategy::Fixed(Duration::from_millis(5)),
            BackoffStrategy::Linear {
                initial_delay: Duration::from_millis(5),
                increment: Duration::from_millis(5),
            },
            RetryPolicy::default().backoff,
        ];
        for strategy in strategies {
            let delays: Vec<_> = (1..40).map(|a| strategy.calculate_delay(a)).collect();
            assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{strategy:?}");
        }
    }

    #[test]
    fn test_policy_default_and_validation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.validate().is_ok());

        assert!(RetryPolicy::builder().max_attempts(0).build().is_err());
        assert!(RetryPolicy::builder()
            .exponential_backoff(Duration::from_secs(5), Duration::from_secs(1))
            .build()
            .is_err());
    }

    /// Tests that an always-failing retryable operation runs exactly
    /// `max_attempts` times
    /// Verifies:
    /// - Invocation count equals the attempt budget
    /// - The final error is the last attempt's record
    /// - Total virtual time equals the sum of backoff delays (1s + 2s)
    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = RetryExecutor::default()
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Err(format!("HTTP 503 server unavailable (call {n})")) }
                },
                &RetryPolicy::default(),
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(err.message().contains("call 3"));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_failure_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::builder().max_attempts(10).build().unwrap();

        let result: Result<(), _> = RetryExecutor::default()
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("HTTP 400 Bad Request") }
                },
                &policy,
            )
            .await;

        assert_eq!(result.unwrap_err().category(), ErrorCategory::Validation);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Validates `RetryExecutor::run_observed` behavior for the observer
    /// notification scenario.
    ///
    /// Assertions:
    /// - Confirms the observer sees `(1, 3)` and `(2, 3)` before success.
    #[tokio::test(start_paused = true)]
    async fn test_observer_sees_each_failed_attempt() {
        let seen = Mutex::new(Vec::new());
        let calls = AtomicU32::new(0);
        let observer = |attempt: u32, max: u32, record: &ErrorRecord| {
            seen.lock().push((attempt, max, record.category()));
        };

        let value = RetryExecutor::default()
            .run_observed(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(RawFailure::network("connection reset"))
                        } else {
                            Ok(42)
                        }
                    }
                },
                &RetryPolicy::default(),
                &observer,
            )
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(
            *seen.lock(),
            vec![(1, 3, ErrorCategory::Network), (2, 3, ErrorCategory::Network)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_treated_as_one() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };

        let _ = RetryExecutor::default()
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>("network down") }
                },
                &policy,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_monitor_changes_suggestions() {
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let executor = RetryExecutor::default().with_monitor(monitor);

        let err = executor
            .run(|| async { Err::<(), _>("HTTP 403") }, &RetryPolicy::single_attempt())
            .await
            .unwrap_err();

        assert!(err.suggestions()[0].contains("offline"));
    }
}
