//! Retry with exponential backoff
//!
//! Transport-agnostic: the caller supplies the operation, the backoff curve
//! and the predicate deciding which failures are worth another attempt.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff for retry `n` is `base_delay * 2^n`
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Policy that gives up after the first failure
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based): 2s, 4s, 8s with defaults
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn run<T, E, F, Fut, P>(&self, operation: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        with_retry(operation, self.max_retries, |n| self.delay_for(n), is_transient).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

/// Run `operation`, retrying transient failures up to `max_retries` times.
///
/// Attempts are sequential. Before retry `n` the task sleeps `backoff(n)`.
/// A non-transient failure, or the last failure once retries run out, is
/// returned as is.
pub async fn with_retry<T, E, F, Fut, B, P>(
    mut operation: F,
    max_retries: u32,
    backoff: B,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32) -> Duration,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if retries < max_retries && is_transient(&error) => {
                retries += 1;
                let delay = backoff(retries);

                warn!(
                    attempt = retries + 1,
                    max_attempts = max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying: {}",
                    error
                );

                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, PartialEq)]
    enum Fault {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for Fault {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn is_transient(fault: &Fault) -> bool {
        *fault == Fault::Transient
    }

    fn assert_near(actual: Duration, expected: Duration) {
        let slack = Duration::from_millis(50);
        assert!(
            actual >= expected && actual <= expected + slack,
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_default_backoff_curve() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_transient_failures() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();
        let seen_at = Mutex::new(Vec::new());

        let result = RetryPolicy::default()
            .run(
                || {
                    seen_at.lock().unwrap().push(started.elapsed());
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err(Fault::Transient)
                        } else {
                            Ok(n)
                        }
                    }
                },
                is_transient,
            )
            .await;

        assert_eq!(assert_ok!(result), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        // 2s before the second attempt, 4s more before the third
        let seen_at = seen_at.into_inner().unwrap();
        assert_eq!(seen_at.len(), 3);
        assert_near(seen_at[0], Duration::ZERO);
        assert_near(seen_at[1], Duration::from_secs(2));
        assert_near(seen_at[2], Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), Fault> = RetryPolicy::default()
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(Fault::Transient) }
                },
                is_transient,
            )
            .await;

        assert_eq!(assert_err!(result), Fault::Transient);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_near(started.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_failure_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), Fault> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Fault::Fatal) }
            },
            3,
            |n| Duration::from_secs(2u64.pow(n)),
            is_transient,
        )
        .await;

        assert_eq!(assert_err!(result), Fault::Fatal);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_near(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_retry_policy_runs_once() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), Fault> = RetryPolicy::none()
            .run(
                || {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    async { Err(Fault::Transient) }
                },
                is_transient,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
