//! Retry strategies
//!
//! Two independent policies live here:
//! - [`BackoffPolicy`] with [`retry_with_backoff`]: bounded exponential
//!   backoff, used inside the HTTP adapter for transient status codes.
//! - [`NameResolutionRetry`]: fixed-delay retry of the same page after a
//!   name-resolution failure, used by the pagination controller. Unbounded
//!   unless a cap is configured.

use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Base factor: the wait after the n-th failed attempt is `factor * 2^(n-1)`
    pub factor: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, factor: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            factor,
        }
    }

    /// Wait after the `failed_attempt`-th attempt (1-based) before the next one
    ///
    /// | Failed attempt | Wait (factor = 2 s) |
    /// |----------------|---------------------|
    /// | 1              | 2 s                 |
    /// | 2              | 4 s                 |
    /// | 3              | 8 s                 |
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.factor.saturating_mul(1u32 << exponent)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Executes `operation` until it succeeds, fails with a non-retriable error,
/// or `policy.max_attempts` attempts have been made.
///
/// The last error is returned when attempts run out.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &BackoffPolicy,
    is_retriable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_attempts {
                    return Err(err);
                }

                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient server error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Fixed-delay retry for name-resolution failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameResolutionRetry {
    /// Wait before fetching the same page again
    pub delay: Duration,

    /// Cap on retries for one page; `None` retries forever
    pub max_retries: Option<u32>,
}

impl NameResolutionRetry {
    pub fn new(delay: Duration, max_retries: Option<u32>) -> Self {
        Self { delay, max_retries }
    }

    /// Returns true if the `retry`-th retry (1-based) of a page may happen
    pub fn allows(&self, retry: u32) -> bool {
        self.max_retries.map_or(true, |max| retry <= max)
    }
}

impl Default for NameResolutionRetry {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn is_transient(err: &TestError) -> bool {
        *err == TestError::Transient
    }

    fn instant_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn test_delay_schedule_doubles() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let policy = BackoffPolicy::new(100, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.delay_after(90), Duration::MAX);
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(BackoffPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&instant_policy(3), is_transient, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, TestError>(42)
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&instant_policy(3), is_transient, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&instant_policy(3), is_transient, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TestError>(TestError::Transient)
            }
        })
        .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_fatal_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&instant_policy(3), is_transient, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TestError>(TestError::Fatal)
            }
        })
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_name_resolution_retry_unbounded_by_default() {
        let retry = NameResolutionRetry::default();
        assert_eq!(retry.delay, Duration::from_secs(10));
        assert!(retry.allows(1));
        assert!(retry.allows(1_000_000));
    }

    #[test]
    fn test_name_resolution_retry_with_cap() {
        let retry = NameResolutionRetry::new(Duration::ZERO, Some(2));
        assert!(retry.allows(1));
        assert!(retry.allows(2));
        assert!(!retry.allows(3));
    }
}
