use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::ai::error::ServiceError;

/// Exponential backoff between retries of a failing service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2000),
            multiplier: 2,
            max_delay: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (0-based): `initial * multiplier^retry`, capped.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent. The last error is returned on failure.
    pub async fn execute<T, F, Fut>(&self, mut operation: F, label: &str) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut retry = 0u32;
        loop {
            debug!("{}: attempt {}/{}", label, retry + 1, self.policy.max_retries + 1);
            match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        info!("{}: succeeded after {} retries", label, retry);
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    warn!("{}: non-retryable error: {}", label, err);
                    return Err(err);
                }
                Err(err) if retry >= self.policy.max_retries => {
                    error!(
                        "{}: giving up after {} attempts: {}",
                        label,
                        retry + 1,
                        err
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.policy.backoff_delay(retry);
                    warn!(
                        "{}: retryable error (status {:?}): {}. Retry {}/{} in {}ms",
                        label,
                        err.status,
                        err,
                        retry + 1,
                        self.policy.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn backoff_schedule_doubles_then_clamps() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff_delay(0), Duration::from_millis(2000));
        assert_eq!(p.backoff_delay(1), Duration::from_millis(4000));
        assert_eq!(p.backoff_delay(2), Duration::from_millis(8000));
        assert_eq!(p.backoff_delay(3), Duration::from_millis(8000));
        assert_eq!(p.backoff_delay(40), Duration::from_millis(8000));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limit_then_succeeds() {
        let exec = RetryExecutor::new(RetryPolicy::default());
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result = exec
            .execute(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(ServiceError::with_status(429, "rate limited"))
                    } else {
                        Ok("analysis")
                    }
                },
                "test",
            )
            .await;

        assert_eq!(result.unwrap(), "analysis");
        // 1 initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn plain_error_fails_without_retry() {
        let exec = RetryExecutor::new(RetryPolicy::default());
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = exec
            .execute(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::new("boom"))
                },
                "test",
            )
            .await;

        assert_eq!(result.unwrap_err().message, "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_exhausts_budget() {
        let exec = RetryExecutor::new(RetryPolicy::default());
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<(), _> = exec
            .execute(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::with_status(503, format!("unavailable #{n}")))
                },
                "test",
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Most recent error wins.
        assert_eq!(err.message, "unavailable #3");
        assert!(started.elapsed() >= Duration::from_millis(14_000));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_after_retryable_stops_immediately() {
        let exec = RetryExecutor::new(RetryPolicy::default());
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = exec
            .execute(
                move || async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(ServiceError::new("quota exceeded"))
                    } else {
                        Err(ServiceError::with_status(400, "invalid argument"))
                    }
                },
                "test",
            )
            .await;

        assert_eq!(result.unwrap_err().status, Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_retry_policy_makes_one_attempt() {
        let exec = RetryExecutor::new(RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        });
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = exec
            .execute(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::with_status(429, "slow down"))
                },
                "test",
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
