// Retry utilities

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::types::AppResult;

/// Bounded retry with a fixed wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
        }
    }

    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Long enough for a per-minute token window to reset
        Self::new(5, Duration::from_secs(65))
    }
}

/// Run `operation`, retrying only while it fails with a rate-limit error.
///
/// Any other error, or a rate-limit error on the last attempt, is returned as-is.
pub async fn retry_on_rate_limit<F, Fut, T>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if error.is_rate_limited() && attempt < policy.max_attempts => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    wait_secs = policy.wait.as_secs(),
                    "Rate limited, waiting before retry"
                );
                sleep(policy.wait).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_on_rate_limit(fast(5), "upsert", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(AppError::rate_limited("test", "429"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_on_rate_limit(fast(3), "upsert", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::rate_limited("test", "429"))
        })
        .await;

        assert!(result.unwrap_err().is_rate_limited());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = retry_on_rate_limit(fast(5), "upsert", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Index("bad request".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Index(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
