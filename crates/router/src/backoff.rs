//! Exponential backoff for retryable RPC attempts (`spec.md` §4.7): 500 ms
//! initial delay, factor 1.5, capped at 10 s, up to 100 attempts.

use std::time::Duration;

use hydraide_core::{BACKOFF_FACTOR, BACKOFF_INITIAL_MS, BACKOFF_MAX_ATTEMPTS, BACKOFF_MAX_MS};

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    initial: Duration,
    max: Duration,
    factor: f64,
    max_attempts: u32,
}

impl BackoffPolicy {
    /// The connection policy's default backoff, applied to idempotent RPCs
    /// on retryable status codes.
    pub fn hydraide_default() -> Self {
        BackoffPolicy {
            initial: Duration::from_millis(BACKOFF_INITIAL_MS),
            max: Duration::from_millis(BACKOFF_MAX_MS),
            factor: BACKOFF_FACTOR,
            max_attempts: BACKOFF_MAX_ATTEMPTS,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay to wait before retry attempt `attempt` (1-based: the delay
    /// before the *second* try is `delay_for_attempt(1)`). Returns `None`
    /// once `max_attempts` is exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let scaled = self.initial.as_secs_f64() * self.factor.powi(attempt as i32 - 1);
        let capped = scaled.min(self.max.as_secs_f64()).max(0.0);
        Some(Duration::from_secs_f64(capped))
    }
}

/// Retries `op` per `policy`, sleeping between attempts. `is_retryable`
/// classifies a failure as worth retrying; a non-retryable error or
/// exhausted attempts returns immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: BackoffPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_attempts() && is_retryable(&e) => {
                if let Some(delay) = policy.delay_for_attempt(attempt) {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after transient RPC failure");
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_retry_delay_is_initial() {
        let policy = BackoffPolicy::hydraide_default();
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(500)));
    }

    #[test]
    fn delay_grows_by_factor_and_caps() {
        let policy = BackoffPolicy::hydraide_default();
        let d2 = policy.delay_for_attempt(2).unwrap();
        assert_eq!(d2, Duration::from_millis(750));
        // After enough attempts the delay saturates at `max`.
        let d_large = policy.delay_for_attempt(50).unwrap();
        assert_eq!(d_large, Duration::from_secs(10));
    }

    #[test]
    fn exhausted_attempts_yield_none() {
        let policy = BackoffPolicy::hydraide_default();
        assert!(policy.delay_for_attempt(100).is_none());
    }

    #[tokio::test]
    async fn retry_with_backoff_stops_on_non_retryable() {
        let policy = BackoffPolicy::hydraide_default();
        let mut calls = 0;
        let result: Result<(), &str> = retry_with_backoff(
            policy,
            |_e: &&str| false,
            || {
                calls += 1;
                async { Err("permanent") }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_with_backoff_eventually_succeeds() {
        let policy = BackoffPolicy::hydraide_default();
        let mut calls = 0;
        let result: Result<u32, &str> = retry_with_backoff(
            policy,
            |_e: &&str| true,
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 3 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }
}
