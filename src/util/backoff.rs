use std::future::Future;
use std::time::Duration;

use crate::firestore::error::FirestoreResult;
use crate::platform::runtime::sleep;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MILLIS: u64 = 1_000;

/// Exponential backoff for transient failures.
///
/// The delay before retry `n` (1-based) is `base_delay * 2^(n-1)`; there is
/// no jitter, so schedules are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MILLIS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Runs `operation`, retrying transient failures according to `policy`.
///
/// Non-transient failures and the failure of the last allowed attempt are
/// returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> FirestoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FirestoreResult<T>>,
{
    let mut retry = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || retry >= policy.max_retries {
                    return Err(err);
                }
                retry += 1;
                let delay = policy.delay_for(retry);
                log::warn!(
                    "transient failure, retry {retry}/{} in {}ms: {err}",
                    policy.max_retries,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::{internal_error, permission_denied, unavailable};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delays_double_from_the_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_transient_failures() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff(&RetryPolicy::default(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(internal_error("read ECONNRESET"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_failure_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();
        let result: FirestoreResult<()> = retry_with_backoff(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(permission_denied("missing role")) }
        })
        .await;
        assert_eq!(result.unwrap_err().code_str(), "firestore/permission-denied");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let result: FirestoreResult<()> = retry_with_backoff(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable("backend down")) }
        })
        .await;
        assert_eq!(result.unwrap_err().code_str(), "firestore/unavailable");
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
