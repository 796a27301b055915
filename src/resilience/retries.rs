//! Retry logic for remote calls.
//!
//! # Responsibilities
//! - Decide whether a failed call may be retried
//! - Run an async operation with jittered exponential backoff
//! - Report how many attempts were made when giving up

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::settings::SyncSettings;

/// Whether a failure is worth another attempt.
///
/// Network errors (no status) and 5xx or 429 responses are transient.
pub fn is_retryable(status: Option<u16>, network_error: bool) -> bool {
    if network_error {
        return true;
    }
    match status {
        None => true,
        Some(429) => true,
        Some(code) => (500..600).contains(&code),
    }
}

/// Errors that know whether they are transient.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, 0, 0)
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.max_attempts, settings.base_delay_ms, settings.max_delay_ms)
    }

    /// Pause before retry number `retry` (1-based): the base delay doubled
    /// per earlier retry, capped at the maximum, plus up to a tenth of that
    /// as jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        let Some(doublings) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };
        let ceiling = 1u64
            .checked_shl(doublings)
            .map_or(u64::MAX, |factor| self.base_delay_ms.saturating_mul(factor))
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0..=ceiling / 10);
        Duration::from_millis(ceiling + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

/// The last error of an operation that ran out of attempts (or failed
/// permanently), with the number of attempts made.
#[derive(Debug)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or the budget is spent.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, RetryFailure<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempts >= policy.max_attempts || !error.is_retryable() {
                    return Err(RetryFailure { error, attempts });
                }
                let delay = policy.delay(attempts);
                tracing::info!(
                    operation = %operation,
                    attempt = attempts,
                    delay = ?delay,
                    error = %error,
                    "Retrying remote call"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Failure(Option<u16>);

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "status {:?}", self.0)
        }
    }

    impl Retryable for Failure {
        fn is_retryable(&self) -> bool {
            is_retryable(self.0, false)
        }
    }

    #[test]
    fn test_classification() {
        assert!(is_retryable(None, true));
        assert!(is_retryable(Some(503), false));
        assert!(is_retryable(Some(429), false));
        assert!(!is_retryable(Some(404), false));
        assert!(!is_retryable(Some(422), false));
        assert!(!is_retryable(Some(401), false));
    }

    #[test]
    fn test_policy_floor() {
        assert_eq!(RetryPolicy::new(0, 10, 20).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = RetryPolicy::new(5, 100, 1000);
        assert_eq!(policy.delay(0), Duration::ZERO);

        let first = policy.delay(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(110));
        let third = policy.delay(3);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(440));
        let capped = policy.delay(10);
        assert!(capped >= Duration::from_millis(1000) && capped <= Duration::from_millis(1100));
    }

    #[test]
    fn test_delay_edge_cases() {
        assert_eq!(RetryPolicy::none().delay(3), Duration::ZERO);
        let policy = RetryPolicy::new(3, 200, 2000);
        assert!(policy.delay(u32::MAX) <= Duration::from_millis(2200));
        assert!(policy.delay(64) >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, 1, 5);
        let result = retry(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Failure(Some(503)))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, 1, 5);
        let failure = retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Failure(Some(404))) }
        })
        .await
        .unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let policy = RetryPolicy::new(3, 1, 5);
        let failure = retry(&policy, "test", || async { Err::<(), _>(Failure(None)) })
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.error.0, None);
    }
}
