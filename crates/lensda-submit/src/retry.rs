//! Bounded retry with exponential backoff for submissions

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::rate_limit::RateLimiter;
use std::time::Duration;
use tracing::warn;

/// Retry schedule for `submit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
        }
    }

    /// Sleep before retry number `retry` (1-based): initial × 2^(retry-1), capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Submit `payload`, retrying transient failures.
///
/// A rate-limiter token is taken before every attempt, retries included. Fatal
/// errors are returned at once; the last retryable error is returned once the
/// retry budget is spent.
pub async fn submit_with_retry<L>(
    ledger: &L,
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    chunk_id: u64,
    payload: &[u8],
) -> Result<String, LedgerError>
where
    L: Ledger + ?Sized,
{
    let mut retry = 0;
    loop {
        limiter.acquire().await;

        match ledger.submit(payload.to_vec()).await {
            Ok(submission_id) => return Ok(submission_id),
            Err(err) if err.is_retryable() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.backoff(retry);
                warn!(
                    chunk_id,
                    retry,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Submission failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lensda_common::types::FinalityRecord;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedLedger {
        replies: Mutex<VecDeque<Result<String, LedgerError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedLedger {
        fn new(replies: Vec<Result<String, LedgerError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Ledger for ScriptedLedger {
        async fn submit(&self, _payload: Vec<u8>) -> Result<String, LedgerError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LedgerError::fatal("script exhausted")))
        }

        async fn get_status(&self, _submission_id: &str) -> Result<FinalityRecord, LedgerError> {
            Err(LedgerError::retryable("unused"))
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(500), Duration::from_secs(30))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_millis(500), Duration::from_secs(3));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(4), Duration::from_secs(3));
        assert_eq!(policy.backoff(40), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let ledger = ScriptedLedger::new(vec![
            Err(LedgerError::retryable("HTTP 503")),
            Err(LedgerError::retryable("connection reset")),
            Ok("sub-3".to_string()),
        ]);
        let limiter = RateLimiter::new(20);

        let started = tokio::time::Instant::now();
        let sid = submit_with_retry(&ledger, &limiter, &policy(5), 1, b"chunk")
            .await
            .unwrap();

        assert_eq!(sid, "sub-3");
        assert_eq!(ledger.calls(), 3);
        // 500ms + 1000ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let ledger = ScriptedLedger::new(vec![Err(LedgerError::fatal("HTTP 400"))]);
        let limiter = RateLimiter::new(20);

        let err = submit_with_retry(&ledger, &limiter, &policy(5), 1, b"chunk")
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::fatal("HTTP 400"));
        assert_eq!(ledger.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let ledger = ScriptedLedger::new(
            (0..10)
                .map(|_| Err(LedgerError::retryable("HTTP 502")))
                .collect(),
        );
        let limiter = RateLimiter::new(20);

        let err = submit_with_retry(&ledger, &limiter, &policy(2), 1, b"chunk")
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(ledger.calls(), 3);
    }
}
