//! Rate-limit-aware retry with exponential backoff
//!
//! Wraps one logical provider call. Explicit throttling and transient
//! network failures back off and retry; authentication and malformed
//! request errors propagate immediately. On exhaustion the last concrete
//! error surfaces, never a generic "retries exhausted".

use crate::config::RetryConfig;
use crate::error::{RelayError, Result};
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Execute a provider call with retry and exponential backoff.
///
/// `op` is called once per attempt. Each attempt is bounded by the
/// policy's per-attempt budget and by whatever remains until `deadline`;
/// backoff sleeps are interrupted by the cancellation token so a
/// supervisor timeout is observed promptly.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryConfig,
    deadline: Instant,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error: Option<RelayError> = None;

    for attempt in 0..policy.max_attempts.max(1) {
        if cancel.is_cancelled() {
            return Err(last_error.unwrap_or(RelayError::Cancelled));
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let attempt_budget = policy.attempt_timeout().min(remaining);

        match tokio::time::timeout(attempt_budget, op()).await {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "provider call succeeded after retry");
                }
                return Ok(value);
            }
            Ok(Err(RelayError::Cancelled)) => {
                // The supervisor fired mid-attempt; report what actually
                // went wrong before it did, if anything.
                return Err(last_error.unwrap_or(RelayError::Cancelled));
            }
            Ok(Err(error)) if error.is_retryable() => {
                last_error = Some(error);
            }
            Ok(Err(error)) => return Err(error),
            Err(_elapsed) => {
                last_error = Some(RelayError::Transient(format!(
                    "attempt {} exceeded its {}ms budget",
                    attempt + 1,
                    attempt_budget.as_millis()
                )));
            }
        }

        if attempt + 1 == policy.max_attempts {
            break;
        }

        let delay = policy.delay_for_attempt(attempt);
        if Instant::now() + delay >= deadline {
            break;
        }

        if let Some(error) = &last_error {
            warn!(
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retryable provider error, backing off"
            );
        }

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => {
                return Err(last_error.unwrap_or(RelayError::Cancelled));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| RelayError::Transient("no attempts made".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            max_attempts,
            attempt_timeout_secs: 30,
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(600)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_needs_one_attempt() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = call_with_retry(&policy(5), far_deadline(), &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_twice_then_success() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let result = call_with_retry(&policy(5), far_deadline(), &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RelayError::RateLimited("too many requests".into()))
                } else {
                    Ok("answer".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Backoff slept 100ms then 200ms with the paused clock
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_never_retried() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<()> = call_with_retry(&policy(5), far_deadline(), &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RelayError::Permanent("401 unauthorized".into())) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), "provider-rejected");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_last_error() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<()> = call_with_retry(&policy(3), far_deadline(), &cancel, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RelayError::Transient("connection reset".into()))
                } else {
                    Err(RelayError::RateLimited("still throttled".into()))
                }
            }
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.kind(), "rate-limited");
        assert!(error.to_string().contains("still throttled"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_backoff() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        // Room for one attempt but not for the first backoff sleep
        let deadline = Instant::now() + Duration::from_millis(50);

        let result: Result<()> = call_with_retry(&policy(5), deadline, &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RelayError::RateLimited("busy".into())) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), "rate-limited");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_increase_then_plateau() {
        let config = RetryConfig {
            base_delay_ms: 100,
            max_delay_ms: 400,
            max_attempts: 6,
            attempt_timeout_secs: 30,
        };
        let mut previous = Duration::ZERO;
        for attempt in 0..5 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= previous, "delay regressed at attempt {attempt}");
            assert!(delay <= config.max_delay());
            previous = delay;
        }
        assert_eq!(config.delay_for_attempt(4), config.max_delay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let attempts = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });

        let result: Result<()> = call_with_retry(&policy(5), far_deadline(), &cancel, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(RelayError::Transient("flaky".into())) }
        })
        .await;

        // Cancelled during the first 100ms backoff sleep; the concrete
        // error still surfaces.
        assert_eq!(result.unwrap_err().kind(), "provider-unreachable");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
