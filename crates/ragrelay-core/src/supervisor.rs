//! Outer deadline enforcement with cancellation propagation
//!
//! One logical query gets one wall-clock budget, regardless of how many
//! retry attempts happen inside it. When the budget elapses the wrapped
//! operation is told to stop through its cancellation token, not merely
//! abandoned; a short grace window lets it surface the last error it saw
//! for diagnosis.

use crate::error::{RelayError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Grace period for a cancelled operation to observe the signal and
/// report its final state.
const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Race an operation against a deadline.
///
/// The operation receives a fresh [`CancellationToken`]; it must select on
/// the token so the underlying network call aborts when the deadline
/// fires. The timer wins a tie at the exact deadline instant, so the
/// result is always classified as a timeout; a straggler success arriving
/// within the grace window is still delivered as a success.
pub async fn run_with_timeout<T, F, Fut>(max_wait: Duration, op: F) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let token = CancellationToken::new();
    let started = Instant::now();
    let fut = op(token.clone());
    tokio::pin!(fut);

    tokio::select! {
        biased;
        () = tokio::time::sleep(max_wait) => {
            token.cancel();
            warn!(waited_ms = max_wait.as_millis() as u64, "deadline elapsed, cancelling in-flight call");

            // Grace window: the operation observes the signal and reports
            // the last error it encountered (or a straggler success).
            match tokio::time::timeout(CANCEL_GRACE, &mut fut).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(RelayError::Cancelled)) => Err(timeout_error(started, None)),
                Ok(Err(error)) => Err(timeout_error(started, Some(Box::new(error)))),
                Err(_) => Err(timeout_error(started, None)),
            }
        }
        result = &mut fut => result,
    }
}

fn timeout_error(started: Instant, last_error: Option<Box<RelayError>>) -> RelayError {
    RelayError::Timeout {
        waited: started.elapsed(),
        last_error,
    }
}
