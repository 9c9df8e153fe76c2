use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::BackoffPolicy;
use crate::CoordinationError;

/// Runs `task` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are exhausted.
///
/// Every attempt is bounded by `timeout_duration`; an elapsed attempt counts
/// as a retryable [`CoordinationError::Timeout`]. Between attempts the delay
/// doubles from `base_delay_ms` up to `max_delay_ms`. The last error is
/// returned once `max_retries` retries have failed.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    mut task: F,
    policy: BackoffPolicy,
    timeout_duration: Duration,
) -> std::result::Result<P, CoordinationError>
where
    F: FnMut() -> T,
    T: Future<Output = std::result::Result<P, CoordinationError>>,
{
    let attempts = policy.max_retries + 1;
    let mut retry = 0;
    loop {
        debug!("Attempt {} of {}", retry + 1, attempts);
        let error = match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => {
                warn!("failed with retryable error: {}", e);
                e
            }
            Err(_elapsed) => {
                warn!("Task timed out after {:?}", timeout_duration);
                CoordinationError::Timeout(timeout_duration)
            }
        };

        if retry >= policy.max_retries {
            warn!("Task failed after {} retries", retry);
            return Err(error);
        }

        let delay = policy.delay_for(retry);
        debug!("Retrying in {:?}...", delay);
        sleep(delay).await;
        retry += 1;
    }
}
