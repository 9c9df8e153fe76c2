use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::CoordinationError;

fn policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 100,
        base_delay_ms: 1000,
        max_delay_ms: 3000,
    }
}

#[tokio::test(start_paused = true)]
async fn test_task_with_exponential_backoff_returns_first_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result = task_with_timeout_and_exponential_backoff(
        || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CoordinationError>(7)
            }
        },
        policy(3),
        Duration::from_millis(100),
    )
    .await;

    assert_eq!(result, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_task_with_exponential_backoff_retries_connection_loss() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result = task_with_timeout_and_exponential_backoff(
        || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CoordinationError::ConnectionLoss("zk".into()))
                } else {
                    Ok("done")
                }
            }
        },
        policy(3),
        Duration::from_millis(100),
    )
    .await;

    assert_eq!(result, Ok("done"));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_task_with_exponential_backoff_gives_up_after_max_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let started = tokio::time::Instant::now();

    let result: Result<(), _> = task_with_timeout_and_exponential_backoff(
        || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CoordinationError::ConnectionLoss("zk".into()))
            }
        },
        policy(3),
        Duration::from_millis(100),
    )
    .await;

    assert!(matches!(result, Err(CoordinationError::ConnectionLoss(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    // 1s + 2s + 3s (capped)
    assert!(started.elapsed() >= Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_task_with_exponential_backoff_does_not_retry_business_errors() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: Result<(), _> = task_with_timeout_and_exponential_backoff(
        || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CoordinationError::NodeExists("/a".into()))
            }
        },
        policy(3),
        Duration::from_millis(100),
    )
    .await;

    assert_eq!(result, Err(CoordinationError::NodeExists("/a".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_task_with_exponential_backoff_times_out_slow_attempts() {
    let result: Result<(), _> = task_with_timeout_and_exponential_backoff(
        || async {
            sleep(Duration::from_secs(10)).await;
            Ok(())
        },
        policy(1),
        Duration::from_millis(100),
    )
    .await;

    assert_eq!(
        result,
        Err(CoordinationError::Timeout(Duration::from_millis(100)))
    );
}
