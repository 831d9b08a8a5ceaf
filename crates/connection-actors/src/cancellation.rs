//! Cancellation utilities for interruptible receiver operations
//!
//! Provides helpers for racing futures against cancellation flags,
//! enabling responsive operation interruption.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Completes once `flag` is set, checking it every `poll_interval`.
pub async fn wait_for_cancel(flag: Arc<AtomicBool>, poll_interval: Duration) {
    loop {
        if flag.load(Ordering::Acquire) {
            break;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Races a future against cancellation, returns None if cancelled
///
/// The losing future is dropped, so `fut` must be cancel safe.
///
/// # Example
/// ```ignore
/// let result = race_with_cancellation(
///     framer.read_frame(),
///     cancel_flag.clone(),
///     Duration::from_millis(50),
/// ).await;
///
/// match result {
///     Some(Ok(frame)) => println!("Got {} bytes", frame.len()),
///     Some(Err(e)) => println!("Error: {}", e),
///     None => println!("Cancelled by user"),
/// }
/// ```
pub async fn race_with_cancellation<T, F>(
    fut: F,
    cancel_flag: Arc<AtomicBool>,
    poll_interval: Duration,
) -> Option<T>
where
    F: Future<Output = T>,
{
    use futures::future::{select, Either};

    let cancel_fut = wait_for_cancel(cancel_flag, poll_interval);

    match select(Box::pin(fut), Box::pin(cancel_fut)).await {
        Either::Left((result, _)) => Some(result),
        Either::Right(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_cancel_completes_when_flag_set() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        let handle = tokio::spawn(async move {
            wait_for_cancel(flag_clone, Duration::from_millis(10)).await;
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        flag.store(true, Ordering::Release);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_race_returns_none_when_cancelled() {
        let flag = Arc::new(AtomicBool::new(true));

        let result = race_with_cancellation(
            tokio::time::sleep(Duration::from_secs(10)),
            flag,
            Duration::from_millis(10),
        )
        .await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_race_returns_result_when_not_cancelled() {
        let flag = Arc::new(AtomicBool::new(false));
        let result = race_with_cancellation(async { 42 }, flag, Duration::from_millis(10)).await;
        assert_eq!(result, Some(42));
    }
}
