//! Bounded waits over host state.
//!
//! Host re-renders are not reliably observable through DOM mutations
//! alone, so every wait is a bounded poll: check, sleep, re-check, give
//! up at the deadline. Indefinite blocking is disallowed by design.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Sleep for `ms` milliseconds.
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Poll `probe` until it returns `true` or `timeout_ms` elapses.
///
/// The predicate runs immediately, then every `interval_ms`. Returns
/// whether the condition was met in time.
pub async fn wait_until<F, Fut>(timeout_ms: u64, interval_ms: u64, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() + Duration::from_millis(interval_ms) > deadline {
            return false;
        }
        sleep_ms(interval_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_immediate_success() {
        assert!(wait_until(100, 10, || async { true }).await);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let ok = wait_until(1_000, 5, move || {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) >= 3 }
        })
        .await;
        assert!(ok);
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_timeout() {
        let start = std::time::Instant::now();
        let ok = wait_until(50, 10, || async { false }).await;
        assert!(!ok);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
