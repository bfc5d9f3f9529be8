//! Bounded retry with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::types::RagError;

/// Run `op`, retrying up to `retries` additional times when it fails with a
/// transient error (see [`RagError::is_transient`]).
///
/// Backoff doubles from `base_delay` per attempt with a small random jitter.
/// Fatal errors and exhausted retries return the last error unchanged, so
/// callers (and ultimately the job record) carry the final failure reason.
pub(crate) async fn retry_transient<T, F, Fut>(
    retries: usize,
    base_delay: Duration,
    mut op: F,
) -> Result<T, RagError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RagError>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                let backoff = base_delay * 2u32.saturating_pow(attempt as u32 - 1);
                let jitter = Duration::from_millis(rand::rng().random_range(0..=50));
                warn!(
                    attempt,
                    max = retries,
                    delay_ms = (backoff + jitter).as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                sleep(backoff + jitter).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transient() -> RagError {
        RagError::StoreUnavailable {
            backend: "test",
            message: "down".to_string(),
        }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = retry_transient(3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
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
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_transient(5, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RagError::Configuration("bad".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(RagError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = retry_transient(2, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert!(matches!(result, Err(RagError::StoreUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
