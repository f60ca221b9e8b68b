//! Fixed-interval retry for transient filesystem failures.

use std::future::Future;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

/// Run `action` up to `attempts` times, sleeping `delay` between attempts.
///
/// Returns the first success, or the error of the final attempt.
pub async fn retry_fixed<T, E, F, Fut>(attempts: usize, delay: Duration, mut action: F) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let strategy = FixedInterval::new(delay).take(attempts.saturating_sub(1));
    let mut attempt = 0usize;

    Retry::spawn(strategy, || {
        attempt += 1;
        let current = attempt;
        let fut = action(current);
        async move {
            let result = fut.await;
            if result.is_err() {
                tracing::debug!(target: "retry", attempt = current, "Attempt failed");
            }
            result
        }
    })
    .await
}
