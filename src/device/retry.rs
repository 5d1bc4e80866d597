use crate::error::DeviceError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Poll `lookup` until it yields a value, at most `max_attempts` times.
///
/// Sleeps `interval` between attempts. Whether a timeout is fatal is up to
/// the caller.
pub async fn resolve_with_retry<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    interval: Duration,
    mut lookup: F,
) -> Result<T, DeviceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(found) = lookup().await {
            if attempt > 1 {
                debug!("{} resolved after {} attempts", what, attempt);
            }
            return Ok(found);
        }

        if attempt < max_attempts {
            debug!(
                "{} not available yet (attempt {}/{}), retrying in {:?}",
                what, attempt, max_attempts, interval
            );
            sleep(interval).await;
        }
    }

    Err(DeviceError::ResolveTimeout {
        what: what.to_string(),
        attempts: max_attempts,
    })
}
