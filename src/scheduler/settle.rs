//! Bounded polling for asynchronous executor effects

use crate::config::PollSettings;
use crate::error::Result;
use std::future::Future;
use tokio::time::sleep;
use tracing::debug;

/// Sleep one interval, probe, and repeat until the probe yields a value or the attempts run
/// out. Probe errors end the wait immediately.
pub async fn poll_until<T, F, Fut>(
    settings: PollSettings,
    what: &str,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let attempts = settings.max_attempts();
    for attempt in 1..=attempts {
        sleep(settings.interval).await;
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        debug!("⏳ Waiting for {} ({}/{})", what, attempt, attempts);
    }
    Ok(None)
}
