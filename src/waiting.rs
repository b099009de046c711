//! Polling and timeout primitives every browser step is built on.
//!
//! Timeouts drop the future they race against. Work the browser already
//! accepted (an in-flight evaluation, a navigation) may still complete after
//! the caller has moved on.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::error::ScraperError;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poll `test` until it yields `Some`, failing with
/// [`ScraperError::Timeout`] carrying `description` after `timeout`.
///
/// `Ok(None)` means "not yet": sleep `interval` and try again. An `Err` from
/// `test` is returned immediately without retrying.
pub async fn wait_until<T, F, Fut>(
    mut test: F,
    description: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let poll = async {
        loop {
            if let Some(value) = test().await? {
                return Ok::<T, anyhow::Error>(value);
            }
            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(ScraperError::Timeout(description.to_string()).into()),
    }
}

/// Run `fut` for at most `duration`. Only the timeout is swallowed
/// (`Ok(None)`); errors from `fut` are returned.
pub async fn race_timeout<T, Fut>(duration: Duration, fut: Fut) -> Result<Option<T>>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result.map(Some),
        Err(_) => {
            tracing::debug!(?duration, "race_timeout elapsed");
            Ok(None)
        }
    }
}

pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Run async actions one at a time, in order, collecting their results.
pub async fn run_serial<T, I, F, Fut>(actions: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut results = Vec::new();
    for action in actions {
        results.push(action().await?);
    }
    Ok(results)
}
