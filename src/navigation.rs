//! Page navigation with status validation, bounded retry and URL waits.

use std::time::Duration;

use anyhow::Result;
use regex::Regex;

use crate::browser::{Navigation, Page, WaitUntil};
use crate::error::ScraperError;
use crate::waiting::wait_until;

const URL_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Navigate to `url`, checking that the navigation is structurally valid.
///
/// A same-document navigation counts as success. A request without a response
/// is fatal. Non-2xx responses are retried immediately, up to `retries` times.
pub async fn navigate_to(
    page: &dyn Page,
    url: &str,
    wait_until: WaitUntil,
    retries: u32,
) -> Result<()> {
    let mut remaining = retries;
    loop {
        match page.goto(url, wait_until).await? {
            Navigation::SameDocument => return Ok(()),
            Navigation::NoResponse => {
                return Err(ScraperError::NavigationMissingResponse {
                    url: url.to_string(),
                }
                .into())
            }
            Navigation::Response { status } if (200..300).contains(&status) => return Ok(()),
            Navigation::Response { status } => {
                if remaining == 0 {
                    return Err(ScraperError::NavigationStatus {
                        url: url.to_string(),
                        status,
                    }
                    .into());
                }
                remaining -= 1;
                tracing::debug!(
                    url,
                    status,
                    retries_left = remaining,
                    "navigation failed, retrying"
                );
            }
        }
    }
}

/// Current page URL. With `client_side`, read `window.location.href` from
/// inside the page, which is what the user actually sees when a proxy or
/// in-page router rewrote the outer URL.
pub async fn current_url(page: &dyn Page, client_side: bool) -> Result<String> {
    if client_side {
        let href = page.evaluate("window.location.href").await?;
        return match href {
            serde_json::Value::String(href) => Ok(href),
            other => anyhow::bail!("window.location.href was not a string: {other}"),
        };
    }
    page.url().await
}

pub async fn wait_for_navigation(page: &dyn Page, wait_until: WaitUntil) -> Result<()> {
    page.wait_for_navigation(wait_until).await
}

/// Wait until the URL differs from its current value and is not in `ignore`.
pub async fn wait_for_redirect(
    page: &dyn Page,
    timeout: Duration,
    client_side: bool,
    ignore: &[&str],
) -> Result<()> {
    let initial = current_url(page, client_side).await?;
    let initial_ref = initial.as_str();
    wait_until(
        move || async move {
            let current = current_url(page, client_side).await?;
            let redirected = current != initial_ref && !ignore.contains(&current.as_str());
            Ok::<_, anyhow::Error>(redirected.then_some(()))
        },
        &format!("waiting for redirect from {initial}"),
        timeout,
        URL_POLL_INTERVAL,
    )
    .await
}

/// Target URL for [`wait_for_url`].
#[derive(Debug, Clone)]
pub enum UrlMatch {
    Exact(String),
    Pattern(Regex),
}

impl UrlMatch {
    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatch::Exact(expected) => expected == url,
            UrlMatch::Pattern(re) => re.is_match(url),
        }
    }
}

impl std::fmt::Display for UrlMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlMatch::Exact(url) => f.write_str(url),
            UrlMatch::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

pub async fn wait_for_url(
    page: &dyn Page,
    target: &UrlMatch,
    timeout: Duration,
    client_side: bool,
) -> Result<()> {
    wait_until(
        move || async move {
            let current = current_url(page, client_side).await?;
            Ok::<_, anyhow::Error>(target.matches(&current).then_some(()))
        },
        &format!("waiting for url to be {target}"),
        timeout,
        URL_POLL_INTERVAL,
    )
    .await
}
