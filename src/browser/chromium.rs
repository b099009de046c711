//! Chromium backend over the Chrome DevTools Protocol.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{Browser, Navigation, Page, Viewport, WaitUntil};
use crate::config::BrowserOptions;
use crate::error::ScraperError;
use crate::waiting::wait_until;

/// How to start a local Chromium.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub show_browser: bool,
    pub executable_path: Option<PathBuf>,
    pub args: Vec<String>,
    /// Per-request CDP timeout.
    pub timeout: Option<Duration>,
}

impl From<&BrowserOptions> for LaunchOptions {
    fn from(options: &BrowserOptions) -> Self {
        Self {
            show_browser: options.show_browser,
            executable_path: options.executable_path.clone(),
            args: options.args.clone(),
            timeout: options.launch_timeout,
        }
    }
}

pub struct ChromiumBrowser {
    browser: Mutex<CdpBrowser>,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let chrome_path = match &options.executable_path {
            Some(path) => path.clone(),
            None => find_chrome()
                .map(PathBuf::from)
                .context("Chrome/Chromium not found. Install Chrome or set executable_path.")?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .viewport(None)
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if options.show_browser {
            builder = builder.with_head();
        }
        if let Some(timeout) = options.timeout {
            builder = builder.request_timeout(timeout);
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .context("Failed to launch browser")?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        tracing::debug!(headless = !options.show_browser, "launched chromium");
        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
        })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_page(&self) -> Result<Arc<dyn Page>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;
        Ok(Arc::new(ChromiumPage::new(page)))
    }

    async fn close(&self) -> Result<()> {
        let result = self.browser.lock().await.close().await;
        self.handler_task.abort();
        result.map(|_| ()).map_err(map_cdp_error)
    }
}

pub struct ChromiumPage {
    page: chromiumoxide::Page,
    default_timeout_ms: AtomicU64,
}

impl ChromiumPage {
    pub fn new(page: chromiumoxide::Page) -> Self {
        Self {
            page,
            default_timeout_ms: AtomicU64::new(30_000),
        }
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms.load(Ordering::Relaxed))
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>> + Send,
    {
        match tokio::time::timeout(self.default_timeout(), fut).await {
            Ok(result) => result.map_err(map_cdp_error),
            Err(_) => Err(ScraperError::Timeout(what.to_string()).into()),
        }
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str, wait_until: WaitUntil) -> Result<Navigation> {
        // CDP navigation resolves on the load lifecycle; stricter events are
        // approximated by waiting for the navigation response afterwards.
        // The status is best effort: it comes from the last navigation the
        // frame manager tracked, which a redirect or a client-side
        // navigation right after load can replace.
        tracing::trace!(url, ?wait_until, "goto");
        self.bounded(&format!("navigating to {url}"), self.page.goto(url))
            .await?;
        let request = self
            .bounded(
                &format!("waiting for response from {url}"),
                self.page.wait_for_navigation_response(),
            )
            .await?;
        Ok(match request {
            None => Navigation::SameDocument,
            Some(request) => match &request.response {
                Some(response) => Navigation::Response {
                    status: u16::try_from(response.status).unwrap_or(0),
                },
                None => Navigation::NoResponse,
            },
        })
    }

    async fn wait_for_navigation(&self, _wait_until: WaitUntil) -> Result<()> {
        self.bounded("waiting for navigation", self.page.wait_for_navigation())
            .await?;
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        let url = self.bounded("reading page url", self.page.url()).await?;
        Ok(url.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build evaluate params: {e}"))?;
        let result = self
            .bounded("evaluating script", self.page.evaluate_expression(params))
            .await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .bounded(
                &format!("finding {selector}"),
                self.page.find_element(selector),
            )
            .await?;
        element.click().await.map_err(map_cdp_error)?;
        element.type_str(text).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .bounded(
                &format!("finding {selector}"),
                self.page.find_element(selector),
            )
            .await?;
        element.click().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn select(&self, selector: &str, value: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.value = {val}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            sel = serde_json::to_string(selector)?,
            val = serde_json::to_string(value)?,
        );
        if self.evaluate(&script).await? != serde_json::Value::Bool(true) {
            anyhow::bail!("select element not found: {selector}");
        }
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        let script = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        visible: bool,
        timeout: Duration,
    ) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             if (!{visible}) return true; const style = window.getComputedStyle(el); \
             return style.visibility !== 'hidden' && style.display !== 'none' && el.getClientRects().length > 0; }})()",
            sel = serde_json::to_string(selector)?,
        );
        let script = script.as_str();
        wait_until(
            move || async move {
                let found = self.evaluate(script).await?.as_bool().unwrap_or(false);
                Ok::<_, anyhow::Error>(found.then_some(()))
            },
            &format!("waiting for element {selector}"),
            timeout,
            Duration::from_millis(100),
        )
        .await
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        let params = ScreenshotParams::builder().full_page(full_page).build();
        self.bounded("capturing screenshot", self.page.save_screenshot(params, path))
            .await?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.bounded(
            "setting user agent",
            self.page
                .execute(SetUserAgentOverrideParams::new(user_agent.to_string())),
        )
        .await?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.bounded(
            "setting viewport",
            self.page.execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                1.0,
                false,
            )),
        )
        .await?;
        Ok(())
    }

    fn set_default_timeout(&self, timeout: Duration) {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.default_timeout_ms.store(millis, Ordering::Relaxed);
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await.map_err(map_cdp_error)
    }
}

/// Translate "the target is already gone" into [`ScraperError::TargetClosed`].
fn map_cdp_error(err: chromiumoxide::error::CdpError) -> anyhow::Error {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("target closed")
        || lowered.contains("no target with given id")
        || lowered.contains("channel closed")
    {
        return ScraperError::TargetClosed.into();
    }
    anyhow::Error::new(err)
}

/// Find Chrome/Chromium executable.
fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    candidates
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(str::to_string)
}
