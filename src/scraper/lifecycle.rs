//! Browser/page acquisition and ordered teardown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::browser::{Browser, Page};
use crate::config::ScraperOptions;
use crate::error::{is_target_closed, ScraperError};

/// Something torn down when the scrape ends.
#[async_trait]
pub trait Disposable: Send + Sync {
    fn label(&self) -> &str;

    async fn dispose(&self) -> Result<()>;
}

struct ClosePage(Arc<dyn Page>);

#[async_trait]
impl Disposable for ClosePage {
    fn label(&self) -> &str {
        "close page"
    }

    async fn dispose(&self) -> Result<()> {
        self.0.close().await
    }
}

struct CloseBrowser(Arc<dyn Browser>);

#[async_trait]
impl Disposable for CloseBrowser {
    fn label(&self) -> &str {
        "close browser"
    }

    async fn dispose(&self) -> Result<()> {
        self.0.close().await
    }
}

/// LIFO stack of cleanup actions.
#[derive(Default)]
pub struct CleanupStack {
    entries: Vec<Box<dyn Disposable>>,
    drained: bool,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Box<dyn Disposable>) -> Result<()> {
        if self.drained {
            anyhow::bail!("cleanup registered after teardown: {}", entry.label());
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every entry, most recently registered first.
    ///
    /// A "target closed" failure means the resource is already gone and is
    /// ignored. Every entry runs even if an earlier one failed; the first
    /// other failure is returned. Draining twice is a no-op.
    pub async fn drain(&mut self) -> Result<()> {
        if self.drained {
            return Ok(());
        }
        self.drained = true;

        let mut first_error: Option<anyhow::Error> = None;
        while let Some(entry) = self.entries.pop() {
            let label = entry.label().to_string();
            tracing::debug!(cleanup = %label, "running cleanup");
            match entry.dispose().await {
                Ok(()) => {}
                Err(err) if is_target_closed(&err) => {
                    tracing::debug!(cleanup = %label, "target already closed");
                }
                Err(err) => {
                    tracing::warn!(cleanup = %label, error = %format!("{err:#}"), "cleanup failed");
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("cleanup '{label}' failed")));
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Where the scrape gets its browser from.
#[derive(Clone, Default)]
pub enum BrowserSource {
    /// Launch a local Chromium with [`ScraperOptions::browser`]. The browser
    /// is closed at the end of the scrape.
    #[default]
    Launch,
    /// A caller-owned browser. Closed at the end unless
    /// `browser.skip_close_browser` is set.
    Browser(Arc<dyn Browser>),
    /// A caller-owned browser context. Only the page is closed.
    Context(Arc<dyn Browser>),
}

impl std::fmt::Debug for BrowserSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BrowserSource::Launch => "Launch",
            BrowserSource::Browser(_) => "Browser(..)",
            BrowserSource::Context(_) => "Context(..)",
        };
        f.write_str(s)
    }
}

#[cfg(feature = "browser")]
async fn launch_browser(options: &ScraperOptions) -> Result<Arc<dyn Browser>> {
    use crate::browser::chromium::{ChromiumBrowser, LaunchOptions};

    let launch = LaunchOptions::from(&options.browser);
    tracing::debug!(
        headless = !launch.show_browser,
        args = ?launch.args,
        "launching chromium"
    );
    let browser = ChromiumBrowser::launch(&launch).await?;
    Ok(Arc::new(browser))
}

#[cfg(not(feature = "browser"))]
async fn launch_browser(_options: &ScraperOptions) -> Result<Arc<dyn Browser>> {
    anyhow::bail!("built without the `browser` feature; supply a browser instead")
}

/// The page a scrape runs on, plus everything that must be torn down.
pub struct BrowserSession {
    page: Option<Arc<dyn Page>>,
    cleanups: CleanupStack,
    screenshot_path: Option<PathBuf>,
}

impl BrowserSession {
    pub fn new(screenshot_path: Option<PathBuf>) -> Self {
        Self {
            page: None,
            cleanups: CleanupStack::new(),
            screenshot_path,
        }
    }

    /// Acquire a browser and page from `source` and apply page settings.
    ///
    /// Cleanups are registered as each resource is acquired, so a failure
    /// partway through still tears down what was opened.
    pub async fn initialize(&mut self, source: &BrowserSource, options: &ScraperOptions) -> Result<()> {
        let browser = match source {
            BrowserSource::Launch => {
                let browser = launch_browser(options).await?;
                self.cleanups.push(Box::new(CloseBrowser(browser.clone())))?;
                browser
            }
            BrowserSource::Browser(browser) => {
                if options.browser.skip_close_browser {
                    tracing::debug!("leaving caller browser open after scrape");
                } else {
                    self.cleanups.push(Box::new(CloseBrowser(browser.clone())))?;
                }
                browser.clone()
            }
            BrowserSource::Context(context) => context.clone(),
        };

        let page = browser.new_page().await.context("Failed to open page")?;
        self.cleanups.push(Box::new(ClosePage(page.clone())))?;

        page.set_default_timeout(options.default_timeout);
        if let Some(viewport) = options.browser.viewport {
            tracing::debug!(width = viewport.width, height = viewport.height, "setting viewport");
            page.set_viewport(viewport).await?;
        }
        if let Some(user_agent) = &options.browser.user_agent {
            page.set_user_agent(user_agent).await?;
        }

        self.page = Some(page);
        Ok(())
    }

    pub fn page(&self) -> Option<&Arc<dyn Page>> {
        self.page.as_ref()
    }

    pub fn require_page(&self) -> Result<&Arc<dyn Page>> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::NoPage("browser session was not initialized".into()).into())
    }

    /// Register an extra teardown action, run before the page closes.
    pub fn push_cleanup(&mut self, entry: Box<dyn Disposable>) -> Result<()> {
        self.cleanups.push(entry)
    }

    /// Screenshot on failure when configured, then run all cleanups.
    pub async fn terminate(&mut self, success: bool) -> Result<()> {
        if !success {
            if let (Some(path), Some(page)) = (&self.screenshot_path, &self.page) {
                tracing::info!(path = %path.display(), "saving failure screenshot");
                if let Err(err) = page.screenshot(path, true).await {
                    tracing::warn!(error = %format!("{err:#}"), "failed to save failure screenshot");
                }
            }
        }
        self.cleanups.drain().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        label: String,
        log: Arc<Mutex<Vec<String>>>,
        result: fn() -> Result<()>,
    }

    #[async_trait]
    impl Disposable for Recorder {
        fn label(&self) -> &str {
            &self.label
        }

        async fn dispose(&self) -> Result<()> {
            self.log.lock().unwrap().push(self.label.clone());
            (self.result)()
        }
    }

    fn recorder(label: &str, log: &Arc<Mutex<Vec<String>>>, result: fn() -> Result<()>) -> Box<dyn Disposable> {
        Box::new(Recorder {
            label: label.to_string(),
            log: log.clone(),
            result,
        })
    }

    #[tokio::test]
    async fn drains_in_reverse_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        for label in ["A", "B", "C"] {
            stack.push(recorder(label, &log, || Ok(()))).unwrap();
        }
        stack.drain().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn target_closed_is_tolerated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        stack.push(recorder("A", &log, || Ok(()))).unwrap();
        stack
            .push(recorder("B", &log, || Err(ScraperError::TargetClosed.into())))
            .unwrap();
        stack.drain().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn other_failures_surface_after_everything_ran() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        stack.push(recorder("A", &log, || Ok(()))).unwrap();
        stack
            .push(recorder("B", &log, || Err(anyhow::anyhow!("browser crashed"))))
            .unwrap();
        let err = stack.drain().await.unwrap_err();
        assert!(format!("{err:#}").contains("browser crashed"));
        assert_eq!(*log.lock().unwrap(), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn second_drain_is_a_noop_and_late_push_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        stack.push(recorder("A", &log, || Ok(()))).unwrap();
        stack.drain().await.unwrap();
        stack.drain().await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(stack.push(recorder("B", &log, || Ok(()))).is_err());
    }
}
