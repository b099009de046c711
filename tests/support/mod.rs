#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use israeli_bank_scrapers::browser::{Browser, Navigation, Page, Viewport, WaitUntil};
use israeli_bank_scrapers::companies::CompanyType;
use israeli_bank_scrapers::credentials::Credentials;
use israeli_bank_scrapers::error::ScraperError;
use israeli_bank_scrapers::models::{ScrapingResult, TransactionsAccount};
use israeli_bank_scrapers::scraper::{LoginOutcome, ScrapeContext, ScraperAdapter};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// How a mock resource behaves when closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseBehavior {
    #[default]
    Ok,
    TargetClosed,
    Fail,
}

fn close_result(behavior: CloseBehavior, what: &str) -> Result<()> {
    match behavior {
        CloseBehavior::Ok => Ok(()),
        CloseBehavior::TargetClosed => Err(ScraperError::TargetClosed.into()),
        CloseBehavior::Fail => Err(anyhow::anyhow!("{what} refused to close")),
    }
}

/// Scripted in-memory page. Records every call into a shared log.
pub struct MockPage {
    log: CallLog,
    url: Mutex<String>,
    goto_results: Mutex<VecDeque<Navigation>>,
    url_after_submit: Mutex<Option<String>>,
    present: Mutex<Vec<String>>,
    close: CloseBehavior,
    pub screenshots: Mutex<Vec<PathBuf>>,
}

impl MockPage {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            url: Mutex::new("about:blank".to_string()),
            goto_results: Mutex::new(VecDeque::new()),
            url_after_submit: Mutex::new(None),
            present: Mutex::new(Vec::new()),
            close: CloseBehavior::Ok,
            screenshots: Mutex::new(Vec::new()),
        }
    }

    /// Results for successive `goto` calls; once exhausted every call is a 200.
    pub fn with_goto_results(self, results: Vec<Navigation>) -> Self {
        *self.goto_results.lock().unwrap() = results.into();
        self
    }

    /// URL the page lands on after the login form is submitted.
    pub fn with_url_after_submit(self, url: &str) -> Self {
        *self.url_after_submit.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn with_elements(self, selectors: &[&str]) -> Self {
        *self.present.lock().unwrap() = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_close(mut self, close: CloseBehavior) -> Self {
        self.close = close;
        self
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn submitted(&self) {
        if let Some(url) = self.url_after_submit.lock().unwrap().clone() {
            *self.url.lock().unwrap() = url;
        }
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str, _wait_until: WaitUntil) -> Result<Navigation> {
        self.record(format!("goto {url}"));
        let result = self
            .goto_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Navigation::Response { status: 200 });
        *self.url.lock().unwrap() = url.to_string();
        Ok(result)
    }

    async fn wait_for_navigation(&self, _wait_until: WaitUntil) -> Result<()> {
        self.record("wait_for_navigation".to_string());
        Ok(())
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        if script == "window.location.href" {
            return Ok(serde_json::Value::String(self.url.lock().unwrap().clone()));
        }
        // Input clearing before typing.
        if script.contains("el.value = ''") {
            return Ok(serde_json::Value::Bool(true));
        }
        Ok(serde_json::Value::Null)
    }

    async fn type_text(&self, selector: &str, _text: &str) -> Result<()> {
        self.record(format!("type {selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click {selector}"));
        self.submitted();
        Ok(())
    }

    async fn select(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select {selector}={value}"));
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool> {
        Ok(self.present.lock().unwrap().iter().any(|s| s == selector))
    }

    async fn wait_for_selector(&self, selector: &str, _visible: bool, _timeout: Duration) -> Result<()> {
        self.record(format!("wait_for_selector {selector}"));
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<()> {
        self.record("screenshot".to_string());
        self.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.record(format!("user_agent {user_agent}"));
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.record(format!("viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_default_timeout(&self, timeout: Duration) {
        self.record(format!("default_timeout {}ms", timeout.as_millis()));
    }

    async fn close(&self) -> Result<()> {
        self.record("page.close".to_string());
        close_result(self.close, "page")
    }
}

/// Hands out a single shared [`MockPage`].
pub struct MockBrowser {
    log: CallLog,
    page: Arc<MockPage>,
    close: CloseBehavior,
    page_fails: bool,
}

impl MockBrowser {
    pub fn new(log: &CallLog, page: Arc<MockPage>) -> Self {
        Self {
            log: log.clone(),
            page,
            close: CloseBehavior::Ok,
            page_fails: false,
        }
    }

    pub fn with_close(mut self, close: CloseBehavior) -> Self {
        self.close = close;
        self
    }

    /// Every `new_page` call fails.
    pub fn with_failing_pages(mut self) -> Self {
        self.page_fails = true;
        self
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn new_page(&self) -> Result<Arc<dyn Page>> {
        self.log.lock().unwrap().push("new_page".to_string());
        if self.page_fails {
            anyhow::bail!("target crashed while opening a tab");
        }
        Ok(self.page.clone())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().push("browser.close".to_string());
        close_result(self.close, "browser")
    }
}

/// What [`MockAdapter::login`] does.
#[derive(Debug, Clone)]
pub enum LoginBehavior {
    Outcome(LoginOutcome),
    TimesOut,
    Fails(String),
}

/// What [`MockAdapter::fetch_data`] does.
#[derive(Debug, Clone, Default)]
pub enum FetchBehavior {
    /// Return the adapter's accounts.
    #[default]
    Accounts,
    TimesOut,
    Fails(String),
}

/// Adapter with a scripted login and a fixed set of accounts.
pub struct MockAdapter {
    pub company: CompanyType,
    pub needs_browser: bool,
    pub login: LoginBehavior,
    pub fetch: FetchBehavior,
    pub accounts: Vec<TransactionsAccount>,
    pub log: CallLog,
}

impl MockAdapter {
    pub fn new(log: &CallLog) -> Self {
        Self {
            company: CompanyType::Hapoalim,
            needs_browser: true,
            login: LoginBehavior::Outcome(LoginOutcome::Success),
            fetch: FetchBehavior::default(),
            accounts: Vec::new(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl ScraperAdapter for MockAdapter {
    fn company(&self) -> CompanyType {
        self.company
    }

    fn needs_browser(&self) -> bool {
        self.needs_browser
    }

    async fn login(&mut self, ctx: &ScrapeContext<'_>, _credentials: &Credentials) -> Result<LoginOutcome> {
        self.log.lock().unwrap().push("adapter.login".to_string());
        if self.needs_browser {
            ctx.page()?;
        }
        match &self.login {
            LoginBehavior::Outcome(outcome) => Ok(*outcome),
            LoginBehavior::TimesOut => {
                Err(ScraperError::Timeout("waiting for dashboard".to_string()).into())
            }
            LoginBehavior::Fails(message) => Err(anyhow::anyhow!("{message}")),
        }
    }

    async fn fetch_data(&mut self, _ctx: &ScrapeContext<'_>) -> Result<ScrapingResult> {
        self.log.lock().unwrap().push("adapter.fetch_data".to_string());
        match &self.fetch {
            FetchBehavior::Accounts => Ok(ScrapingResult::success(self.accounts.clone())),
            FetchBehavior::TimesOut => {
                Err(ScraperError::Timeout("waiting for transactions".to_string()).into())
            }
            FetchBehavior::Fails(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

pub fn hapoalim_credentials() -> Credentials {
    Credentials::new()
        .with_field("userCode", "AB1234")
        .with_field("password", "hunter2")
}
