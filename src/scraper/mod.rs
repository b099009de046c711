mod lifecycle;
mod login;
mod matcher;
mod orchestrator;
mod progress;

pub use lifecycle::{BrowserSession, BrowserSource, CleanupStack, Disposable};
pub use login::{login_with_options, page_hook, LoginField, LoginOptions, PageHook, Submit};
pub use matcher::{LoginOutcome, LoginPredicate, Matcher, PossibleLoginResults, PredicateInput};
pub use orchestrator::Scraper;
pub use progress::{ProgressEmitter, ProgressEvent, ProgressType};

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use crate::browser::Page;
use crate::clock::Clock;
use crate::companies::CompanyType;
use crate::config::ScraperOptions;
use crate::credentials::Credentials;
use crate::error::ScraperError;
use crate::models::ScrapingResult;
use crate::months::{all_months, Month};
use crate::navigation::navigate_to;

/// What an adapter sees while logging in and fetching.
pub struct ScrapeContext<'a> {
    page: Option<Arc<dyn Page>>,
    options: &'a ScraperOptions,
    clock: &'a dyn Clock,
}

impl<'a> ScrapeContext<'a> {
    pub fn new(page: Option<Arc<dyn Page>>, options: &'a ScraperOptions, clock: &'a dyn Clock) -> Self {
        Self { page, options, clock }
    }

    /// The scraping page. Fails for adapters that run without a browser.
    pub fn page(&self) -> Result<&Arc<dyn Page>> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::NoPage("adapter runs without a browser".into()).into())
    }

    pub fn options(&self) -> &ScraperOptions {
        self.options
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock
    }

    pub fn start_date(&self) -> NaiveDate {
        self.options.effective_start_date(self.clock)
    }

    /// Start of the requested window as an instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.options.start_instant(self.clock)
    }

    /// Month windows from the start date through the configured future months.
    pub fn months(&self) -> Vec<Month> {
        all_months(
            self.start_date(),
            self.options.future_months_to_scrape,
            self.clock,
        )
    }

    /// Navigate the scraping page with the configured retry count.
    pub async fn navigate_to(&self, url: &str) -> Result<()> {
        let page = self.page()?;
        navigate_to(
            page.as_ref(),
            url,
            Default::default(),
            self.options.navigation_retry_count,
        )
        .await
    }
}

/// Institution-specific scraping strategy.
///
/// Browser adapters usually only describe their login form through
/// [`login_options`](Self::login_options) and implement
/// [`fetch_data`](Self::fetch_data). API-only adapters return `false` from
/// [`needs_browser`](Self::needs_browser) and override [`login`](Self::login).
#[async_trait::async_trait]
pub trait ScraperAdapter: Send + Sync {
    fn company(&self) -> CompanyType;

    fn needs_browser(&self) -> bool {
        true
    }

    fn login_options(&self, _credentials: &Credentials) -> Result<LoginOptions> {
        anyhow::bail!(
            "{} does not describe a login form and must override login",
            self.company()
        )
    }

    async fn login(&mut self, ctx: &ScrapeContext<'_>, credentials: &Credentials) -> Result<LoginOutcome> {
        let options = self.login_options(credentials)?;
        login_with_options(ctx, options).await
    }

    async fn fetch_data(&mut self, ctx: &ScrapeContext<'_>) -> Result<ScrapingResult>;
}
