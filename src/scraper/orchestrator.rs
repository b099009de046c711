//! Drives one scrape: initialize, login, fetch, terminate.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::ScraperOptions;
use crate::credentials::Credentials;
use crate::error::{classify_error, ErrorType, ScraperError};
use crate::models::ScrapingResult;
use crate::normalize::{normalize_transactions, NormalizeOptions};

use super::lifecycle::{BrowserSession, BrowserSource};
use super::matcher::LoginOutcome;
use super::progress::{ProgressEmitter, ProgressEvent, ProgressType};
use super::{ScrapeContext, ScraperAdapter};

/// Runs a [`ScraperAdapter`] through the scrape lifecycle.
///
/// `scrape` never fails: every error is reported as a failed
/// [`ScrapingResult`], and the browser session is always torn down.
pub struct Scraper<A> {
    adapter: A,
    options: ScraperOptions,
    browser: BrowserSource,
    progress: ProgressEmitter,
    clock: Arc<dyn Clock>,
}

impl<A: ScraperAdapter> Scraper<A> {
    pub fn new(adapter: A, options: ScraperOptions) -> Self {
        let mut progress = ProgressEmitter::new();
        progress.set_verbose(options.verbose);
        Self {
            adapter,
            options,
            browser: BrowserSource::default(),
            progress,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_browser(mut self, browser: BrowserSource) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_progress(&mut self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        self.progress.subscribe(listener);
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn options(&self) -> &ScraperOptions {
        &self.options
    }

    fn emit(&self, kind: ProgressType) {
        self.progress.emit(self.adapter.company(), kind);
    }

    pub async fn scrape(&mut self, credentials: &Credentials) -> ScrapingResult {
        let company = self.adapter.company();
        tracing::info!(%company, "starting scrape");
        self.emit(ProgressType::StartScraping);

        let mut session = BrowserSession::new(self.options.screenshot_path.clone());
        let result = match self.initialize(&mut session).await {
            Ok(()) => self.login_and_fetch(&session, credentials).await,
            Err(err) => {
                tracing::error!(%company, error = %format!("{err:#}"), "failed to initialize");
                failure_from_error(&err)
            }
        };

        self.emit(ProgressType::Terminating);
        let result = match session.terminate(result.is_success()).await {
            Ok(()) => result,
            Err(err) => {
                tracing::error!(%company, error = %format!("{err:#}"), "failed to terminate");
                ScrapingResult::failure(ErrorType::Generic, format!("{err:#}"))
            }
        };

        self.emit(ProgressType::EndScraping);
        match result.error_type() {
            None => tracing::info!(%company, "scrape succeeded"),
            Some(error_type) => tracing::warn!(%company, %error_type, "scrape failed"),
        }
        result
    }

    async fn initialize(&self, session: &mut BrowserSession) -> anyhow::Result<()> {
        self.emit(ProgressType::Initializing);
        if !self.adapter.needs_browser() {
            tracing::debug!("adapter runs without a browser");
            return Ok(());
        }
        session.initialize(&self.browser, &self.options).await
    }

    async fn login_and_fetch(
        &mut self,
        session: &BrowserSession,
        credentials: &Credentials,
    ) -> ScrapingResult {
        let company = self.adapter.company();
        let missing = credentials.missing_fields(company);
        if credentials.is_empty() || !missing.is_empty() {
            tracing::warn!(%company, ?missing, "missing credentials");
            let message = if missing.is_empty() {
                "no credentials supplied".to_string()
            } else {
                format!("missing credentials: {}", missing.join(", "))
            };
            return ScrapingResult::failure(ErrorType::General, message);
        }
        if credentials.lacks_otp(company) {
            tracing::warn!(%company, "no otp code retriever or long-term token");
            return failure_from_error(&ScraperError::TwoFactorRetrieverMissing.into());
        }

        let ctx = ScrapeContext::new(session.page().cloned(), &self.options, self.clock.as_ref());

        self.emit(ProgressType::LoggingIn);
        let outcome = match self.adapter.login(&ctx, credentials).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%company, error = %format!("{err:#}"), "login failed");
                return failure_from_error(&err);
            }
        };
        tracing::debug!(%company, %outcome, "login finished");

        if let Some(failure) = self.handle_login_outcome(outcome) {
            return failure;
        }

        let result = match self.adapter.fetch_data(&ctx).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(%company, error = %format!("{err:#}"), "fetch failed");
                return failure_from_error(&err);
            }
        };

        let normalize = NormalizeOptions {
            start: ctx.start(),
            combine_installments: self.options.combine_installments,
            filter_by_date: self.options.filter_by_date,
        };
        match result {
            ScrapingResult::Success { accounts } => ScrapingResult::success(
                accounts
                    .into_iter()
                    .map(|mut account| {
                        account.txns = normalize_transactions(account.txns, &normalize);
                        account
                    })
                    .collect(),
            ),
            failure => failure,
        }
    }

    /// Emit the progress event for `outcome`; returns the result to report
    /// if the scrape stops here.
    fn handle_login_outcome(&self, outcome: LoginOutcome) -> Option<ScrapingResult> {
        match outcome {
            LoginOutcome::Success => {
                self.emit(ProgressType::LoginSuccess);
                None
            }
            LoginOutcome::InvalidPassword => {
                self.emit(ProgressType::LoginFailed);
                Some(ScrapingResult::failure_type(ErrorType::InvalidPassword))
            }
            LoginOutcome::AccountBlocked => {
                self.emit(ProgressType::LoginFailed);
                Some(ScrapingResult::failure_type(ErrorType::AccountBlocked))
            }
            LoginOutcome::UnknownError => {
                self.emit(ProgressType::LoginFailed);
                Some(ScrapingResult::failure(
                    ErrorType::Generic,
                    format!("Login failed with {outcome} error"),
                ))
            }
            LoginOutcome::ChangePassword => {
                self.emit(ProgressType::ChangePassword);
                Some(ScrapingResult::failure_type(ErrorType::ChangePassword))
            }
        }
    }
}

fn failure_from_error(err: &anyhow::Error) -> ScrapingResult {
    ScrapingResult::failure(classify_error(err), format!("{err:#}"))
}
