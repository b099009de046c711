//! The standard form-based login flow.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};

use super::matcher::{LoginOutcome, PossibleLoginResults};
use super::ScrapeContext;
use crate::browser::{Page, WaitUntil};
use crate::elements::{click_button, fill_input, wait_until_element_found, DEFAULT_ELEMENT_TIMEOUT};
use crate::error::{classify_error, ErrorType};
use crate::navigation::{current_url, navigate_to, wait_for_navigation};

/// An async step run against the login page.
pub type PageHook = Arc<dyn Fn(Arc<dyn Page>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub fn page_hook<F, Fut>(f: F) -> PageHook
where
    F: Fn(Arc<dyn Page>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |page| Box::pin(f(page)))
}

/// An input to fill on the login form.
pub struct LoginField {
    pub selector: String,
    pub value: SecretString,
}

impl LoginField {
    pub fn new(selector: impl Into<String>, value: SecretString) -> Self {
        Self {
            selector: selector.into(),
            value,
        }
    }
}

/// How the form gets submitted.
pub enum Submit {
    /// Click the element matching this selector.
    Button(String),
    /// Run a custom routine (e.g. press Enter, or click inside an iframe).
    Routine(PageHook),
}

/// Everything the login flow needs to know about an institution's form.
pub struct LoginOptions {
    pub login_url: String,
    pub fields: Vec<LoginField>,
    pub submit: Submit,
    /// Wait for the form to be usable. Defaults to waiting for the submit button.
    pub check_readiness: Option<PageHook>,
    /// Runs after the form is ready and before any field is filled.
    pub pre_action: Option<PageHook>,
    /// Runs after submit instead of waiting for a navigation.
    pub post_action: Option<PageHook>,
    pub user_agent: Option<String>,
    pub wait_until: WaitUntil,
    /// Read the URL from `window.location.href` when classifying.
    pub client_side_url: bool,
    pub possible_results: PossibleLoginResults,
}

impl LoginOptions {
    pub fn new(
        login_url: impl Into<String>,
        fields: Vec<LoginField>,
        submit: Submit,
        possible_results: PossibleLoginResults,
    ) -> Self {
        Self {
            login_url: login_url.into(),
            fields,
            submit,
            check_readiness: None,
            pre_action: None,
            post_action: None,
            user_agent: None,
            wait_until: WaitUntil::default(),
            client_side_url: true,
            possible_results,
        }
    }

    pub fn with_check_readiness(mut self, hook: PageHook) -> Self {
        self.check_readiness = Some(hook);
        self
    }

    pub fn with_pre_action(mut self, hook: PageHook) -> Self {
        self.pre_action = Some(hook);
        self
    }

    pub fn with_post_action(mut self, hook: PageHook) -> Self {
        self.post_action = Some(hook);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = wait_until;
        self
    }

    pub fn with_server_side_url(mut self) -> Self {
        self.client_side_url = false;
        self
    }
}

/// Navigate to the login page, fill and submit the form, then classify
/// where the browser ended up.
pub async fn login_with_options(ctx: &ScrapeContext<'_>, options: LoginOptions) -> Result<LoginOutcome> {
    let page = ctx.page()?;

    if let Some(user_agent) = &options.user_agent {
        page.set_user_agent(user_agent).await?;
    }

    tracing::debug!(url = %options.login_url, "navigating to login page");
    navigate_to(
        page.as_ref(),
        &options.login_url,
        options.wait_until,
        ctx.options().navigation_retry_count,
    )
    .await?;

    match (&options.check_readiness, &options.submit) {
        (Some(check), _) => check(page.clone()).await?,
        (None, Submit::Button(selector)) => {
            wait_until_element_found(page.as_ref(), selector, false, DEFAULT_ELEMENT_TIMEOUT).await?
        }
        (None, Submit::Routine(_)) => {}
    }

    if let Some(pre_action) = &options.pre_action {
        pre_action(page.clone()).await?;
    }

    tracing::debug!(fields = options.fields.len(), "filling login form");
    for field in &options.fields {
        fill_input(page.as_ref(), &field.selector, field.value.expose_secret()).await?;
    }

    match &options.submit {
        Submit::Button(selector) => click_button(page.as_ref(), selector).await?,
        Submit::Routine(submit) => submit(page.clone()).await?,
    }

    match &options.post_action {
        Some(post_action) => post_action(page.clone()).await?,
        // Some forms update in place, so a missing navigation is not an error.
        None => match wait_for_navigation(page.as_ref(), options.wait_until).await {
            Ok(()) => {}
            Err(err) if classify_error(&err) == ErrorType::Timeout => {
                tracing::debug!("no navigation after login submit");
            }
            Err(err) => return Err(err.context("Waiting for navigation after login submit")),
        },
    }

    let url = current_url(page.as_ref(), options.client_side_url).await?;
    tracing::debug!(%url, "classifying login result");
    options.possible_results.classify(&url, Some(page)).await
}
