//! Login outcome classification.
//!
//! After a login form is submitted, the adapter's table of outcome matchers
//! is evaluated against the resulting URL. Evaluation follows declaration
//! order (outcomes, then matchers within an outcome) and the first match
//! wins, so adapters list specific patterns before generic ones.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::browser::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginOutcome {
    Success,
    InvalidPassword,
    ChangePassword,
    AccountBlocked,
    UnknownError,
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginOutcome::Success => "SUCCESS",
            LoginOutcome::InvalidPassword => "INVALID_PASSWORD",
            LoginOutcome::ChangePassword => "CHANGE_PASSWORD",
            LoginOutcome::AccountBlocked => "ACCOUNT_BLOCKED",
            LoginOutcome::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(s)
    }
}

/// What a predicate matcher gets to look at.
#[derive(Clone)]
pub struct PredicateInput {
    pub page: Option<Arc<dyn Page>>,
    pub url: String,
}

pub type LoginPredicate = Arc<dyn Fn(PredicateInput) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

#[derive(Clone)]
pub enum Matcher {
    /// Case-insensitive exact URL equality.
    Literal(String),
    /// Regex tested against the URL.
    Pattern(Regex),
    /// Arbitrary async check, e.g. looking for an error banner on the page.
    Predicate(LoginPredicate),
}

impl Matcher {
    pub fn literal(url: impl Into<String>) -> Self {
        Matcher::Literal(url.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).with_context(|| format!("Invalid URL pattern {pattern:?}"))?;
        Ok(Matcher::Pattern(re))
    }

    /// A case-insensitive pattern, the usual way URL fragments are matched.
    pub fn pattern_ci(pattern: &str) -> Result<Self> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid URL pattern {pattern:?}"))?;
        Ok(Matcher::Pattern(re))
    }

    pub fn predicate<F, Fut>(f: F) -> Self
    where
        F: Fn(PredicateInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Matcher::Predicate(Arc::new(move |input| Box::pin(f(input))))
    }

    pub async fn matches(&self, url: &str, page: Option<&Arc<dyn Page>>) -> Result<bool> {
        match self {
            Matcher::Literal(expected) => Ok(url.to_lowercase() == expected.to_lowercase()),
            Matcher::Pattern(re) => Ok(re.is_match(url)),
            Matcher::Predicate(predicate) => {
                predicate(PredicateInput {
                    page: page.cloned(),
                    url: url.to_string(),
                })
                .await
            }
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(url) => f.debug_tuple("Literal").field(url).finish(),
            Matcher::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Matcher {
    fn from(url: &str) -> Self {
        Matcher::literal(url)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Matcher::Pattern(re)
    }
}

/// Ordered outcome -> matchers table.
#[derive(Debug, Clone, Default)]
pub struct PossibleLoginResults {
    entries: Vec<(LoginOutcome, Vec<Matcher>)>,
}

impl PossibleLoginResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append matchers for `outcome`. An outcome keeps the position of its
    /// first declaration; later calls extend its list.
    pub fn with(mut self, outcome: LoginOutcome, matchers: Vec<Matcher>) -> Self {
        match self.entries.iter_mut().find(|(o, _)| *o == outcome) {
            Some((_, existing)) => existing.extend(matchers),
            None => self.entries.push((outcome, matchers)),
        }
        self
    }

    pub fn outcomes(&self) -> impl Iterator<Item = LoginOutcome> + '_ {
        self.entries.iter().map(|(outcome, _)| *outcome)
    }

    /// First outcome with a matching matcher, or `UnknownError`.
    pub async fn classify(&self, url: &str, page: Option<&Arc<dyn Page>>) -> Result<LoginOutcome> {
        for (outcome, matchers) in &self.entries {
            for matcher in matchers {
                if matcher.matches(url, page).await? {
                    tracing::debug!(%outcome, ?matcher, url, "login outcome matched");
                    return Ok(*outcome);
                }
            }
        }
        tracing::debug!(url, "no login outcome matched");
        Ok(LoginOutcome::UnknownError)
    }
}
