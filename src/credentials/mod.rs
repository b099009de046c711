//! Login credentials handed to a scrape.
//!
//! Values are kept as [`SecretString`] and are only exposed at the moment they
//! are typed into the login form.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;

use crate::companies::{CompanyType, LoginField};
use crate::error::ScraperError;

/// Supplies one-time passwords when an institution asks for one mid-login.
#[async_trait]
pub trait OtpCodeRetriever: Send + Sync {
    /// `phone_hint` is the masked phone number the code was sent to, when known.
    async fn retrieve(&self, phone_hint: Option<&str>) -> Result<SecretString>;
}

#[derive(Default)]
pub struct Credentials {
    fields: BTreeMap<String, SecretString>,
    otp_code_retriever: Option<Arc<dyn OtpCodeRetriever>>,
    otp_long_term_token: Option<SecretString>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.into(), SecretString::from(value.into()));
        self
    }

    pub fn with_otp_code_retriever(mut self, retriever: Arc<dyn OtpCodeRetriever>) -> Self {
        self.otp_code_retriever = Some(retriever);
        self
    }

    pub fn with_otp_long_term_token(mut self, token: impl Into<String>) -> Self {
        self.otp_long_term_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SecretString> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.otp_code_retriever.is_none()
            && self.otp_long_term_token.is_none()
    }

    pub fn otp_long_term_token(&self) -> Option<&SecretString> {
        self.otp_long_term_token.as_ref()
    }

    /// The configured OTP retriever, or the error that reports it missing.
    pub fn require_otp_retriever(&self) -> Result<&Arc<dyn OtpCodeRetriever>> {
        self.otp_code_retriever
            .as_ref()
            .ok_or_else(|| ScraperError::TwoFactorRetrieverMissing.into())
    }

    /// Names of the login fields `company` needs that are not present.
    ///
    /// The OTP requirement is reported separately by [`Self::lacks_otp`].
    pub fn missing_fields(&self, company: CompanyType) -> Vec<&'static str> {
        company
            .login_fields()
            .iter()
            .filter_map(|field| match field {
                LoginField::Named(name) if !self.fields.contains_key(*name) => Some(*name),
                _ => None,
            })
            .collect()
    }

    /// Whether `company` asks for an OTP and neither a retriever nor a
    /// long-term token was supplied.
    pub fn lacks_otp(&self, company: CompanyType) -> bool {
        company.login_fields().contains(&LoginField::Otp)
            && self.otp_code_retriever.is_none()
            && self.otp_long_term_token.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("otp_code_retriever", &self.otp_code_retriever.is_some())
            .field("otp_long_term_token", &self.otp_long_term_token.is_some())
            .finish()
    }
}
