use serde::{Deserialize, Serialize};

/// Failure categories reported in a [`ScrapingResult`](crate::models::ScrapingResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    InvalidPassword,
    ChangePassword,
    AccountBlocked,
    /// A bounded wait was exceeded.
    Timeout,
    /// Navigation or unclassified runtime failure during login/fetch.
    Generic,
    /// No credentials supplied, or fetch attempted without a prior login.
    General,
    /// The institution asked for an OTP and no retriever was configured.
    TwoFactorRetrieverMissing,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::InvalidPassword => "INVALID_PASSWORD",
            ErrorType::ChangePassword => "CHANGE_PASSWORD",
            ErrorType::AccountBlocked => "ACCOUNT_BLOCKED",
            ErrorType::Timeout => "TIMEOUT",
            ErrorType::Generic => "GENERIC",
            ErrorType::General => "GENERAL_ERROR",
            ErrorType::TwoFactorRetrieverMissing => "TWO_FACTOR_RETRIEVER_MISSING",
        };
        f.write_str(s)
    }
}

/// Errors raised by the browser substrate that callers need to tell apart.
///
/// Adapters and helpers return `anyhow::Result`; the orchestrator recovers
/// these variants with `downcast_ref` to pick the reported [`ErrorType`].
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("failed to navigate to url {url}, status code: {status}")]
    NavigationStatus { url: String, status: u16 },

    #[error("error while trying to navigate to url {url}, response is undefined")]
    NavigationMissingResponse { url: String },

    /// The page or browser was already gone when an operation reached it.
    #[error("target closed")]
    TargetClosed,

    #[error("a one time password is required but no otp code retriever was supplied")]
    TwoFactorRetrieverMissing,

    #[error("no page available: {0}")]
    NoPage(String),
}

impl ScraperError {
    /// The result category this error is reported under.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ScraperError::Timeout(_) => ErrorType::Timeout,
            ScraperError::TwoFactorRetrieverMissing => ErrorType::TwoFactorRetrieverMissing,
            _ => ErrorType::Generic,
        }
    }
}

/// Map an arbitrary adapter error onto the reported category.
pub fn classify_error(err: &anyhow::Error) -> ErrorType {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ScraperError>())
        .map(ScraperError::error_type)
        .unwrap_or(ErrorType::Generic)
}

/// Whether the error is the benign "target already gone" race.
pub fn is_target_closed(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<ScraperError>(), Some(ScraperError::TargetClosed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn timeout_is_recognized_through_context() {
        let err: anyhow::Error = Err::<(), _>(ScraperError::Timeout("waiting for login".into()))
            .context("login step failed")
            .unwrap_err();
        assert_eq!(classify_error(&err), ErrorType::Timeout);
    }

    #[test]
    fn unknown_errors_are_generic() {
        let err = anyhow::anyhow!("selector not found");
        assert_eq!(classify_error(&err), ErrorType::Generic);
        assert!(!is_target_closed(&err));
    }

    #[test]
    fn target_closed_detected() {
        let err = anyhow::Error::new(ScraperError::TargetClosed);
        assert!(is_target_closed(&err));
        assert_eq!(classify_error(&err), ErrorType::Generic);
    }
}
