use serde::Serialize;

use super::TransactionsAccount;
use crate::error::ErrorType;

/// Outcome of one `scrape()` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScrapingResult {
    Success {
        accounts: Vec<TransactionsAccount>,
    },
    Failure {
        #[serde(rename = "errorType")]
        error_type: ErrorType,
        #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
}

impl ScrapingResult {
    pub fn success(accounts: Vec<TransactionsAccount>) -> Self {
        ScrapingResult::Success { accounts }
    }

    pub fn failure(error_type: ErrorType, message: impl Into<String>) -> Self {
        ScrapingResult::Failure {
            error_type,
            error_message: Some(message.into()),
        }
    }

    /// A failure without a message, e.g. a classified login outcome.
    pub fn failure_type(error_type: ErrorType) -> Self {
        ScrapingResult::Failure {
            error_type,
            error_message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapingResult::Success { .. })
    }

    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            ScrapingResult::Success { .. } => None,
            ScrapingResult::Failure { error_type, .. } => Some(*error_type),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ScrapingResult::Success { .. } => None,
            ScrapingResult::Failure { error_message, .. } => error_message.as_deref(),
        }
    }

    pub fn accounts(&self) -> Option<&[TransactionsAccount]> {
        match self {
            ScrapingResult::Success { accounts } => Some(accounts),
            ScrapingResult::Failure { .. } => None,
        }
    }
}
