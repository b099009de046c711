use rust_decimal::Decimal;
use serde::Serialize;

use super::Transaction;

/// One physical or logical account discovered during a fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsAccount {
    /// Institution-normalized number, unique within one scrape.
    pub account_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings_account: Option<bool>,
    pub txns: Vec<Transaction>,
}

impl TransactionsAccount {
    pub fn new(account_number: impl Into<String>, txns: Vec<Transaction>) -> Self {
        Self {
            account_number: account_number.into(),
            balance: None,
            currency: None,
            savings_account: None,
            txns,
        }
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_savings_account(mut self, savings_account: bool) -> Self {
        self.savings_account = Some(savings_account);
        self
    }
}
