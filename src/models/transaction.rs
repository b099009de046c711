use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Normal,
    Installments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
}

/// Institution-supplied reference. Some institutions use numbers, some strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransactionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionId::Number(n) => write!(f, "{n}"),
            TransactionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TransactionId {
    fn from(value: i64) -> Self {
        TransactionId::Number(value)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId::Text(value.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId::Text(value)
    }
}

/// Position of one charge within a purchase split into several payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Installments {
    /// 1-based index of this charge.
    pub number: u32,
    pub total: u32,
}

fn installment_numbers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex is valid"))
}

impl Installments {
    /// Extract `number/total` from a free-text memo such as
    /// "תשלום 3 מתוך 6" or "payment 3 of 6".
    ///
    /// Returns `None` when the memo carries no usable pair, in which case the
    /// transaction is treated as a normal one.
    pub fn parse(memo: &str) -> Option<Self> {
        let mut numbers = installment_numbers()
            .find_iter(memo)
            .map(|m| m.as_str().parse::<u32>());
        let number = numbers.next()?.ok()?;
        let total = numbers.next()?.ok()?;
        if number == 0 || total == 0 || number > total {
            return None;
        }
        Some(Self { number, total })
    }

    pub fn is_initial(&self) -> bool {
        self.number == 1
    }
}

/// The canonical transaction every institution's raw records are converted to.
///
/// The transaction type is derived from the installments field, so a record
/// is `Installments` exactly when it carries installment metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<TransactionId>,
    /// Purchase date.
    pub date: DateTime<Utc>,
    /// Settlement date. Not guaranteed to be on or after `date`.
    pub processed_date: DateTime<Utc>,
    pub original_amount: Decimal,
    pub original_currency: String,
    pub charged_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charged_currency: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    installments: Option<Installments>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Transaction {
    /// A completed, normal transaction charged in its original currency.
    pub fn new(
        date: DateTime<Utc>,
        amount: Decimal,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let currency = currency.into();
        Self {
            kind: TransactionType::Normal,
            identifier: None,
            date,
            processed_date: date,
            original_amount: amount,
            original_currency: currency.clone(),
            charged_amount: amount,
            charged_currency: Some(currency),
            description: description.into(),
            memo: None,
            status: TransactionStatus::Completed,
            installments: None,
            category: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<TransactionId>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_processed_date(mut self, processed_date: DateTime<Utc>) -> Self {
        self.processed_date = processed_date;
        self
    }

    pub fn with_charged(mut self, amount: Decimal, currency: Option<String>) -> Self {
        self.charged_amount = amount;
        self.charged_currency = currency;
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_installments(mut self, installments: Option<Installments>) -> Self {
        self.set_installments(installments);
        self
    }

    /// Set the memo and derive installment metadata from it.
    pub fn with_installment_memo(mut self, memo: impl Into<String>) -> Self {
        let memo = memo.into();
        let installments = Installments::parse(&memo);
        self.memo = Some(memo);
        self.set_installments(installments);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn set_installments(&mut self, installments: Option<Installments>) {
        self.kind = match installments {
            Some(_) => TransactionType::Installments,
            None => TransactionType::Normal,
        };
        self.installments = installments;
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.kind
    }

    pub fn installments(&self) -> Option<Installments> {
        self.installments
    }

    pub fn is_normal(&self) -> bool {
        self.kind == TransactionType::Normal
    }

    pub fn is_initial_installment(&self) -> bool {
        self.installments.is_some_and(|i| i.is_initial())
    }

    pub fn is_non_initial_installment(&self) -> bool {
        self.installments.is_some_and(|i| !i.is_initial())
    }
}
