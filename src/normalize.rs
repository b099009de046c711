//! Transaction normalization pipeline.
//!
//! Pure functions over canonical transactions. The orchestrator applies
//! [`fix_installments`], [`filter_old_transactions`] and
//! [`sort_transactions_by_date`] in that order; adapters that fetch per month
//! use [`fetch_by_month`] / [`merge_accounts`] to assemble their accounts first.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Months, Utc};
use futures::future::try_join_all;
use rust_decimal::Decimal;

use crate::models::{Transaction, TransactionId, TransactionsAccount};
use crate::months::Month;

/// Which steps [`normalize_transactions`] runs.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub start: DateTime<Utc>,
    pub combine_installments: bool,
    pub filter_by_date: bool,
}

/// Move each non-initial installment to the month it is actually charged in:
/// `date + (number - 1) months`. Initial installments are the anchor and stay.
pub fn fix_installments(txns: Vec<Transaction>) -> Vec<Transaction> {
    txns.into_iter()
        .map(|mut txn| {
            if let Some(installments) = txn.installments().filter(|i| !i.is_initial()) {
                let offset = Months::new(installments.number - 1);
                match txn.date.checked_add_months(offset) {
                    Some(date) => txn.date = date,
                    None => tracing::warn!(
                        date = %txn.date,
                        number = installments.number,
                        "installment date out of range, leaving unchanged"
                    ),
                }
            }
            txn
        })
        .collect()
}

/// Drop transactions dated before `start`.
///
/// When installments are being combined, normal transactions and initial
/// installments are kept regardless of date: the initial installment stands for
/// the whole purchase, and its first charge may predate the window.
pub fn filter_old_transactions(
    txns: Vec<Transaction>,
    start: DateTime<Utc>,
    combine_installments: bool,
) -> Vec<Transaction> {
    txns.into_iter()
        .filter(|txn| {
            txn.date >= start
                || (combine_installments && (txn.is_normal() || txn.is_initial_installment()))
        })
        .collect()
}

/// Stable ascending sort by purchase date.
pub fn sort_transactions_by_date(mut txns: Vec<Transaction>) -> Vec<Transaction> {
    txns.sort_by_key(|txn| txn.date);
    txns
}

pub fn normalize_transactions(txns: Vec<Transaction>, options: &NormalizeOptions) -> Vec<Transaction> {
    let txns = if options.combine_installments {
        txns
    } else {
        fix_installments(txns)
    };
    let txns = if options.filter_by_date {
        filter_old_transactions(txns, options.start, options.combine_installments)
    } else {
        txns
    };
    sort_transactions_by_date(txns)
}

/// Concatenate per-window account lists by account number.
///
/// Accounts keep the order they were first seen in. Transactions are appended
/// without de-duplication; a balance or currency reported by a later window
/// replaces an earlier one.
pub fn merge_accounts<I>(windows: I) -> Vec<TransactionsAccount>
where
    I: IntoIterator<Item = Vec<TransactionsAccount>>,
{
    let mut merged: Vec<TransactionsAccount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for account in windows.into_iter().flatten() {
        match index.get(&account.account_number) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.txns.extend(account.txns);
                if account.balance.is_some() {
                    existing.balance = account.balance;
                }
                if account.currency.is_some() {
                    existing.currency = account.currency;
                }
                if account.savings_account.is_some() {
                    existing.savings_account = account.savings_account;
                }
            }
            None => {
                index.insert(account.account_number.clone(), merged.len());
                merged.push(account);
            }
        }
    }
    merged
}

/// Remove repeats of the same `(identifier, date, charged_amount)`, keeping
/// the first. Transactions without an identifier are never treated as
/// duplicates. A pending record and the completed record it later becomes are
/// both kept.
pub fn dedupe_transactions(txns: Vec<Transaction>) -> Vec<Transaction> {
    let mut seen: HashSet<(TransactionId, DateTime<Utc>, Decimal)> = HashSet::new();
    txns.into_iter()
        .filter(|txn| match &txn.identifier {
            Some(id) => seen.insert((id.clone(), txn.date, txn.charged_amount)),
            None => true,
        })
        .collect()
}

/// Fetch every month concurrently and merge the results by account number.
///
/// Requests are all in flight at once; result order follows `months`, not
/// completion order.
pub async fn fetch_by_month<F, Fut>(months: &[Month], fetch: F) -> Result<Vec<TransactionsAccount>>
where
    F: Fn(Month) -> Fut,
    Fut: Future<Output = Result<Vec<TransactionsAccount>>>,
{
    tracing::debug!(months = months.len(), "fetching month windows");
    let windows = try_join_all(months.iter().copied().map(&fetch)).await?;
    Ok(merge_accounts(windows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Installments, TransactionStatus};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn normal(date: DateTime<Utc>, desc: &str) -> Transaction {
        Transaction::new(date, Decimal::new(-100, 0), "ILS", desc)
    }

    fn installment(date: DateTime<Utc>, number: u32, total: u32) -> Transaction {
        normal(date, "furniture").with_installments(Some(Installments { number, total }))
    }

    #[test]
    fn non_initial_installment_is_projected_forward() {
        let fixed = fix_installments(vec![installment(at(2024, 1, 15), 3, 6)]);
        assert_eq!(fixed[0].date, at(2024, 3, 15));
    }

    #[test]
    fn initial_installment_and_normal_are_untouched() {
        let txns = vec![installment(at(2024, 1, 15), 1, 6), normal(at(2024, 1, 20), "x")];
        let fixed = fix_installments(txns.clone());
        assert_eq!(fixed, txns);
    }

    #[test]
    fn projection_clamps_to_month_end() {
        let fixed = fix_installments(vec![installment(at(2024, 1, 31), 2, 3)]);
        assert_eq!(fixed[0].date, at(2024, 2, 29));
    }

    #[test]
    fn filter_drops_old_normal_without_combine() {
        let start = at(2024, 1, 1);
        let kept = filter_old_transactions(vec![normal(at(2023, 6, 1), "old")], start, false);
        assert!(kept.is_empty());
    }

    #[test]
    fn filter_with_combine_keeps_old_normal_and_initial_only() {
        let start = at(2024, 1, 1);
        let txns = vec![
            normal(at(2023, 6, 1), "old"),
            installment(at(2023, 6, 1), 1, 6),
            installment(at(2023, 6, 1), 2, 6),
            installment(at(2024, 2, 1), 3, 6),
        ];
        let kept = filter_old_transactions(txns, start, true);
        let numbers: Vec<Option<u32>> = kept
            .iter()
            .map(|t| t.installments().map(|i| i.number))
            .collect();
        assert_eq!(numbers, vec![None, Some(1), Some(3)]);
    }

    #[test]
    fn filter_keeps_transactions_on_start_boundary() {
        let start = at(2024, 1, 1);
        let kept = filter_old_transactions(vec![normal(start, "edge")], start, false);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let txns = vec![
            normal(at(2024, 2, 1), "b"),
            normal(at(2024, 1, 1), "a1"),
            normal(at(2024, 1, 1), "a2"),
        ];
        let once = sort_transactions_by_date(txns);
        let descriptions: Vec<&str> = once.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a1", "a2", "b"]);

        let twice = sort_transactions_by_date(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_runs_fix_before_filter() {
        // Dated before the window, but its 3rd installment lands inside it.
        let options = NormalizeOptions {
            start: at(2024, 2, 1),
            combine_installments: false,
            filter_by_date: true,
        };
        let out = normalize_transactions(vec![installment(at(2024, 1, 10), 3, 4)], &options);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, at(2024, 3, 10));
    }

    #[test]
    fn normalize_without_date_filter_keeps_everything() {
        let options = NormalizeOptions {
            start: at(2024, 2, 1),
            combine_installments: true,
            filter_by_date: false,
        };
        let out = normalize_transactions(
            vec![normal(at(2024, 3, 1), "new"), installment(at(2020, 1, 1), 2, 3)],
            &options,
        );
        assert_eq!(out.len(), 2);
        // Combining leaves installment dates alone.
        assert_eq!(out[0].date, at(2020, 1, 1));
    }

    #[test]
    fn merge_concatenates_by_account_number() {
        let jan = vec![
            TransactionsAccount::new("123", vec![normal(at(2024, 1, 5), "jan")]),
            TransactionsAccount::new("456", vec![]),
        ];
        let feb = vec![TransactionsAccount::new("123", vec![normal(at(2024, 2, 5), "feb")])
            .with_balance(Decimal::new(500, 0))];

        let merged = merge_accounts(vec![jan, feb]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].account_number, "123");
        assert_eq!(merged[0].txns.len(), 2);
        assert_eq!(merged[0].balance, Some(Decimal::new(500, 0)));
        assert_eq!(merged[1].account_number, "456");
    }

    #[test]
    fn dedupe_keeps_pending_and_completed_versions() {
        let date = at(2024, 1, 5);
        // Pending records carry no identifier until they settle.
        let pending = normal(date, "coffee").with_status(TransactionStatus::Pending);
        let completed = normal(date, "coffee").with_identifier(7);
        let repeated = normal(date, "lunch").with_identifier(8);

        let out = dedupe_transactions(vec![pending, completed, repeated.clone(), repeated]);
        let statuses: Vec<TransactionStatus> = out.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TransactionStatus::Pending,
                TransactionStatus::Completed,
                TransactionStatus::Completed
            ]
        );
    }

    #[test]
    fn dedupe_distinguishes_amounts() {
        let date = at(2024, 1, 5);
        let first = normal(date, "refund").with_identifier("A1");
        let second = first.clone().with_charged(Decimal::new(100, 0), None);
        assert_eq!(dedupe_transactions(vec![first, second]).len(), 2);
    }

    #[tokio::test]
    async fn fetch_by_month_merges_out_of_order_completions() {
        let months = vec![
            Month::containing(at(2024, 1, 1).date_naive()),
            Month::containing(at(2024, 2, 1).date_naive()),
        ];
        let accounts = fetch_by_month(&months, |month| async move {
            // The earlier month finishes last.
            if month.month() == 1 {
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            }
            let date = Utc.from_utc_datetime(&month.first_day().and_hms_opt(0, 0, 0).unwrap());
            Ok::<_, anyhow::Error>(vec![TransactionsAccount::new(
                "123",
                vec![normal(date, &month.to_string())],
            )])
        })
        .await
        .unwrap();

        assert_eq!(accounts.len(), 1);
        let sorted = sort_transactions_by_date(accounts[0].txns.clone());
        assert_eq!(sorted[0].description, "2024-01");
        assert_eq!(sorted[1].description, "2024-02");
    }
}
