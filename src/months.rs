//! Calendar-month fetch windows.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::clock::Clock;

/// One calendar month, the unit month-scoped institution APIs are queried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// 1-based month number.
    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day
            .pred_opt()
            .unwrap_or(self.first_day)
    }

    pub fn next(&self) -> Self {
        Self {
            first_day: self
                .first_day
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first_day),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// Every month from the one containing `start` through the current month,
/// extended by `future_months` (cards bill future installments ahead).
pub fn all_months(start: NaiveDate, future_months: u32, clock: &dyn Clock) -> Vec<Month> {
    let today = clock.today();
    let last = Month::containing(
        today
            .checked_add_months(Months::new(future_months))
            .unwrap_or(today),
    );

    let mut months = Vec::new();
    let mut current = Month::containing(start);
    while current <= last {
        months.push(current);
        let next = current.next();
        if next == current {
            break;
        }
        current = next;
    }
    months
}
