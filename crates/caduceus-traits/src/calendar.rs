//! Calendar helpers for month-end bucketing.
//!
//! Monthly signals are labelled with the calendar month-end date (2020-02-29,
//! not the last trading day of February). Every month between the first and
//! last observation gets a bucket, even when it holds no data.

use chrono::{Datelike, NaiveDate};

use crate::Date;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch, as used by Polars `Date`.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

/// Returns the last calendar day of the month containing `date`.
#[must_use]
pub fn month_end(date: Date) -> Date {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// All calendar month-ends from the month of `first` through the month of `last`.
///
/// Returns an empty vector when `last < first`.
#[must_use]
pub fn month_ends_between(first: Date, last: Date) -> Vec<Date> {
    let mut out = Vec::new();
    if last < first {
        return out;
    }
    let stop = month_end(last);
    let mut current = month_end(first);
    while current <= stop {
        out.push(current);
        match current.succ_opt() {
            Some(next) => current = month_end(next),
            None => break,
        }
    }
    out
}

/// Converts a Polars `Date` physical value (days since the Unix epoch).
#[must_use]
pub fn date_from_epoch_days(days: i32) -> Option<Date> {
    NaiveDate::from_num_days_from_ce_opt(days + CE_TO_UNIX_EPOCH_DAYS)
}

/// Converts a date into days since the Unix epoch.
#[must_use]
pub fn date_to_epoch_days(date: Date) -> i32 {
    date.num_days_from_ce() - CE_TO_UNIX_EPOCH_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_end() {
        assert_eq!(month_end(d(2020, 2, 3)), d(2020, 2, 29));
        assert_eq!(month_end(d(2021, 2, 28)), d(2021, 2, 28));
        assert_eq!(month_end(d(2020, 12, 1)), d(2020, 12, 31));
    }

    #[test]
    fn test_month_ends_between() {
        let ends = month_ends_between(d(2019, 11, 15), d(2020, 2, 3));
        assert_eq!(
            ends,
            vec![d(2019, 11, 30), d(2019, 12, 31), d(2020, 1, 31), d(2020, 2, 29)]
        );
        assert!(month_ends_between(d(2020, 2, 1), d(2020, 1, 1)).is_empty());
    }

    #[test]
    fn test_epoch_days_round_trip() {
        assert_eq!(date_to_epoch_days(d(1970, 1, 1)), 0);
        let date = d(2023, 6, 30);
        assert_eq!(date_from_epoch_days(date_to_epoch_days(date)), Some(date));
    }
}
