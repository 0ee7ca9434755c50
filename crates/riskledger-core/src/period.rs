//! Calendar bucketing for snapshots.
//!
//! Every snapshot carries two derived keys: the calendar month (`YYYY-MM`)
//! used by monthly aggregation, and the bi-weekly period (`YYYY-MM-W1` for
//! days 1–15, `YYYY-MM-W2` for day 16 to month end) used as the capture
//! cadence key. All derivations use UTC.

use chrono::{DateTime, Datelike, Utc};

/// Last day of the month that still belongs to the first half (`W1`).
pub const FIRST_HALF_LAST_DAY: u32 = 15;

/// `"YYYY-MM"` for the month containing `at`.
pub fn month_string(at: DateTime<Utc>) -> String {
  format!("{:04}-{:02}", at.year(), at.month())
}

/// `"YYYY-MM-W1"` or `"YYYY-MM-W2"` for the half-month containing `at`.
pub fn bi_week_period(at: DateTime<Utc>) -> String {
  let half = if at.day() <= FIRST_HALF_LAST_DAY { "W1" } else { "W2" };
  format!("{}-{half}", month_string(at))
}

/// The earliest month included in a trend window of `months_back` months
/// ending at `now`.
pub fn start_month(now: DateTime<Utc>, months_back: u32) -> String {
  let index = i64::from(now.year()) * 12 + i64::from(now.month0())
    - i64::from(months_back);
  let year = index.div_euclid(12);
  let month = index.rem_euclid(12) + 1;
  format!("{year:04}-{month:02}")
}

/// Whole days elapsed from `from` to `to`, truncated. Never negative.
pub fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
  (to - from).num_days().max(0)
}
