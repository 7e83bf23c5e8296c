use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// calendar month a payment is booked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// month containing the given instant
    pub fn of(date: DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// number of days in a month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// shift a date by whole months, landing on `anchor_day`
///
/// the anchor is clamped to the last day of the target month, so a
/// contract paid on the 31st falls due on the 28th/29th in february and
/// returns to the 31st afterwards. the time of day is kept.
pub fn add_months_anchored(date: DateTime<Utc>, months: i32, anchor_day: u32) -> DateTime<Utc> {
    let first = date.date_naive().with_day(1).unwrap_or_else(|| date.date_naive());
    let shifted = if months >= 0 {
        first.checked_add_months(Months::new(months as u32))
    } else {
        first.checked_sub_months(Months::new(months.unsigned_abs()))
    }
    .unwrap_or(first);

    let day = anchor_day.clamp(1, days_in_month(shifted.year(), shifted.month()));
    let target = shifted.with_day(day).unwrap_or(shifted);
    Utc.from_utc_datetime(&target.and_time(date.time()))
}

/// whole days elapsed since `due`, zero when not yet due
pub fn overdue_days(due: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let seconds = (now - due).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds / SECONDS_PER_DAY) as u32
}

/// start of the calendar day (utc) containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_add_months_keeps_anchor() {
        assert_eq!(add_months_anchored(at(2024, 1, 15), 1, 15), at(2024, 2, 15));
        assert_eq!(add_months_anchored(at(2024, 12, 10), 1, 10), at(2025, 1, 10));
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months_anchored(at(2024, 1, 31), 1, 31), at(2024, 2, 29));
        assert_eq!(add_months_anchored(at(2023, 1, 31), 1, 31), at(2023, 2, 28));
        // anchor restores the original day once the month is long enough
        assert_eq!(add_months_anchored(at(2024, 2, 29), 1, 31), at(2024, 3, 31));
    }

    #[test]
    fn test_add_months_backwards() {
        assert_eq!(add_months_anchored(at(2024, 3, 31), -1, 31), at(2024, 2, 29));
        assert_eq!(add_months_anchored(at(2024, 1, 5), -1, 5), at(2023, 12, 5));
    }

    #[test]
    fn test_postponed_date_returns_to_anchor() {
        // due on the 10th, pushed to the 25th; next due goes back to the 10th
        assert_eq!(add_months_anchored(at(2024, 3, 25), 1, 10), at(2024, 4, 10));
    }

    #[test]
    fn test_overdue_days_floor() {
        let due = at(2024, 1, 1);
        assert_eq!(overdue_days(due, due), 0);
        assert_eq!(overdue_days(due, due + chrono::Duration::hours(23)), 0);
        assert_eq!(overdue_days(due, due + chrono::Duration::hours(49)), 2);
        assert_eq!(overdue_days(due, due - chrono::Duration::days(3)), 0);
    }

    #[test]
    fn test_period_of_and_display() {
        let p = Period::new(2024, 12);
        assert_eq!(p.to_string(), "2024-12");
        assert_eq!(Period::of(at(2024, 7, 3)), Period::new(2024, 7));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
    }
}
