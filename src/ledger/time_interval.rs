use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use crate::time::wall_clock_to_utc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// Advances `from` by one unit. Month and year steps clamp to the last day of the target
    /// month (Jan 31 + 1 month = Feb 28/29).
    pub fn next_date(self, from: NaiveDate) -> NaiveDate {
        match self {
            TimeUnit::Day => from + Duration::days(1),
            TimeUnit::Week => from + Duration::weeks(1),
            TimeUnit::Month => shift_month(from),
            TimeUnit::Year => shift_year(from),
        }
    }

    /// Advances a timestamp, keeping its time of day.
    pub fn next_datetime(self, from: DateTime<Utc>) -> DateTime<Utc> {
        let naive = from.naive_utc();
        NaiveDateTime::new(self.next_date(naive.date()), naive.time()).and_utc()
    }

    /// First day of the calendar period containing `date`.
    pub fn period_start(self, date: NaiveDate, week_start: Weekday) -> NaiveDate {
        match self {
            TimeUnit::Day => date,
            TimeUnit::Week => {
                let delta = days_since_week_start(date.weekday(), week_start);
                date - Duration::days(delta)
            }
            TimeUnit::Month => date.with_day(1).unwrap_or(date),
            TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

/// Half-open `[start, end)` span of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// The calendar day/week/month/year of `now`, with boundaries at local midnight in `now`'s
    /// zone.
    pub fn calendar<Tz: TimeZone>(unit: TimeUnit, now: &DateTime<Tz>, week_start: Weekday) -> Self {
        let start_day = unit.period_start(now.date_naive(), week_start);
        let end_day = unit.next_date(start_day);
        let zone = now.timezone();
        Self {
            start: local_midnight(&zone, start_day),
            end: local_midnight(&zone, end_day),
        }
    }

    /// The trailing `days` ending at `now`.
    pub fn trailing(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }
}

/// Whole days elapsed between two instants, truncated toward zero.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days()
}

fn local_midnight<Tz: TimeZone>(zone: &Tz, day: NaiveDate) -> DateTime<Utc> {
    wall_clock_to_utc(zone, day.and_time(NaiveTime::MIN))
}

fn days_since_week_start(day: Weekday, week_start: Weekday) -> i64 {
    let current = i64::from(day.num_days_from_monday());
    let start = i64::from(week_start.num_days_from_monday());
    (current - start).rem_euclid(7)
}

fn shift_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    clamp_day(date, year, month)
}

fn shift_year(date: NaiveDate) -> NaiveDate {
    clamp_day(date, date.year() + 1, date.month())
}

fn clamp_day(date: NaiveDate, year: i32, month: u32) -> NaiveDate {
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_steps_clamp_to_month_end() {
        let monthly = TimeUnit::Month;
        assert_eq!(monthly.next_date(date(2025, 1, 31)), date(2025, 2, 28));
        assert_eq!(monthly.next_date(date(2024, 1, 31)), date(2024, 2, 29));
        assert_eq!(monthly.next_date(date(2025, 12, 15)), date(2026, 1, 15));

        let yearly = TimeUnit::Year;
        assert_eq!(yearly.next_date(date(2024, 2, 29)), date(2025, 2, 28));
    }

    #[test]
    fn week_anchor_respects_week_start() {
        let weekly = TimeUnit::Week;
        // 2025-06-11 is a Wednesday.
        assert_eq!(
            weekly.period_start(date(2025, 6, 11), Weekday::Sun),
            date(2025, 6, 8)
        );
        assert_eq!(
            weekly.period_start(date(2025, 6, 11), Weekday::Mon),
            date(2025, 6, 9)
        );
        assert_eq!(
            weekly.period_start(date(2025, 6, 8), Weekday::Sun),
            date(2025, 6, 8)
        );
    }

    #[test]
    fn calendar_window_uses_local_midnight() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2025, 6, 11, 0, 30, 0).unwrap();
        let window = PeriodWindow::calendar(TimeUnit::Month, &now, Weekday::Sun);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 5, 31, 22, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 6, 30, 22, 0, 0).unwrap());
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn days_between_truncates() {
        let a = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 1, 8, 11, 59, 0).unwrap();
        assert_eq!(days_between(a, b), 6);
    }
}
