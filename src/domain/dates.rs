use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;
use thiserror::Error;

pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date key `{0}`, expected YYYY-MM-DD")]
pub struct DateKeyError(pub String);

/// Canonical `YYYY-MM-DD` key for a calendar day.
pub fn to_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Result<NaiveDate, DateKeyError> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).map_err(|_| DateKeyError(key.to_string()))
}

/// The calendar day `now` falls on in the local time zone.
pub fn today_of<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

pub fn today() -> NaiveDate {
    today_of(&Local::now())
}

pub fn today_key() -> String {
    to_date_key(today())
}

/// `None` when the result falls outside the representable calendar.
pub fn checked_add_days(date: NaiveDate, n: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(n)?)
}

/// Like [`checked_add_days`], clamped to the first or last representable day.
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    checked_add_days(date, n).unwrap_or(if n < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Most recent Sunday at or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_sunday()))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonthCell {
    Blank,
    Day { day: u32, date: NaiveDate, is_today: bool },
}

impl MonthCell {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            MonthCell::Blank => None,
            MonthCell::Day { date, .. } => Some(*date),
        }
    }
}

/// Leading blanks for the weekday of day 1, then one cell per day.
/// `month` is 1-based. An invalid year/month yields an empty grid.
pub fn month_grid(year: i32, month: u32, today: NaiveDate) -> Vec<MonthCell> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else { return Vec::new() };
    let offset = first.weekday().num_days_from_sunday() as usize;
    let mut cells = vec![MonthCell::Blank; offset];
    cells.extend(first.iter_days().take(days_in_month(year, month) as usize).map(|date| MonthCell::Day {
        day: date.day(),
        date,
        is_today: date == today,
    }));
    cells
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES.get(month.wrapping_sub(1) as usize).copied().unwrap_or("")
}

fn short_month(month: u32) -> &'static str {
    let name = month_name(month);
    name.get(..3).unwrap_or(name)
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}

/// `"18 Oct"`
pub fn short_date(date: NaiveDate) -> String {
    format!("{} {}", date.day(), short_month(date.month()))
}

/// `"Today"`, `"Tomorrow"`, `"Yesterday"`, else `"Mon 19 Oct"`.
pub fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => format!("{} {}", weekday_label(date), short_date(date)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_start_is_previous_or_same_sunday() {
        // 2026-10-18 is a Sunday
        assert_eq!(week_start(d(2026, 10, 18)), d(2026, 10, 18));
        assert_eq!(week_start(d(2026, 10, 24)), d(2026, 10, 18));
        assert_eq!(week_start(d(2026, 11, 1)), d(2026, 11, 1));
        assert_eq!(week_start(d(2027, 1, 2)), d(2026, 12, 27));
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 12), 31);
        assert_eq!(add_days(d(2026, 1, 31), 1), d(2026, 2, 1));
        assert_eq!(add_days(d(2028, 2, 28), 1), d(2028, 2, 29));
    }

    #[test]
    fn day_arithmetic_stops_at_the_calendar_edges() {
        assert_eq!(checked_add_days(NaiveDate::MAX, 1), None);
        assert_eq!(checked_add_days(NaiveDate::MIN, -1), None);
        assert_eq!(checked_add_days(d(2026, 10, 19), i64::MAX), None);
        assert_eq!(add_days(NaiveDate::MAX, 7), NaiveDate::MAX);
        assert_eq!(add_days(NaiveDate::MIN, -7), NaiveDate::MIN);
        assert_eq!(week_start(NaiveDate::MIN), NaiveDate::MIN);
    }

    #[test]
    fn grid_for_month_starting_on_sunday_has_no_blanks() {
        // March 2026 starts on a Sunday and has 31 days
        let grid = month_grid(2026, 3, d(2026, 3, 10));
        assert!(matches!(grid[0], MonthCell::Day { day: 1, .. }));
        assert_eq!(grid.iter().filter(|c| c.date().is_some()).count(), 31);
        assert_eq!(grid.len(), 31);
        assert_eq!(grid.iter().filter(|c| matches!(c, MonthCell::Day { is_today: true, .. })).count(), 1);
    }

    #[test]
    fn grid_for_month_starting_on_saturday_has_six_blanks() {
        // August 2026 starts on a Saturday
        let grid = month_grid(2026, 8, d(2026, 10, 19));
        let blanks = grid.iter().take_while(|c| **c == MonthCell::Blank).count();
        assert_eq!(blanks, 6);
        assert_eq!(grid.len(), 6 + 31);
    }

    #[test]
    fn relative_labels() {
        let today = d(2026, 10, 19);
        assert_eq!(relative_day_label(today, today), "Today");
        assert_eq!(relative_day_label(d(2026, 10, 20), today), "Tomorrow");
        assert_eq!(relative_day_label(d(2026, 10, 18), today), "Yesterday");
        assert_eq!(relative_day_label(d(2026, 10, 23), today), "Fri 23 Oct");
        assert_eq!(short_date(d(2026, 9, 6)), "6 Sep");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(parse_date_key("2026-13-01").is_err());
        assert!(parse_date_key("yesterday").is_err());
        assert_eq!(parse_date_key("2026-02-03"), Ok(d(2026, 2, 3)));
    }

    proptest! {
        #[test]
        fn date_key_round_trips(days in -200_000i64..200_000) {
            let date = add_days(d(2000, 1, 1), days);
            let key = to_date_key(date);
            let reparsed = parse_date_key(&key).unwrap();
            prop_assert_eq!(to_date_key(reparsed), key);
        }
    }
}
