//! Resolves date specifiers such as `today` or `2026-02-10,2026-02-12` into concrete,
//! timezone-aware day windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

use super::clock::Clock;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeRangeError {
    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),
    #[error(
        "invalid date format '{0}', expected today, yesterday, YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD"
    )]
    InvalidDateFormat(String),
}

/// Closed window `[start, end]` in the report timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeRange {
    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, TimeRangeError> {
    name.parse::<Tz>()
        .map_err(|_| TimeRangeError::InvalidTimezone(name.to_string()))
}

/// Returns the calendar day containing `moment` in `tz`, from its first to its last nanosecond.
pub fn day_range<T: TimeZone>(moment: &DateTime<T>, tz: Tz) -> TimeRange {
    let date = moment.with_timezone(&tz).date_naive();
    dates_range(date, date, tz)
}

/// Parses a date specifier. Supported values are:
/// - `today`
/// - `yesterday`
/// - `2026-02-11` for a single day
/// - `2026-02-10,2026-02-12` for the first date's midnight up to the end of the second date
pub fn resolve_range(
    specifier: &str,
    timezone: &str,
    clock: &dyn Clock,
) -> Result<TimeRange, TimeRangeError> {
    let tz = parse_timezone(timezone)?;
    let invalid = || TimeRangeError::InvalidDateFormat(specifier.to_string());

    match specifier.trim() {
        "today" => Ok(day_range(&clock.time(), tz)),
        "yesterday" => {
            let yesterday = clock
                .time()
                .with_timezone(&tz)
                .date_naive()
                .pred_opt()
                .ok_or_else(invalid)?;
            Ok(dates_range(yesterday, yesterday, tz))
        }
        value if value.contains(',') => {
            let parts = value.split(',').collect::<Vec<_>>();
            let [start, end] = parts.as_slice() else {
                return Err(invalid());
            };
            let start = parse_date(start).ok_or_else(invalid)?;
            let end = parse_date(end).ok_or_else(invalid)?;
            if end < start {
                return Err(invalid());
            }
            Ok(dates_range(start, end, tz))
        }
        value => {
            let date = parse_date(value).ok_or_else(invalid)?;
            Ok(dates_range(date, date, tz))
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn dates_range(start: NaiveDate, end: NaiveDate, tz: Tz) -> TimeRange {
    TimeRange {
        start: start_of_day(start, tz),
        end: end_of_day(end, tz),
    }
}

/// Local midnight. When midnight falls into a DST gap the first valid instant of the day is used.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=24 * 60)
        .find_map(|minutes| {
            tz.from_local_datetime(&(midnight + Duration::minutes(minutes)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Last nanosecond of the local day.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let last = date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::nanoseconds(1);
    tz.from_local_datetime(&last)
        .latest()
        .or_else(|| {
            date.succ_opt()
                .map(|next| start_of_day(next, tz) - Duration::nanoseconds(1))
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&last))
}
