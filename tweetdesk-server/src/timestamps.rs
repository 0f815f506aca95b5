//! Timestamp formats used by the scraped data.
//!
//! Tweets arrive with Twitter's `Wed Oct 10 20:19:24 +0000 2018` format, which
//! does not sort as text. Every time-window query runs against a normalized
//! UTC column written in [`STORAGE_FORMAT`] instead.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use thiserror::Error;

/// Format of the `created_at` field in scraped tweets and user profiles.
pub const TWITTER_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Sortable UTC format for normalized columns.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BEIJING_DISPLAY_FORMAT: &str = "%Y年%m月%d日 %H:%M:%S";

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("invalid timestamp '{input}': {source}")]
    Invalid {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("local time {0} does not exist in Asia/Shanghai")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("date out of range")]
    OutOfRange,
}

pub fn parse_twitter_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_str(input.trim(), TWITTER_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimestampError::Invalid {
            input: input.to_string(),
            source,
        })
}

pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

pub fn parse_storage(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDateTime::parse_from_str(input.trim(), STORAGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| TimestampError::Invalid {
            input: input.to_string(),
            source,
        })
}

/// Parse a user-supplied range bound.
///
/// Accepts either a bare `YYYY-MM-DD` date, which expands to the first or last
/// second of that day depending on `end_of_day`, or the full storage format.
pub fn parse_range_bound(input: &str, end_of_day: bool) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        }
        .ok_or(TimestampError::OutOfRange)?;
        return Ok(date.and_time(time).and_utc());
    }
    parse_storage(trimmed)
}

/// Day prefix (`Mon Sep 23`) matching the legacy `CreateTime` column.
pub fn legacy_day_prefix(date: NaiveDate) -> String {
    date.format("%a %b %d").to_string()
}

/// UTC half-open range `[start, end)` covering the Asia/Shanghai calendar
/// days from `days_back` days before `now` through the end of today.
pub fn shanghai_day_bounds(
    now: DateTime<Utc>,
    days_back: u64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), TimestampError> {
    let today = now.with_timezone(&Shanghai).date_naive();
    let first_day = today
        .checked_sub_days(Days::new(days_back))
        .ok_or(TimestampError::OutOfRange)?;
    let after_today = today
        .checked_add_days(Days::new(1))
        .ok_or(TimestampError::OutOfRange)?;

    Ok((shanghai_midnight(first_day)?, shanghai_midnight(after_today)?))
}

fn shanghai_midnight(date: NaiveDate) -> Result<DateTime<Utc>, TimestampError> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).ok_or(TimestampError::OutOfRange)?;
    let naive = date.and_time(midnight);
    Shanghai
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(TimestampError::NonexistentLocalTime(naive))
}

/// Render an instant as Beijing wall-clock time for the digest page.
pub fn beijing_display(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Shanghai)
        .format(BEIJING_DISPLAY_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_twitter_timestamp() {
        let dt = parse_twitter_timestamp("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(to_storage(&dt), "2018-10-10 20:19:24");
    }

    #[test]
    fn test_parse_twitter_timestamp_with_offset() {
        let dt = parse_twitter_timestamp("Wed Oct 10 20:19:24 +0800 2018").unwrap();
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_twitter_timestamp_rejects_iso() {
        let err = parse_twitter_timestamp("2018-10-10T20:19:24Z").unwrap_err();
        assert!(err.to_string().contains("2018-10-10T20:19:24Z"));
    }

    #[test]
    fn test_storage_round_trip() {
        let dt = parse_storage("2024-03-01 08:30:00").unwrap();
        assert_eq!(to_storage(&dt), "2024-03-01 08:30:00");
    }

    #[test]
    fn test_range_bounds_expand_bare_dates() {
        let start = parse_range_bound("2024-03-01", false).unwrap();
        let end = parse_range_bound("2024-03-01", true).unwrap();
        assert_eq!(to_storage(&start), "2024-03-01 00:00:00");
        assert_eq!(to_storage(&end), "2024-03-01 23:59:59");
        assert!(parse_range_bound("yesterday", false).is_err());
    }

    #[test]
    fn test_legacy_day_prefix() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 23).unwrap();
        assert_eq!(legacy_day_prefix(date), "Mon Sep 23");
    }

    #[test]
    fn test_shanghai_day_bounds() {
        // 2024-03-01 18:00 UTC is already 2024-03-02 02:00 in Shanghai
        let now = parse_storage("2024-03-01 18:00:00").unwrap();
        let (start, end) = shanghai_day_bounds(now, 1).unwrap();
        assert_eq!(to_storage(&start), "2024-02-29 16:00:00");
        assert_eq!(to_storage(&end), "2024-03-02 16:00:00");
    }

    #[test]
    fn test_beijing_display() {
        let dt = parse_storage("2024-03-01 18:00:00").unwrap();
        assert_eq!(beijing_display(&dt), "2024年03月02日 02:00:00");
    }
}
