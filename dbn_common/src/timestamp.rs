//! Conversions between DBN nanosecond timestamps, `chrono` date-times and
//! `YYYYMMDD` dates used by symbol mappings.
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Sentinel for a timestamp that is not set.
pub const UNDEF_TIMESTAMP: u64 = u64::MAX;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Splits a nanosecond timestamp into whole seconds and leftover nanoseconds.
pub fn ts_to_secs_nanos(ts: u64) -> (i64, u32) {
    ((ts / NANOS_PER_SEC) as i64, (ts % NANOS_PER_SEC) as u32)
}

/// Converts a nanosecond timestamp to a UTC date-time.
///
/// Returns `None` for `UNDEF_TIMESTAMP` and for values outside chrono's range.
pub fn ts_to_datetime(ts: u64) -> Option<DateTime<Utc>> {
    if ts == UNDEF_TIMESTAMP {
        return None;
    }
    let (secs, nanos) = ts_to_secs_nanos(ts);
    DateTime::from_timestamp(secs, nanos)
}

/// Converts a UTC date-time to a nanosecond timestamp. Times before the epoch
/// clamp to zero.
pub fn datetime_to_ts(dt: &DateTime<Utc>) -> u64 {
    dt.timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or(UNDEF_TIMESTAMP)
}

/// `YYYYMMDD` for a date.
pub fn date_to_ymd(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// `YYYYMMDD` for the UTC date containing `ts`. Zero for unset timestamps.
pub fn ts_to_ymd(ts: u64) -> u32 {
    ts_to_datetime(ts)
        .map(|dt| date_to_ymd(dt.date_naive()))
        .unwrap_or(0)
}

/// Parses a `YYYYMMDD` value. Returns `None` for impossible dates.
pub fn ymd_to_date(ymd: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt((ymd / 10_000) as i32, (ymd / 100) % 100, ymd % 100)
}
