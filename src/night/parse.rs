//! Time-of-day parsing and calendar anchoring.
//!
//! Provider timings look like `"05:12"` or `"05:12 (EET)"`. Parsing keeps the
//! first whitespace-separated token and anchors it to a calendar date in the
//! location's timezone. Day rollover is decided by callers, never here.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::QiyamError;

/// A time-of-day resolved against a calendar date, at minute resolution.
pub type AnchoredInstant = DateTime<Tz>;

static CLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{1,2})$").expect("static clock pattern compiles"));

/// Parse the clock part of a provider string into a `NaiveTime` with seconds zeroed.
pub fn parse_clock(raw: &str) -> Result<NaiveTime, QiyamError> {
    let token = raw.split_whitespace().next().unwrap_or_default();
    let captures = CLOCK_PATTERN
        .captures(token)
        .ok_or_else(|| QiyamError::malformed(raw))?;

    let hour: u32 = captures[1].parse().map_err(|_| QiyamError::malformed(raw))?;
    let minute: u32 = captures[2].parse().map_err(|_| QiyamError::malformed(raw))?;

    if hour > 23 || minute > 59 {
        return Err(QiyamError::malformed(raw));
    }

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| QiyamError::malformed(raw))
}

/// Parse `raw` and anchor it to `anchor_date` in `tz`.
pub fn parse_time_of_day(
    raw: &str,
    anchor_date: NaiveDate,
    tz: Tz,
) -> Result<AnchoredInstant, QiyamError> {
    let time = parse_clock(raw)?;
    localize(tz, anchor_date.and_time(time)).ok_or_else(|| QiyamError::malformed(raw))
}

/// Resolve a wall-clock time in `tz`.
///
/// Ambiguous times (DST fold) take the earlier instant. Times inside a DST
/// gap move forward by the gap, one hour at most.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<AnchoredInstant> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(truncate_to_minute)
}

/// Same wall-clock time on the next calendar day.
pub fn next_day(instant: &AnchoredInstant) -> AnchoredInstant {
    let tz = instant.timezone();
    instant
        .naive_local()
        .checked_add_days(Days::new(1))
        .and_then(|naive| localize(tz, naive))
        .unwrap_or_else(|| *instant + chrono::Duration::days(1))
}

fn truncate_to_minute(dt: AnchoredInstant) -> AnchoredInstant {
    dt.with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_strips_provider_annotation() {
        let anchored = parse_time_of_day("05:12 (EET)", date(2025, 3, 1), chrono_tz::UTC).unwrap();
        assert_eq!(anchored.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-03-01 05:12:00");
    }

    #[test]
    fn test_parse_accepts_single_digit_fields() {
        let time = parse_clock("5:7").unwrap();
        assert_eq!((time.hour(), time.minute(), time.second()), (5, 7, 0));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for raw in ["", "  ", "25:00", "12:60", "12", "12:30:00", "ab:cd", "123:00", "-1:30"] {
            assert!(
                matches!(parse_clock(raw), Err(QiyamError::MalformedTime { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_dst_gap_moves_forward() {
        // 2025-03-09 02:30 does not exist in New York
        let anchored = parse_time_of_day("02:30", date(2025, 3, 9), New_York).unwrap();
        assert_eq!(anchored.format("%H:%M").to_string(), "03:30");
    }

    #[test]
    fn test_next_day_keeps_wall_clock_across_dst() {
        let before = parse_time_of_day("05:00", date(2025, 3, 8), New_York).unwrap();
        let after = next_day(&before);
        assert_eq!(after.format("%Y-%m-%d %H:%M").to_string(), "2025-03-09 05:00");
        assert_eq!((after - before).num_hours(), 23);
    }
}
