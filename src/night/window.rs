//! Night window calculation: the last third of the night before Fajr.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::parse::{AnchoredInstant, next_day, parse_time_of_day};
use crate::constants::{LONG_NIGHT_MINUTES, SHORT_WINDOW_MINUTES};
use crate::error::QiyamError;

/// Which prayer anchors the start of the night.
///
/// The end of the night is always Fajr, whatever the convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// Maghrib → Fajr
    #[default]
    Standard,
    /// Isha → Fajr
    Alternative,
}

impl Convention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::Standard => "standard",
            Convention::Alternative => "alternative",
        }
    }

    /// Label of the prayer the night starts at.
    pub fn night_start_label(&self) -> &'static str {
        match self {
            Convention::Standard => "Maghrib",
            Convention::Alternative => "Isha",
        }
    }
}

impl FromStr for Convention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "maghrib" => Ok(Convention::Standard),
            "alternative" | "isha" => Ok(Convention::Alternative),
            other => Err(format!(
                "unknown convention '{other}' (expected 'standard' or 'alternative')"
            )),
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The computed Qiyam window for one night.
///
/// `start..end` is the last third of the night (`end` is Fajr).
/// `night_start` is the convention's anchor and is kept for the progress
/// indicator, which spans the whole night.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightWindow {
    pub start: AnchoredInstant,
    pub end: AnchoredInstant,
    pub night_start: AnchoredInstant,
    pub night_duration_minutes: i64,
    pub last_third_minutes: i64,
    pub middle_of_night: AnchoredInstant,
    pub convention: Convention,
}

impl NightWindow {
    pub fn is_valid(&self) -> bool {
        self.night_duration_minutes > 0
    }
}

/// Round half toward positive infinity.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Compute the window from raw Maghrib, Isha and Fajr strings anchored to `base_date`.
///
/// Fajr is moved to the next day when its clock time is not after Maghrib. Under
/// the alternative convention Isha is moved the same way when it falls before
/// Maghrib. The last-third boundary is measured back from Fajr, so rounding error
/// lands on the start of the window rather than on Fajr.
///
/// A night of zero or negative length is still returned; [`validate_window`]
/// flags it.
pub fn compute_window(
    maghrib: &str,
    isha: &str,
    fajr: &str,
    convention: Convention,
    base_date: NaiveDate,
    tz: Tz,
) -> Result<NightWindow, QiyamError> {
    let maghrib = parse_time_of_day(maghrib, base_date, tz)?;
    let isha = parse_time_of_day(isha, base_date, tz)?;
    let mut fajr = parse_time_of_day(fajr, base_date, tz)?;

    if fajr <= maghrib {
        fajr = next_day(&fajr);
    }

    let night_start = match convention {
        Convention::Standard => maghrib,
        Convention::Alternative if isha < maghrib => next_day(&isha),
        Convention::Alternative => isha,
    };

    let night_span = fajr - night_start;
    let night_duration_minutes = round_half_up(night_span.num_milliseconds() as f64 / 60_000.0);
    let last_third_minutes = round_half_up(night_duration_minutes as f64 / 3.0);

    Ok(NightWindow {
        start: fajr - Duration::minutes(last_third_minutes),
        end: fajr,
        night_start,
        night_duration_minutes,
        last_third_minutes,
        middle_of_night: night_start + night_span / 2,
        convention,
    })
}

/// Non-fatal diagnostics about a computed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowWarning {
    InvalidDuration,
    UnusuallyLong,
    ShortWindow,
}

impl fmt::Display for WindowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WindowWarning::InvalidDuration => "Invalid night duration",
            WindowWarning::UnusuallyLong => "Unusually long night duration (>18 hours)",
            WindowWarning::ShortWindow => "Short Qiyam window (<1 hour)",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowValidation {
    pub valid: bool,
    pub warning: Option<WindowWarning>,
}

/// Check a window for implausible durations. The first matching rule wins.
pub fn validate_window(window: &NightWindow) -> WindowValidation {
    let (valid, warning) = if window.night_duration_minutes <= 0 {
        (false, Some(WindowWarning::InvalidDuration))
    } else if window.night_duration_minutes > LONG_NIGHT_MINUTES {
        (true, Some(WindowWarning::UnusuallyLong))
    } else if window.last_third_minutes < SHORT_WINDOW_MINUTES {
        (true, Some(WindowWarning::ShortWindow))
    } else {
        (true, None)
    };

    WindowValidation { valid, warning }
}
