//! External data providers: prayer timings, place search and timezone lookup.
//!
//! - [`aladhan`]: HTTP client for the daily prayer-time provider
//! - [`geocoding`]: place search, reverse geocoding and the search debouncer
//! - [`fetch`]: per-key fetch state machine with caching and retry backoff
//! - [`timezone`]: coordinate → IANA timezone lookup and system timezone detection

pub mod aladhan;
pub mod fetch;
pub mod geocoding;
pub mod timezone;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::QiyamError;

pub use aladhan::AladhanClient;
pub use fetch::{FetchCache, FetchKey, FetchState};

/// Prayer labels reported by the time-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrayerLabel {
    Imsak,
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Sunset,
    Maghrib,
    Isha,
    Midnight,
}

impl PrayerLabel {
    pub const ALL: [PrayerLabel; 9] = [
        PrayerLabel::Imsak,
        PrayerLabel::Fajr,
        PrayerLabel::Sunrise,
        PrayerLabel::Dhuhr,
        PrayerLabel::Asr,
        PrayerLabel::Sunset,
        PrayerLabel::Maghrib,
        PrayerLabel::Isha,
        PrayerLabel::Midnight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerLabel::Imsak => "Imsak",
            PrayerLabel::Fajr => "Fajr",
            PrayerLabel::Sunrise => "Sunrise",
            PrayerLabel::Dhuhr => "Dhuhr",
            PrayerLabel::Asr => "Asr",
            PrayerLabel::Sunset => "Sunset",
            PrayerLabel::Maghrib => "Maghrib",
            PrayerLabel::Isha => "Isha",
            PrayerLabel::Midnight => "Midnight",
        }
    }

    /// Whether this label belongs to the night that follows Maghrib, so its
    /// clock time may fall on the next calendar day.
    pub fn is_nocturnal(&self) -> bool {
        matches!(
            self,
            PrayerLabel::Isha
                | PrayerLabel::Midnight
                | PrayerLabel::Imsak
                | PrayerLabel::Fajr
                | PrayerLabel::Sunrise
        )
    }
}

/// One day's raw timings as returned by the provider.
///
/// `date` is the date the provider was queried for, which is not always the
/// date the night belongs to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayTimings {
    pub date: NaiveDate,
    pub timings: BTreeMap<String, String>,
    pub timezone: Option<String>,
    pub method_name: Option<String>,
}

impl DayTimings {
    pub fn get(&self, label: PrayerLabel) -> Option<&str> {
        self.timings.get(label.as_str()).map(String::as_str)
    }

    /// Maghrib, falling back to Sunset.
    pub fn maghrib(&self) -> Result<&str, QiyamError> {
        self.get(PrayerLabel::Maghrib)
            .or_else(|| self.get(PrayerLabel::Sunset))
            .ok_or(QiyamError::MissingField { field: "Maghrib" })
    }

    pub fn require(&self, label: PrayerLabel) -> Result<&str, QiyamError> {
        self.get(label).ok_or(QiyamError::MissingField {
            field: label.as_str(),
        })
    }
}

/// Query for one calendar day of timings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingsRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub method_id: u32,
    pub date: Option<NaiveDate>,
}

/// Source of daily prayer timings.
#[cfg_attr(test, mockall::automock)]
pub trait TimingsProvider: Send + Sync {
    fn fetch_timings(&self, request: &TimingsRequest) -> Result<DayTimings, QiyamError>;
}
