//! Day anchoring: choose which calendar day's timings describe "tonight".
//!
//! A provider reports timings per calendar day, but a night spans two. Before
//! today's Fajr we are still inside the night that began yesterday evening, so
//! yesterday's timings are the relevant ones.

use chrono::{Days, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use super::parse::{AnchoredInstant, next_day, parse_time_of_day};
use super::window::{Convention, NightWindow, compute_window};
use crate::error::QiyamError;
use crate::provider::{DayTimings, PrayerLabel, TimingsProvider, TimingsRequest};

/// Provider data for one night, anchored to the date the night started.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNight {
    pub base_date: NaiveDate,
    pub tz: Tz,
    pub timings: DayTimings,
}

/// One anchored entry of the night's schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub label: PrayerLabel,
    pub at: AnchoredInstant,
}

impl ResolvedNight {
    pub fn maghrib(&self) -> Result<&str, QiyamError> {
        self.timings.maghrib()
    }

    /// Compute the Qiyam window for this night.
    pub fn window(&self, convention: Convention) -> Result<NightWindow, QiyamError> {
        compute_window(
            self.maghrib()?,
            self.timings.require(PrayerLabel::Isha)?,
            self.timings.require(PrayerLabel::Fajr)?,
            convention,
            self.base_date,
            self.tz,
        )
    }

    /// Every reported prayer time, anchored and in chronological order.
    ///
    /// Night-time labels earlier than Maghrib move to the next day. Isha equal to
    /// Maghrib stays on the base date while every other night-time label moves.
    pub fn schedule(&self) -> Result<Vec<ScheduleEntry>, QiyamError> {
        let maghrib = parse_time_of_day(self.maghrib()?, self.base_date, self.tz)?;

        let mut entries = Vec::new();
        for label in PrayerLabel::ALL {
            if label == PrayerLabel::Sunset && self.timings.get(PrayerLabel::Maghrib).is_some() {
                continue;
            }
            let Some(raw) = self.timings.get(label) else {
                continue;
            };
            let mut at = parse_time_of_day(raw, self.base_date, self.tz)?;
            // Same rollover as the window calculator: Isha at Maghrib stays put, Fajr does not
            let rolls = match label {
                PrayerLabel::Isha => at < maghrib,
                _ => label.is_nocturnal() && at <= maghrib,
            };
            if rolls {
                at = next_day(&at);
            }
            entries.push(ScheduleEntry { label, at });
        }

        entries.sort_by_key(|entry| entry.at);
        Ok(entries)
    }
}

/// Picks the provider response relevant to the current night.
pub struct DayAnchoringResolver<'a> {
    provider: &'a dyn TimingsProvider,
    latitude: f64,
    longitude: f64,
    method_id: u32,
    tz: Tz,
}

impl<'a> DayAnchoringResolver<'a> {
    pub fn new(
        provider: &'a dyn TimingsProvider,
        latitude: f64,
        longitude: f64,
        method_id: u32,
        tz: Tz,
    ) -> Self {
        Self {
            provider,
            latitude,
            longitude,
            method_id,
            tz,
        }
    }

    fn fetch(&self, date: NaiveDate) -> Result<DayTimings, QiyamError> {
        self.provider.fetch_timings(&TimingsRequest {
            latitude: self.latitude,
            longitude: self.longitude,
            method_id: self.method_id,
            date: Some(date),
        })
    }

    /// Resolve tonight's timings for wall-clock `now`.
    pub fn resolve(&self, now: AnchoredInstant) -> Result<ResolvedNight, QiyamError> {
        let now = now.with_timezone(&self.tz);
        let today = now.date_naive();

        let today_timings = self.fetch(today)?;
        let today_fajr =
            parse_time_of_day(today_timings.require(PrayerLabel::Fajr)?, today, self.tz)?;

        let (base_date, timings) = if now < today_fajr {
            let yesterday = today
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| QiyamError::unavailable("date out of range"))?;
            let yesterday_timings = self.fetch(yesterday)?;

            // Fajr drifts day to day, so yesterday's night can end before today's Fajr time
            let yesterday_fajr =
                parse_time_of_day(yesterday_timings.require(PrayerLabel::Fajr)?, today, self.tz)?;
            if now >= yesterday_fajr {
                (today, today_timings)
            } else {
                (yesterday, yesterday_timings)
            }
        } else {
            (today, today_timings)
        };

        // Fail early so a response without Maghrib or Sunset never reaches the calculator
        timings.maghrib()?;

        Ok(ResolvedNight {
            base_date,
            tz: self.tz,
            timings,
        })
    }
}
