//! Command handlers for the CLI.
//!
//! One-shot commands (`show`, `summary`, `methods`, ...) share [`load_tonight`],
//! which fetches with the same retry backoff the watch loop uses but blocks
//! until it has an answer.

pub mod help;
pub mod locate;
pub mod methods;
pub mod search;
pub mod set;
pub mod show;
pub mod simulate;
pub mod summary;
pub mod watch;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::config::Settings;
use crate::constants::MAX_FETCH_RETRIES;
use crate::error::QiyamError;
use crate::night::{
    NightWindow, ResolvedNight, ScheduleEntry, WindowState, WindowValidation, progress_ratio,
    project_state, validate_window,
};
use crate::provider::TimingsProvider;
use crate::provider::fetch::{backoff_delay, run_fetch};

/// Everything the one-shot commands report about tonight.
#[derive(Debug, Clone, Serialize)]
pub struct Tonight {
    pub location: String,
    pub timezone: String,
    pub date: NaiveDate,
    pub method: Option<String>,
    pub window: NightWindow,
    pub validation: WindowValidation,
    pub state: WindowState,
    pub progress: f64,
    pub schedule: Vec<ScheduleEntry>,
}

/// Resolve tonight's timings, retrying provider failures with backoff.
pub fn fetch_night_blocking(
    provider: &dyn TimingsProvider,
    settings: &Settings,
    now: DateTime<Local>,
) -> Result<ResolvedNight, QiyamError> {
    let key = settings.fetch_key();
    let tz = settings.timezone();

    let mut attempt = 0;
    loop {
        match run_fetch(provider, key, tz, now) {
            Ok(night) => return Ok(night),
            Err(error) if error.is_retryable() && attempt < MAX_FETCH_RETRIES => {
                let delay = backoff_delay(attempt);
                log_debug!(
                    "Fetch failed ({}), retrying in {}s",
                    error,
                    delay.as_secs()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Compute the window, state, progress and schedule for an already resolved night.
pub fn build_tonight(
    night: &ResolvedNight,
    settings: &Settings,
    now: DateTime<Local>,
) -> Result<Tonight, QiyamError> {
    let window = night.window(settings.convention)?;
    let now = now.with_timezone(&night.tz);

    Ok(Tonight {
        location: settings.location_label(),
        timezone: night.tz.name().to_string(),
        date: night.base_date,
        method: night.timings.method_name.clone(),
        validation: validate_window(&window),
        state: project_state(&window, now),
        progress: progress_ratio(&window, now),
        schedule: night.schedule()?,
        window,
    })
}

pub fn load_tonight(
    provider: &dyn TimingsProvider,
    settings: &Settings,
    now: DateTime<Local>,
) -> Result<Tonight, QiyamError> {
    let night = fetch_night_blocking(provider, settings, now)?;
    build_tonight(&night, settings, now)
}

/// Log a domain error the way the user should see it.
pub(crate) fn report_error(error: &QiyamError) {
    log_pipe!();
    log_error!("{}", error.user_message());
    log_indented!("{}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DayTimings, MockTimingsProvider, PrayerLabel};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn day(date: NaiveDate) -> DayTimings {
        let timings: BTreeMap<String, String> = [
            ("Fajr", "05:00"),
            ("Sunrise", "06:20"),
            ("Dhuhr", "12:00"),
            ("Asr", "15:10"),
            ("Maghrib", "18:00"),
            ("Isha", "19:30"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        DayTimings {
            date,
            timings,
            timezone: Some("UTC".to_string()),
            method_name: Some("Test Method".to_string()),
        }
    }

    fn london_settings() -> Settings {
        Settings {
            latitude: 51.5074,
            longitude: -0.1278,
            ..Settings::default()
        }
    }

    #[test]
    fn test_load_tonight_in_the_evening() {
        let mut provider = MockTimingsProvider::new();
        provider
            .expect_fetch_timings()
            .returning(|request| Ok(day(request.date.unwrap())));

        // 20:00 on a winter evening in London, where local time is UTC
        let now = chrono_tz::Europe::London
            .with_ymd_and_hms(2025, 1, 15, 20, 0, 0)
            .unwrap()
            .with_timezone(&Local);
        let tonight = load_tonight(&provider, &london_settings(), now).unwrap();

        assert_eq!(tonight.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(tonight.timezone, "Europe/London");
        assert_eq!(tonight.window.night_duration_minutes, 660);
        assert!(matches!(tonight.state, WindowState::Pending { .. }));
        assert!(tonight.progress > 0.0 && tonight.progress < 0.5);
        let labels: Vec<PrayerLabel> = tonight.schedule.iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                PrayerLabel::Dhuhr,
                PrayerLabel::Asr,
                PrayerLabel::Maghrib,
                PrayerLabel::Isha,
                PrayerLabel::Fajr,
                PrayerLabel::Sunrise,
            ]
        );
        assert_eq!(tonight.method.as_deref(), Some("Test Method"));
    }

    #[test]
    fn test_missing_field_is_not_retried() {
        let mut provider = MockTimingsProvider::new();
        provider.expect_fetch_timings().times(1).returning(|request| {
            let mut timings = day(request.date.unwrap());
            timings.timings.remove("Maghrib");
            Ok(timings)
        });

        let now = chrono_tz::Europe::London
            .with_ymd_and_hms(2025, 1, 15, 20, 0, 0)
            .unwrap()
            .with_timezone(&Local);
        let result = fetch_night_blocking(&provider, &london_settings(), now);
        assert_eq!(result, Err(QiyamError::MissingField { field: "Maghrib" }));
    }

    #[test]
    fn test_provider_failure_is_retried_once_then_succeeds() {
        let mut provider = MockTimingsProvider::new();
        let mut sequence = mockall::Sequence::new();
        provider
            .expect_fetch_timings()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(QiyamError::unavailable("HTTP 503")));
        provider
            .expect_fetch_timings()
            .in_sequence(&mut sequence)
            .returning(|request| Ok(day(request.date.unwrap())));

        let now = chrono_tz::Europe::London
            .with_ymd_and_hms(2025, 1, 15, 20, 0, 0)
            .unwrap()
            .with_timezone(&Local);
        let night = fetch_night_blocking(&provider, &london_settings(), now).unwrap();
        assert_eq!(night.base_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }
}
