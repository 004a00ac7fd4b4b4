//! Runs the watch loop end to end under a simulated clock with a canned provider.
//!
//! The simulated time source is process-wide, so this file holds a single test.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use qiyam::QiyamError;
use qiyam::config::SettingsStore;
use qiyam::core::{Core, CoreParams};
use qiyam::provider::{DayTimings, TimingsProvider, TimingsRequest};
use qiyam::signals::SignalState;
use qiyam::time_source::{self, SimulatedTimeSource};

/// London winter timings where Fajr on the 16th is a minute later than the day before.
struct DriftingTimings {
    calls: Arc<AtomicU32>,
}

impl TimingsProvider for DriftingTimings {
    fn fetch_timings(&self, request: &TimingsRequest) -> Result<DayTimings, QiyamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fajr = if request.date == NaiveDate::from_ymd_opt(2025, 1, 16) {
            "05:01"
        } else {
            "05:00"
        };
        let timings: BTreeMap<String, String> = [
            ("Fajr", fajr),
            ("Sunrise", "07:55"),
            ("Dhuhr", "12:10"),
            ("Asr", "14:15"),
            ("Maghrib", "18:00"),
            ("Isha", "19:30"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), format!("{v} (GMT)")))
        .collect();

        Ok(DayTimings {
            date: request
                .date
                .unwrap_or_else(|| NaiveDate::from_ymd_opt(2025, 1, 16).unwrap()),
            timings,
            timezone: Some("Europe/London".to_string()),
            method_name: Some("Muslim World League".to_string()),
        })
    }
}

#[test]
fn test_simulated_night_crosses_drifting_fajr_and_loads_next_night() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(
        &path,
        "latitude = 51.5074\nlongitude = -0.1278\nmethod_id = 3\nconvention = \"standard\"\ntime_format = \"24h\"\n",
    )
    .unwrap();
    let store = SettingsStore::load_from_path(&path).unwrap();
    let tz = store.get().timezone();
    assert_eq!(tz, chrono_tz::Europe::London);

    // 04:40 is inside the last third of the night that began on the 15th (01:20 → 05:00)
    let start = time_source::parse_datetime_in_tz("2025-01-16 04:40:00", tz)
        .unwrap()
        .with_timezone(&chrono::Local);
    let end = time_source::parse_datetime_in_tz("2025-01-16 05:30:00", tz)
        .unwrap()
        .with_timezone(&chrono::Local);
    time_source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, 3600.0)));

    let calls = Arc::new(AtomicU32::new(0));
    let core = Core::new(CoreParams {
        provider: Arc::new(DriftingTimings {
            calls: Arc::clone(&calls),
        }),
        store,
        signal_state: SignalState::detached(),
        debug_enabled: false,
    });

    let report = core.execute().unwrap();

    assert_eq!(report.phases, vec!["ACTIVE", "ENDED", "PENDING"]);
    assert_eq!(report.fetches_started, 2);
    assert_eq!(report.fetches_stored, 2);
    assert_eq!(report.discarded, 0);
    assert_eq!(report.last_error, None);
    // At 05:00 today's Fajr (05:01) is still ahead, so the second resolve reads both days
    // before settling on today's timings
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
