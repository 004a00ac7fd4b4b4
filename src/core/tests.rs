use super::*;
use crate::night::ResolvedNight;
use crate::provider::{DayTimings, MockTimingsProvider};
use chrono::{NaiveDate, TimeZone};
use std::path::Path;

const LONDON: &str = "latitude = 51.5074\nlongitude = -0.1278\nconvention = \"standard\"\ntime_format = \"24h\"\n";

fn write_settings(path: &Path, method_id: u32) {
    std::fs::write(path, format!("{LONDON}method_id = {method_id}\n")).unwrap();
}

fn winter_day(date: NaiveDate) -> DayTimings {
    DayTimings {
        date,
        timings: [("Fajr", "05:00"), ("Maghrib", "18:00"), ("Isha", "19:30")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        timezone: Some("Europe/London".to_string()),
        method_name: None,
    }
}

fn noon() -> DateTime<Local> {
    chrono_tz::Europe::London
        .with_ymd_and_hms(2025, 1, 16, 12, 0, 0)
        .unwrap()
        .with_timezone(&Local)
}

fn core_with_store(path: &Path) -> Core {
    let mut provider = MockTimingsProvider::new();
    provider
        .expect_fetch_timings()
        .returning(|r| Ok(winter_day(r.date.unwrap())));

    Core::new(CoreParams {
        provider: Arc::new(provider),
        store: SettingsStore::load_from_path(path).unwrap(),
        signal_state: SignalState::detached(),
        debug_enabled: false,
    })
}

#[test]
fn test_switching_back_shows_stale_data_while_refetching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    write_settings(&path, 3);
    let mut core = core_with_store(&path);

    // Method 3 has data loaded at noon
    let first_key = core.store.get().fetch_key();
    core.cache.select(first_key, noon());
    let FetchAction::Start { generation, .. } = core.cache.next_action(noon()) else {
        panic!("expected a fetch to start");
    };
    let night = ResolvedNight {
        base_date: NaiveDate::from_ymd_opt(2025, 1, 16).unwrap(),
        tz: chrono_tz::Europe::London,
        timings: winter_day(NaiveDate::from_ymd_opt(2025, 1, 16).unwrap()),
    };
    core.handle_completion(
        FetchCompletion {
            key: first_key,
            generation,
            result: Ok(night),
        },
        noon(),
    );
    assert!(core.window.is_some());

    // Another method has nothing cached yet
    write_settings(&path, 2);
    core.handle_settings_change(noon() + chrono::Duration::minutes(1));
    assert!(core.window.is_none());

    // Back to method 3 after its data went stale
    write_settings(&path, 3);
    let later = noon() + chrono::Duration::minutes(10);
    core.handle_settings_change(later);

    assert_eq!(core.cache.current(), Some(first_key));
    assert!(!core.cache.is_fresh(later));
    assert!(core.window.is_some());
    assert!(matches!(core.phase, Some(WindowState::Pending { .. })));
    assert!(matches!(
        core.cache.state(),
        Some(FetchState::InFlight { .. })
    ));
}
