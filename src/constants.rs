//! Application-wide constants: defaults, cadences, provider endpoints and limits.

use std::time::Duration;

// # Settings defaults (New York, Muslim World League)
pub const DEFAULT_LATITUDE: f64 = 40.7128;
pub const DEFAULT_LONGITUDE: f64 = -74.0060;
pub const DEFAULT_METHOD_ID: u32 = 2;

pub const MINIMUM_LATITUDE: f64 = -90.0;
pub const MAXIMUM_LATITUDE: f64 = 90.0;
pub const MINIMUM_LONGITUDE: f64 = -180.0;
pub const MAXIMUM_LONGITUDE: f64 = 180.0;
pub const MAXIMUM_METHOD_ID: u32 = 99;

pub const SETTINGS_DIR_NAME: &str = "qiyam";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

// # Window validation thresholds (minutes)
pub const LONG_NIGHT_MINUTES: i64 = 18 * 60;
pub const SHORT_WINDOW_MINUTES: i64 = 60;

// # Refresh cadence
pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

// # Fetch policy
pub const MAX_FETCH_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);
pub const CACHE_FRESH_FOR: Duration = Duration::from_secs(5 * 60);
pub const CACHE_EVICT_AFTER: Duration = Duration::from_secs(60 * 60);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

// # Place search
pub const SEARCH_MIN_QUERY_CHARS: usize = 2;
pub const SEARCH_MAX_RESULTS: usize = 5;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const SETTINGS_RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

// # Provider endpoints
pub const ALADHAN_BASE_URL: &str = "https://api.aladhan.com/v1";
pub const PLACE_SEARCH_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const REVERSE_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

// # Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
