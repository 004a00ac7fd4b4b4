//! Persisted user settings.
//!
//! Settings live in a small TOML file, by default
//! `$XDG_CONFIG_HOME/qiyam/settings.toml`:
//!
//! ```toml
//! latitude = 40.7128         # Location latitude (-90 to 90)
//! longitude = -74.006        # Location longitude (-180 to 180)
//! method_id = 2              # Provider calculation method (0-99)
//! convention = "standard"    # Night start: "standard" (Maghrib) or "alternative" (Isha)
//! time_format = "12h"        # Display format: "12h" or "24h"
//! address = "New York, United States"  # Optional label cached from geocoding
//! ```
//!
//! Loading merges the file over the defaults key by key, so a single bad
//! value never costs the user the rest of their settings. Every mutation goes
//! through [`SettingsStore::update`], which saves atomically.

pub mod loading;
pub mod validation;
pub mod watcher;

use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_METHOD_ID};
use crate::night::Convention;
use crate::provider::FetchKey;
use crate::provider::geocoding::coordinate_label;
use crate::provider::timezone::timezone_for;

pub use loading::{get_custom_config_dir, get_settings_path, set_config_dir};
pub use watcher::start_settings_watcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "12h",
            TimeFormat::TwentyFourHour => "24h",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TimeFormat::TwelveHour => TimeFormat::TwentyFourHour,
            TimeFormat::TwentyFourHour => TimeFormat::TwelveHour,
        }
    }
}

impl FromStr for TimeFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "12h" | "12" => Ok(TimeFormat::TwelveHour),
            "24h" | "24" => Ok(TimeFormat::TwentyFourHour),
            other => anyhow::bail!("Invalid time format '{other}' (expected 12h or 24h)"),
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User preferences that survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub latitude: f64,
    pub longitude: f64,
    pub method_id: u32,
    pub convention: Convention,
    pub time_format: TimeFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            method_id: DEFAULT_METHOD_ID,
            convention: Convention::default(),
            time_format: TimeFormat::default(),
            address: None,
        }
    }
}

impl Settings {
    /// Cache key for the timings these settings need.
    pub fn fetch_key(&self) -> FetchKey {
        FetchKey::new(self.latitude, self.longitude, self.method_id)
    }

    /// IANA timezone of the configured location.
    pub fn timezone(&self) -> Tz {
        timezone_for(self.latitude, self.longitude)
    }

    /// Whether the location is still the untouched default.
    pub fn has_default_location(&self) -> bool {
        self.latitude == DEFAULT_LATITUDE && self.longitude == DEFAULT_LONGITUDE
    }

    /// The cached address, or the coordinates when there is none.
    pub fn location_label(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| coordinate_label(self.latitude, self.longitude))
    }

    /// Set new coordinates; the old address label no longer applies.
    pub fn set_location(&mut self, latitude: f64, longitude: f64, address: Option<String>) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.address = address;
    }

    pub fn log_settings(&self) {
        log_block_start!("Loaded settings");
        log_indented!("Location: {}", self.location_label());
        log_indented!(
            "Coordinates: {}",
            coordinate_label(self.latitude, self.longitude)
        );
        log_indented!("Calculation method: {}", self.method_id);
        log_indented!(
            "Convention: {} (night starts at {})",
            self.convention,
            self.convention.night_start_label()
        );
        log_indented!("Time format: {}", self.time_format);
    }
}

/// Owns the settings and the file they persist to.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Settings,
    path: PathBuf,
}

impl SettingsStore {
    /// Load from the configured path, creating the file with defaults on first run.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&get_settings_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let settings = loading::load_or_create(path)?;
        Ok(Self {
            settings,
            path: path.to_path_buf(),
        })
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutate the settings, validate and save. Nothing changes if validation fails.
    pub fn update<F>(&mut self, mutate: F) -> Result<&Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut next = self.settings.clone();
        mutate(&mut next);
        validation::validate_settings(&next)?;
        loading::save_settings(&self.path, &next)?;
        self.settings = next;
        Ok(&self.settings)
    }

    pub fn toggle_time_format(&mut self) -> Result<TimeFormat> {
        let settings = self.update(|s| s.time_format = s.time_format.toggled())?;
        Ok(settings.time_format)
    }

    /// Re-read the file. Returns whether anything changed.
    pub fn reload(&mut self) -> Result<bool> {
        let settings = loading::load_or_create(&self.path)?;
        let changed = settings != self.settings;
        self.settings = settings;
        Ok(changed)
    }
}
