//! Settings file location, merge-over-defaults loading and atomic saving.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;

use super::Settings;
use super::validation::sanitize_settings;
use crate::constants::{SETTINGS_DIR_NAME, SETTINGS_FILE_NAME};

/// Settings directory override, set once at startup from `--config`
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

const KNOWN_KEYS: [&str; 6] = [
    "latitude",
    "longitude",
    "method_id",
    "convention",
    "time_format",
    "address",
];

/// Set the settings directory for the current process.
/// Can only be called once; later calls return an error.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Full path of the settings file.
pub fn get_settings_path() -> Result<PathBuf> {
    if let Some(dir) = get_custom_config_dir() {
        return Ok(dir.join(SETTINGS_FILE_NAME));
    }

    let base = dirs::config_dir().context("Could not determine the user configuration directory")?;
    Ok(base.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
}

/// Read settings from `path`, writing defaults there first if the file is missing.
pub fn load_or_create(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        save_settings(path, &settings).context("Failed to create default settings")?;
        log_pipe!();
        log_info!("Created default settings at {}", path.display());
        return Ok(settings);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    Ok(parse_settings(&content))
}

/// Merge the TOML document over the defaults.
///
/// Keys that fail to deserialize or validate fall back to their default with
/// a warning. A document that is not TOML at all yields the full defaults.
pub fn parse_settings(content: &str) -> Settings {
    let table: toml::Table = match toml::from_str(content) {
        Ok(table) => table,
        Err(e) => {
            log_pipe!();
            log_warning!("Settings file is not valid TOML, using defaults");
            log_indented!("{}", e.message());
            return Settings::default();
        }
    };

    let defaults = Settings::default();
    let mut settings = Settings {
        latitude: take(&table, "latitude", defaults.latitude),
        longitude: take(&table, "longitude", defaults.longitude),
        method_id: take(&table, "method_id", defaults.method_id),
        convention: take(&table, "convention", defaults.convention),
        time_format: take(&table, "time_format", defaults.time_format),
        address: take(&table, "address", defaults.address),
    };

    for key in table.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        log_debug!("Ignoring unknown settings key '{}'", key);
    }

    for warning in sanitize_settings(&mut settings) {
        log_pipe!();
        log_warning!("{}", warning);
    }

    settings
}

fn take<T: DeserializeOwned>(table: &toml::Table, key: &str, default: T) -> T {
    let Some(value) = table.get(key) else {
        return default;
    };

    // Integers are accepted where floats are expected
    let value = match (key, value) {
        ("latitude" | "longitude", toml::Value::Integer(i)) => toml::Value::Float(*i as f64),
        _ => value.clone(),
    };

    match value.try_into::<T>() {
        Ok(parsed) => parsed,
        Err(e) => {
            log_pipe!();
            log_warning!("Dropping invalid setting '{}', using default", key);
            log_indented!("{}", e.message());
            default
        }
    }
}

/// Write settings atomically: a temp file in the same directory renamed over the target.
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let dir = path
        .parent()
        .context("Settings path has no parent directory")?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create settings directory {}", dir.display()))?;

    let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(content.as_bytes())
        .context("Failed to write settings")?;
    file.persist(path)
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;

    Ok(())
}
