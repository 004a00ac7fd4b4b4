//! `set`: update a single settings field.
//!
//! The watch loop picks the change up through the settings watcher, so a
//! running `qiyam watch` applies it without a restart.

use anyhow::Result;
use std::str::FromStr;

use crate::config::validation::{parse_location, validate_method_id};
use crate::config::{Settings, SettingsStore, TimeFormat};
use crate::night::Convention;
use crate::provider::geocoding::{GeocodingClient, coordinate_label};

/// A validated change to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    Location {
        latitude: f64,
        longitude: f64,
        address: Option<String>,
    },
    Method(u32),
    Convention(Convention),
    Format(TimeFormat),
    ToggleFormat,
}

impl SettingChange {
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        match field.to_ascii_lowercase().as_str() {
            "location" | "coordinates" => {
                let (latitude, longitude) = parse_location(value)?;
                Ok(SettingChange::Location {
                    latitude,
                    longitude,
                    address: None,
                })
            }
            "method" | "method_id" => {
                let id: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid method id '{}'", value.trim()))?;
                validate_method_id(id)?;
                Ok(SettingChange::Method(id))
            }
            "convention" => Convention::from_str(value)
                .map(SettingChange::Convention)
                .map_err(anyhow::Error::msg),
            "format" | "time_format" => {
                if value.trim().eq_ignore_ascii_case("toggle") {
                    Ok(SettingChange::ToggleFormat)
                } else {
                    Ok(SettingChange::Format(TimeFormat::from_str(value)?))
                }
            }
            other => anyhow::bail!(
                "Unknown field '{other}' (expected location, method, convention or format)"
            ),
        }
    }

    /// Attach an address to a location change. `label` is only called for locations.
    pub fn with_address(self, label: impl FnOnce(f64, f64) -> String) -> Self {
        match self {
            SettingChange::Location {
                latitude,
                longitude,
                ..
            } => SettingChange::Location {
                latitude,
                longitude,
                address: Some(label(latitude, longitude)),
            },
            other => other,
        }
    }

    /// Apply to `settings`. A location replaces the stored address, clearing it when none is attached.
    pub fn apply(&self, settings: &mut Settings) {
        match self {
            SettingChange::Location {
                latitude,
                longitude,
                address,
            } => settings.set_location(*latitude, *longitude, address.clone()),
            SettingChange::Method(id) => settings.method_id = *id,
            SettingChange::Convention(convention) => settings.convention = *convention,
            SettingChange::Format(format) => settings.time_format = *format,
            SettingChange::ToggleFormat => settings.time_format = settings.time_format.toggled(),
        }
    }
}

pub fn handle_set_command(field: &str, value: &str) -> Result<()> {
    log_version!();

    let change = match SettingChange::parse(field, value) {
        Ok(change) => change,
        Err(e) => {
            log_pipe!();
            log_error!("Invalid value for '{}': {}", field, e);
            log_end!();
            anyhow::bail!("Settings validation failed");
        }
    };

    let change = change.with_address(|latitude, longitude| match GeocodingClient::new() {
        Ok(client) => client.reverse(latitude, longitude),
        Err(_) => coordinate_label(latitude, longitude),
    });

    let mut store = SettingsStore::load()?;
    let before = store.get().clone();
    let after = store.update(|settings| change.apply(settings))?.clone();

    if after == before {
        log_block_start!("Settings unchanged");
        log_indented!("{} is already set to {}", field, value);
    } else {
        log_block_start!("Updated settings");
        log_indented!("{} = {}", field, value.trim());
        if let SettingChange::Location {
            address: Some(address),
            ..
        } = &change
        {
            log_indented!("Address: {}", address);
        }
        log_indented!("in {}", store.path().display());
    }

    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("set - Update one setting");
    log_block_start!("Usage: qiyam set <field> <value>");
    log_block_start!("Fields:");
    log_indented!("location <lat>,<lng>     Coordinates, e.g. 21.4225,39.8262");
    log_indented!("method <id>              Calculation method (see 'qiyam methods')");
    log_indented!("convention <name>        standard (from Maghrib) or alternative (from Isha)");
    log_indented!("format <12h|24h|toggle>  Time display format");
    log_block_start!("Examples:");
    log_indented!("qiyam set location 51.5074,-0.1278");
    log_indented!("qiyam set method 3");
    log_indented!("qiyam set format toggle");
    log_end!();
}
