//! Range checks for settings values.
//!
//! The CLI rejects out-of-range values outright. A file that contains them is
//! repaired on load instead, one field at a time.

use anyhow::Result;

use super::Settings;
use crate::constants::{
    MAXIMUM_LATITUDE, MAXIMUM_LONGITUDE, MAXIMUM_METHOD_ID, MINIMUM_LATITUDE, MINIMUM_LONGITUDE,
};

pub fn validate_latitude(latitude: f64) -> Result<()> {
    if !(MINIMUM_LATITUDE..=MAXIMUM_LATITUDE).contains(&latitude) {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {latitude})");
    }
    Ok(())
}

pub fn validate_longitude(longitude: f64) -> Result<()> {
    if !(MINIMUM_LONGITUDE..=MAXIMUM_LONGITUDE).contains(&longitude) {
        anyhow::bail!("longitude must be between -180 and 180 degrees (got {longitude})");
    }
    Ok(())
}

pub fn validate_method_id(method_id: u32) -> Result<()> {
    if method_id > MAXIMUM_METHOD_ID {
        anyhow::bail!("method_id must be between 0 and {MAXIMUM_METHOD_ID} (got {method_id})");
    }
    Ok(())
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_latitude(settings.latitude)?;
    validate_longitude(settings.longitude)?;
    validate_method_id(settings.method_id)?;
    Ok(())
}

/// Replace out-of-range fields with their defaults, returning one warning per repair.
pub fn sanitize_settings(settings: &mut Settings) -> Vec<String> {
    let defaults = Settings::default();
    let mut warnings = Vec::new();

    if let Err(e) = validate_latitude(settings.latitude) {
        warnings.push(format!("{e}, using default"));
        settings.latitude = defaults.latitude;
    }
    if let Err(e) = validate_longitude(settings.longitude) {
        warnings.push(format!("{e}, using default"));
        settings.longitude = defaults.longitude;
    }
    if let Err(e) = validate_method_id(settings.method_id) {
        warnings.push(format!("{e}, using default"));
        settings.method_id = defaults.method_id;
    }

    warnings
}

/// Parse `"lat,lng"` (spaces allowed) and range-check both parts.
pub fn parse_location(value: &str) -> Result<(f64, f64)> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("Expected <latitude>,<longitude> (got '{value}')"))?;

    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid latitude '{}'", lat.trim()))?;
    let longitude: f64 = lng
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid longitude '{}'", lng.trim()))?;

    validate_latitude(latitude)?;
    validate_longitude(longitude)?;
    Ok((latitude, longitude))
}
