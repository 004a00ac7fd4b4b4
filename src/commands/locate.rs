//! `locate`: detect the location from the system timezone.
//!
//! The zone's city (`Europe/London` → `London`) is searched and the best match
//! saved. Zones without a city, or a city the search cannot find, leave the
//! settings untouched.

use anyhow::Result;

use super::report_error;
use super::search::save_place;
use crate::config::SettingsStore;
use crate::error::QiyamError;
use crate::provider::geocoding::{GeocodingClient, PlaceCandidate};
use crate::provider::timezone::{city_hint, system_timezone_name};

/// Best place for a timezone's city, preferring candidates in the same zone.
pub fn detect_place(
    zone_name: Option<String>,
    search: impl Fn(&str) -> Result<Vec<PlaceCandidate>, QiyamError>,
) -> Result<PlaceCandidate, QiyamError> {
    let zone = zone_name.ok_or_else(|| QiyamError::GeolocationDenied {
        reason: "the system timezone could not be determined".to_string(),
    })?;
    let city = city_hint(&zone).ok_or_else(|| QiyamError::GeolocationDenied {
        reason: format!("timezone '{zone}' does not name a city"),
    })?;

    search(&city)?
        .into_iter()
        .next()
        .ok_or_else(|| QiyamError::GeolocationDenied {
            reason: format!("no place found for '{city}' ({zone})"),
        })
}

pub fn handle_locate_command() -> Result<()> {
    log_version!();

    let zone = system_timezone_name();
    if let Some(zone) = &zone {
        log_block_start!("System timezone: {}", zone);
    }

    let client = GeocodingClient::new()?;
    match detect_place(zone, |query| client.search(query)) {
        Ok(place) => {
            let mut store = SettingsStore::load()?;
            save_place(&mut store, &place)?;
            log_pipe!();
            log_info!("Use 'qiyam search <place>' if this is not where you are");
            log_end!();
            Ok(())
        }
        Err(error) => {
            report_error(&error);
            log_indented!("Set the location with 'qiyam search <place>' instead");
            log_end!();
            Err(error.into())
        }
    }
}
