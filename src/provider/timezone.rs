//! Timezone lookup for coordinates and for the local system.

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::path::Path;
use tzf_rs::DefaultFinder;

static FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// IANA timezone of the given coordinates, UTC when the lookup has no answer.
pub fn timezone_for(latitude: f64, longitude: f64) -> Tz {
    let name = FINDER.get_tz_name(longitude, latitude);
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            log_warning!(
                "No timezone found for {:.4}, {:.4} ('{}'), using UTC",
                latitude,
                longitude,
                name
            );
            Tz::UTC
        }
    }
}

/// The system's IANA timezone name from `TZ` or the `/etc/localtime` link.
pub fn system_timezone_name() -> Option<String> {
    if let Ok(tz) = std::env::var("TZ") {
        let tz = tz.trim_start_matches(':').trim();
        if tz.parse::<Tz>().is_ok() {
            return Some(tz.to_string());
        }
    }

    let target = std::fs::read_link(Path::new("/etc/localtime")).ok()?;
    zone_name_from_path(&target.to_string_lossy())
}

/// Extract `Region/City` from a zoneinfo path like `/usr/share/zoneinfo/Europe/London`.
fn zone_name_from_path(path: &str) -> Option<String> {
    let (_, name) = path.split_once("zoneinfo/")?;
    name.parse::<Tz>().ok().map(|_| name.to_string())
}

/// City part of a zone name as a search query: `America/New_York` → `New York`.
///
/// Zones without a city (`UTC`, `Etc/GMT+3`) have no hint.
pub fn city_hint(zone_name: &str) -> Option<String> {
    let (region, city) = zone_name.rsplit_once('/')?;
    if region.starts_with("Etc") || city.is_empty() {
        return None;
    }
    Some(city.replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_hint() {
        assert_eq!(city_hint("America/New_York").as_deref(), Some("New York"));
        assert_eq!(
            city_hint("America/Argentina/Buenos_Aires").as_deref(),
            Some("Buenos Aires")
        );
        assert_eq!(city_hint("Etc/GMT+3"), None);
        assert_eq!(city_hint("UTC"), None);
    }

    #[test]
    fn test_zone_name_from_path() {
        assert_eq!(
            zone_name_from_path("/usr/share/zoneinfo/Europe/London").as_deref(),
            Some("Europe/London")
        );
        assert_eq!(zone_name_from_path("/etc/somewhere/else"), None);
    }

    #[test]
    fn test_timezone_for_known_cities() {
        assert_eq!(timezone_for(51.5074, -0.1278), chrono_tz::Europe::London);
        assert_eq!(timezone_for(21.4225, 39.8262), chrono_tz::Asia::Riyadh);
    }
}
