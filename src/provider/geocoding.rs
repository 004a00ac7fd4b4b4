//! Place search (Open-Meteo) and reverse geocoding (Nominatim).
//!
//! Search returns at most five candidates in the provider's relevance order.
//! Reverse geocoding never fails: any problem falls back to a coordinate label.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::aladhan::{get_text, http_client};
use crate::constants::{
    PLACE_SEARCH_URL, REVERSE_GEOCODE_URL, SEARCH_DEBOUNCE, SEARCH_MAX_RESULTS,
    SEARCH_MIN_QUERY_CHARS,
};
use crate::error::QiyamError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
}

impl PlaceCandidate {
    /// `"name, region, country"`, skipping absent parts.
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(admin1) = self.admin1.as_deref().filter(|a| *a != self.name) {
            parts.push(admin1);
        }
        if let Some(country) = self.country.as_deref() {
            parts.push(country);
        }
        parts.join(", ")
    }

    /// Label stored with the settings once this place is chosen.
    pub fn address_label(&self) -> String {
        match self.country.as_deref() {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Option<Vec<PlaceCandidate>>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    country: Option<String>,
}

/// Whether a query is long enough to send to the provider.
pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= SEARCH_MIN_QUERY_CHARS
}

/// `"lat, lng"` with four decimals.
pub fn coordinate_label(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.4}, {longitude:.4}")
}

pub struct GeocodingClient {
    client: reqwest::blocking::Client,
}

impl GeocodingClient {
    pub fn new() -> Result<Self, QiyamError> {
        Ok(Self {
            client: http_client()?,
        })
    }

    /// Search places by free text. Short queries return no candidates without a request.
    pub fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, QiyamError> {
        let query = query.trim();
        if !is_searchable(query) {
            return Ok(Vec::new());
        }

        let params = [
            ("name", query.to_string()),
            ("count", SEARCH_MAX_RESULTS.to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];
        let body = get_text(&self.client, PLACE_SEARCH_URL, &params)?;
        parse_search_response(&body)
    }

    /// Human-readable label for coordinates, or the coordinate label on any failure.
    pub fn reverse(&self, latitude: f64, longitude: f64) -> String {
        let params = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("format", "json".to_string()),
            ("accept-language", "en".to_string()),
        ];

        get_text(&self.client, REVERSE_GEOCODE_URL, &params)
            .ok()
            .and_then(|body| label_from_reverse_response(&body))
            .unwrap_or_else(|| coordinate_label(latitude, longitude))
    }
}

pub(crate) fn parse_search_response(body: &str) -> Result<Vec<PlaceCandidate>, QiyamError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| QiyamError::unavailable(format!("invalid place search data: {e}")))?;

    let mut results = response.results.unwrap_or_default();
    results.truncate(SEARCH_MAX_RESULTS);
    Ok(results)
}

pub(crate) fn label_from_reverse_response(body: &str) -> Option<String> {
    let response: ReverseResponse = serde_json::from_str(body).ok()?;
    let address = response.address.unwrap_or_default();
    let city = address
        .city
        .or(address.town)
        .or(address.village)
        .or(address.suburb);

    match (city, address.country) {
        (Some(city), Some(country)) => Some(format!("{city}, {country}")),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

/// Holds back a search until typing has paused.
///
/// Every keystroke resets the timer. A query fires once, after `delay` has passed
/// since the last keystroke, and only when it is long enough to search.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn keystroke(&mut self, query: &str, at: Instant) {
        self.pending = if is_searchable(query) {
            Some((query.trim().to_string(), at))
        } else {
            None
        };
    }

    /// The query to run now, if its quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.duration_since(*at) >= self.delay => {
                self.pending.take().map(|(query, _)| query)
            }
            _ => None,
        }
    }

    /// Time left before the pending query fires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, at)| self.delay.saturating_sub(now.duration_since(*at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_keeps_provider_order() {
        let body = r#"{ "results": [
            { "id": 1, "name": "Paris", "latitude": 48.85, "longitude": 2.35, "country": "France", "admin1": "Île-de-France" },
            { "id": 2, "name": "Paris", "latitude": 33.66, "longitude": -95.55, "country": "United States", "admin1": "Texas" }
        ] }"#;
        let results = parse_search_response(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].country.as_deref(), Some("France"));
        assert_eq!(results[1].display_name(), "Paris, Texas, United States");
        assert_eq!(results[0].address_label(), "Paris, France");
    }

    #[test]
    fn test_search_response_without_results_is_empty() {
        assert!(parse_search_response(r#"{ "generationtime_ms": 0.5 }"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_search_response_truncates_to_five() {
        let entries: Vec<String> = (0..8)
            .map(|i| format!(r#"{{ "id": {i}, "name": "Town{i}", "latitude": 1.0, "longitude": 2.0 }}"#))
            .collect();
        let body = format!(r#"{{ "results": [{}] }}"#, entries.join(","));
        let results = parse_search_response(&body).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[4].name, "Town4");
    }

    #[test]
    fn test_reverse_label_variants() {
        let city_country = r#"{ "address": { "town": "Ely", "country": "United Kingdom" } }"#;
        assert_eq!(
            label_from_reverse_response(city_country).as_deref(),
            Some("Ely, United Kingdom")
        );

        let country_only = r#"{ "address": { "country": "Iceland" } }"#;
        assert_eq!(label_from_reverse_response(country_only).as_deref(), Some("Iceland"));

        assert_eq!(label_from_reverse_response(r#"{ "error": "Unable to geocode" }"#), None);
        assert_eq!(label_from_reverse_response("not json"), None);
    }

    #[test]
    fn test_coordinate_label_uses_four_decimals() {
        assert_eq!(coordinate_label(40.712776, -74.005974), "40.7128, -74.0060");
    }

    #[test]
    fn test_debouncer_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.keystroke("Lo", start);
        debouncer.keystroke("Lon", start + Duration::from_millis(200));
        assert_eq!(debouncer.poll(start + Duration::from_millis(600)), None);
        assert_eq!(
            debouncer.remaining(start + Duration::from_millis(600)),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(700)).as_deref(),
            Some("Lon")
        );
        // Fires once
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_debouncer_ignores_short_queries() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.keystroke("Lon", start);
        debouncer.keystroke("L", start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + Duration::from_secs(2)), None);
    }
}
