//! Client for the AlAdhan prayer-time API.
//!
//! `GET /timings/{DD-MM-YYYY}?latitude=..&longitude=..&method=..` returns one
//! day of timings wrapped in `{ code, status, data }`. Only `Fajr` and `Isha`
//! are required by the schema. Every other label is optional and unknown labels
//! pass through untouched.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{DayTimings, TimingsProvider, TimingsRequest};
use crate::constants::{ALADHAN_BASE_URL, HTTP_TIMEOUT};
use crate::error::QiyamError;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    meta: Option<TimingsMeta>,
}

#[derive(Debug, Deserialize)]
struct TimingsMeta {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    method: Option<MethodData>,
}

#[derive(Debug, Deserialize)]
struct MethodData {
    id: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, serde_json::Value>,
}

/// A calculation method offered by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationMethod {
    pub id: u32,
    pub name: String,
    pub params: BTreeMap<String, serde_json::Value>,
}

pub struct AladhanClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

/// Shared blocking HTTP client setup for all providers.
pub(crate) fn http_client() -> Result<reqwest::blocking::Client, QiyamError> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("qiyam/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(QiyamError::from)
}

/// GET `url` with query parameters and return the body of a successful response.
pub(crate) fn get_text(
    client: &reqwest::blocking::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<String, QiyamError> {
    let url = reqwest::Url::parse_with_params(url, query)
        .map_err(|e| QiyamError::unavailable(format!("invalid request url: {e}")))?;
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(QiyamError::unavailable(format!(
            "provider returned HTTP {status}"
        )));
    }
    Ok(response.text()?)
}

impl AladhanClient {
    pub fn new() -> Result<Self, QiyamError> {
        Self::with_base_url(ALADHAN_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, QiyamError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, QiyamError> {
        get_text(&self.client, url, query)
    }

    /// List the calculation methods, sorted by id.
    pub fn fetch_methods(&self) -> Result<Vec<CalculationMethod>, QiyamError> {
        let body = self.get_text(&format!("{}/methods", self.base_url), &[])?;
        parse_methods_response(&body)
    }
}

impl TimingsProvider for AladhanClient {
    fn fetch_timings(&self, request: &TimingsRequest) -> Result<DayTimings, QiyamError> {
        let date = request
            .date
            .unwrap_or_else(|| crate::time_source::now().date_naive());
        let url = format!("{}/timings/{}", self.base_url, date.format("%d-%m-%Y"));
        let query = [
            ("latitude", request.latitude.to_string()),
            ("longitude", request.longitude.to_string()),
            ("method", request.method_id.to_string()),
        ];

        let body = self.get_text(&url, &query)?;
        parse_timings_response(&body, date)
    }
}

pub(crate) fn parse_timings_response(body: &str, date: NaiveDate) -> Result<DayTimings, QiyamError> {
    let envelope: Envelope<TimingsData> = serde_json::from_str(body)
        .map_err(|e| QiyamError::unavailable(format!("invalid prayer times data: {e}")))?;
    let data = envelope.data;

    let timings: BTreeMap<String, String> = data
        .timings
        .into_iter()
        .filter_map(|(label, value)| value.as_str().map(|s| (label, s.to_string())))
        .collect();

    for required in ["Fajr", "Isha"] {
        if !timings.contains_key(required) {
            return Err(QiyamError::unavailable(format!(
                "invalid prayer times data: missing {required}"
            )));
        }
    }

    let (timezone, method_name) = match data.meta {
        Some(meta) => (meta.timezone, meta.method.and_then(|m| m.name)),
        None => (None, None),
    };

    Ok(DayTimings {
        date,
        timings,
        timezone,
        method_name,
    })
}

pub(crate) fn parse_methods_response(body: &str) -> Result<Vec<CalculationMethod>, QiyamError> {
    let envelope: Envelope<BTreeMap<String, MethodData>> = serde_json::from_str(body)
        .map_err(|e| QiyamError::unavailable(format!("invalid methods data: {e}")))?;

    let mut methods: Vec<CalculationMethod> = envelope
        .data
        .into_iter()
        .map(|(key, method)| CalculationMethod {
            id: method.id,
            name: method.name.unwrap_or(key),
            params: method.params,
        })
        .collect();
    methods.sort_by_key(|m| m.id);
    Ok(methods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PrayerLabel;

    const SAMPLE: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": {
            "timings": {
                "Fajr": "05:12 (EET)",
                "Sunrise": "06:41",
                "Dhuhr": "12:24",
                "Asr": "15:35",
                "Sunset": "18:07",
                "Maghrib": "18:07",
                "Isha": "19:31",
                "Imsak": "05:02",
                "Midnight": "00:24",
                "Firstthird": "22:18",
                "Lastthird": "02:30"
            },
            "date": { "readable": "01 Mar 2025", "timestamp": "1740787200" },
            "meta": {
                "latitude": 30.0444,
                "longitude": 31.2357,
                "timezone": "Africa/Cairo",
                "method": { "id": 5, "name": "Egyptian General Authority of Survey", "params": { "Fajr": 19.5, "Isha": 17.5 } }
            }
        }
    }"#;

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_parse_full_response() {
        let day = parse_timings_response(SAMPLE, march_first()).unwrap();
        assert_eq!(day.date, march_first());
        assert_eq!(day.get(PrayerLabel::Fajr), Some("05:12 (EET)"));
        assert_eq!(day.maghrib().unwrap(), "18:07");
        assert_eq!(day.timezone.as_deref(), Some("Africa/Cairo"));
        assert_eq!(
            day.method_name.as_deref(),
            Some("Egyptian General Authority of Survey")
        );
        // Unknown labels pass through
        assert_eq!(day.timings.get("Lastthird").map(String::as_str), Some("02:30"));
    }

    #[test]
    fn test_missing_isha_is_schema_mismatch() {
        let body = r#"{ "data": { "timings": { "Fajr": "05:00", "Maghrib": "18:00" } } }"#;
        let result = parse_timings_response(body, march_first());
        assert!(matches!(result, Err(QiyamError::DataUnavailable { .. })));
    }

    #[test]
    fn test_missing_maghrib_passes_schema_but_not_resolution() {
        let body = r#"{ "data": { "timings": { "Fajr": "05:00", "Isha": "20:00" } } }"#;
        let day = parse_timings_response(body, march_first()).unwrap();
        assert_eq!(
            day.maghrib(),
            Err(QiyamError::MissingField { field: "Maghrib" })
        );
    }

    #[test]
    fn test_non_json_body_is_unavailable() {
        let result = parse_timings_response("<html>502 Bad Gateway</html>", march_first());
        assert!(matches!(result, Err(QiyamError::DataUnavailable { .. })));
    }

    #[test]
    fn test_parse_methods_sorted_by_id() {
        let body = r#"{
            "code": 200,
            "data": {
                "MAKKAH": { "id": 4, "name": "Umm Al-Qura University, Makkah", "params": { "Fajr": 18.5, "Isha": "90 min" } },
                "MWL": { "id": 3, "name": "Muslim World League", "params": { "Fajr": 18, "Isha": 17 } },
                "CUSTOM": { "id": 99 }
            }
        }"#;
        let methods = parse_methods_response(body).unwrap();
        let ids: Vec<u32> = methods.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 4, 99]);
        assert_eq!(methods[2].name, "CUSTOM");
        assert_eq!(methods[1].params["Isha"], serde_json::json!("90 min"));
    }
}
