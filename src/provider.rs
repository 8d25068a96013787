//! Location providers: where the latest GPS fix comes from.
//!
//! Providers are soft-failing by contract: transport errors, malformed
//! responses, and missing credentials all yield `None`, and the caller keeps
//! whatever fix it already had. Having no provider configured at all is a
//! valid steady state, not an error.

use std::time::Duration;

use jiff::{Timestamp, ToSpan as _};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderSettings;
use crate::model::Location;

/// How long a single provider fetch may take.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How far back to look for a recent fix.
const LOOKBACK_HOURS: i64 = 24;

/// Fetches the most recent known position.
pub trait LocationProvider {
    /// The latest fix within the lookback window, or `None` if no recent
    /// fix exists or the provider cannot be reached.
    fn latest_fix(&self) -> Option<Location>;
}

/// Builds the configured provider, if any.
pub fn from_settings(settings: &ProviderSettings) -> Option<Box<dyn LocationProvider>> {
    match settings {
        ProviderSettings::None => None,
        ProviderSettings::Dawarich { api_url, api_key } => Some(Box::new(DawarichProvider::new(
            api_url.clone(),
            api_key.clone(),
        ))),
        ProviderSettings::Static { lat, lon } => Some(Box::new(StaticProvider {
            lat: *lat,
            lon: *lon,
        })),
    }
}

// ── Dawarich ──

/// Dawarich, a self-hosted GPS tracker with a bearer-token points API.
pub struct DawarichProvider {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
}

impl DawarichProvider {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_url,
            api_key,
        }
    }
}

impl LocationProvider for DawarichProvider {
    fn latest_fix(&self) -> Option<Location> {
        let now = Timestamp::now();
        let start = now.checked_sub(LOOKBACK_HOURS.hours()).ok()?;

        let response = self
            .client
            .get(format!("{}/api/v1/points", self.api_url))
            .query(&[("start_at", start.to_string()), ("end_at", now.to_string())])
            .bearer_auth(&self.api_key)
            .timeout(FETCH_TIMEOUT)
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("location fetch failed: {e}");
                return None;
            }
        };

        let points: Vec<DawarichPoint> = match response.error_for_status().and_then(|r| r.json()) {
            Ok(p) => p,
            Err(e) => {
                warn!("location response unusable: {e}");
                return None;
            }
        };

        // The API returns newest-first; the head is the latest fix.
        let point = points.first()?;
        let fix = Location {
            lat: point.latitude.as_f64()?,
            lon: point.longitude.as_f64()?,
            observed_at: now,
        };
        debug!(lat = fix.lat, lon = fix.lon, "fresh fix from dawarich");
        Some(fix)
    }
}

/// One point from the Dawarich points API.
#[derive(Debug, Deserialize)]
struct DawarichPoint {
    latitude: Coordinate,
    longitude: Coordinate,
}

/// Dawarich serializes coordinates as numbers or strings depending on
/// version; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

// ── Static ──

/// A fixed position from configuration. Useful for testing the pipeline and
/// for setups without a tracker.
pub struct StaticProvider {
    pub lat: f64,
    pub lon: f64,
}

impl LocationProvider for StaticProvider {
    fn latest_fix(&self) -> Option<Location> {
        Some(Location {
            lat: self.lat,
            lon: self.lon,
            observed_at: Timestamp::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_reports_configured_position() {
        let provider = StaticProvider {
            lat: 40.758,
            lon: -73.9855,
        };
        let fix = provider.latest_fix().unwrap();
        assert_eq!(fix.lat, 40.758);
        assert_eq!(fix.lon, -73.9855);
    }

    #[test]
    fn no_provider_configured_builds_none() {
        assert!(from_settings(&ProviderSettings::None).is_none());
    }

    #[test]
    fn coordinates_parse_from_numbers_and_strings() {
        let points: Vec<DawarichPoint> = serde_json::from_str(
            r#"[
                { "latitude": "40.7580", "longitude": "-73.9855" },
                { "latitude": 52.2053, "longitude": 0.1218 }
            ]"#,
        )
        .unwrap();

        assert_eq!(points[0].latitude.as_f64(), Some(40.758));
        assert_eq!(points[0].longitude.as_f64(), Some(-73.9855));
        assert_eq!(points[1].latitude.as_f64(), Some(52.2053));
    }

    #[test]
    fn unparseable_coordinate_is_none() {
        let c = Coordinate::Text("north-ish".to_string());
        assert!(c.as_f64().is_none());
    }
}
