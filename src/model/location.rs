//! GPS fixes and circular zones.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A GPS fix as reported by the location provider.
///
/// Immutable once fetched; each successful provider call supersedes the
/// previous fix wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub observed_at: Timestamp,
}

impl Location {
    /// The fix as a `(latitude, longitude)` pair for geodesy calls.
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// A circular geofence zone: center coordinates and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub lat: f64,
    pub lon: f64,
    pub radius_meters: f64,
}
