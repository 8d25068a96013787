//! Zone registry: named zones authored outside waypoint.
//!
//! The registry file maps zone names to coordinates and radii:
//!
//! ```json
//! { "gym": { "lat": 40.748, "lon": -73.985, "radiusMeters": 60.0 } }
//! ```
//!
//! Read-only here — waypoint never writes this file, and its path may sit
//! outside the storage root.

use std::collections::BTreeMap;
use std::{fs, io, path::Path};

use crate::model::Zone;

use super::Result;

/// Loads the zone registry from the given path.
///
/// A missing file is a valid empty registry; a malformed file is an error
/// the caller decides how to soften.
pub fn load_registry(path: &Path) -> Result<BTreeMap<String, Zone>> {
    let json = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_registry_is_empty() {
        let dir = TempDir::new().unwrap();
        let zones = load_registry(&dir.path().join("locations.json")).unwrap();
        assert!(zones.is_empty());
    }

    #[test]
    fn loads_named_zones() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.json");
        fs::write(
            &path,
            r#"{ "gym": { "lat": 40.748, "lon": -73.985, "radiusMeters": 60.0 } }"#,
        )
        .unwrap();

        let zones = load_registry(&path).unwrap();
        assert_eq!(zones["gym"].radius_meters, 60.0);
    }

    #[test]
    fn malformed_registry_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locations.json");
        fs::write(&path, "not json").unwrap();

        assert!(load_registry(&path).is_err());
    }
}
