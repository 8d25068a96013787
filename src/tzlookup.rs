//! Geodetic boundary lookup: GPS coordinates → IANA timezone identifier.

use tzf_rs::DefaultFinder;

/// Maps coordinates to an IANA timezone identifier.
///
/// Pure: same input, same answer. `None` means the point is unresolvable
/// (the lookup data has no zone there).
pub trait TzLookup {
    fn timezone_at(&self, lat: f64, lon: f64) -> Option<String>;
}

/// Boundary lookup backed by the embedded tzf dataset.
pub struct TzfLookup {
    finder: DefaultFinder,
}

impl TzfLookup {
    /// Builds the finder from the embedded polygon data.
    ///
    /// Construction parses the dataset; build once and reuse.
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }
}

impl Default for TzfLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl TzLookup for TzfLookup {
    fn timezone_at(&self, lat: f64, lon: f64) -> Option<String> {
        // tzf takes (longitude, latitude).
        let tz = self.finder.get_tz_name(lon, lat);
        if tz.is_empty() {
            None
        } else {
            Some(tz.to_string())
        }
    }
}
