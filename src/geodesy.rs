//! Great-circle geometry over GPS coordinates.
//!
//! Pure functions, no I/O. Everything downstream (geofence evaluation,
//! zone resolution) builds on these two primitives.

use crate::model::Zone;

/// Mean Earth radius in meters, per the haversine convention.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points given as
/// `(latitude, longitude)` degree pairs.
///
/// Uses the haversine formula. The intermediate term is clamped to `[0, 1]`
/// so floating-point overshoot near coincident or antipodal points cannot
/// escape the domain of the square roots.
pub fn distance_meters(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether a point lies within a zone's radius.
///
/// The boundary counts as inside: a point exactly `radius_meters` from the
/// center is in the zone.
pub fn is_inside(point: (f64, f64), zone: &Zone) -> bool {
    distance_meters(point, (zone.lat, zone.lon)) <= zone.radius_meters
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMES_SQUARE: (f64, f64) = (40.7580, -73.9855);
    const CAMBRIDGE: (f64, f64) = (52.2053, 0.1218);

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_meters(TIMES_SQUARE, TIMES_SQUARE), 0.0);
        assert_eq!(distance_meters(CAMBRIDGE, CAMBRIDGE), 0.0);
        assert_eq!(distance_meters((0.0, 0.0), (0.0, 0.0)), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = distance_meters(TIMES_SQUARE, CAMBRIDGE);
        let ba = distance_meters(CAMBRIDGE, TIMES_SQUARE);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn known_distance_within_a_few_percent() {
        // Times Square to the Empire State Building: roughly 1.1 km
        // by independent reference calculation.
        let d = distance_meters(TIMES_SQUARE, (40.7484, -73.9857));
        assert!((1000.0..1200.0).contains(&d), "got {d}");
    }

    #[test]
    fn transatlantic_distance_plausible() {
        // New York to Cambridge UK is about 5 560 km.
        let d = distance_meters(TIMES_SQUARE, CAMBRIDGE);
        assert!((5_400_000.0..5_700_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_panic() {
        // Antipodes sit at half the circumference; the clamp keeps the
        // formula in-domain despite floating-point overshoot.
        let d = distance_meters((0.0, 0.0), (0.0, 180.0));
        let half_circumference = std::f64::consts::PI * 6_371_000.0;
        assert!((d - half_circumference).abs() < 1.0, "got {d}");
    }

    #[test]
    fn boundary_counts_as_inside() {
        let zone = Zone {
            lat: 40.748,
            lon: -73.985,
            radius_meters: distance_meters((40.7481, -73.9851), (40.748, -73.985)),
        };
        assert!(is_inside((40.7481, -73.9851), &zone));
    }

    #[test]
    fn inside_and_outside_a_small_zone() {
        let zone = Zone {
            lat: 40.748,
            lon: -73.985,
            radius_meters: 60.0,
        };
        assert!(is_inside((40.7481, -73.9851), &zone));
        assert!(!is_inside(TIMES_SQUARE, &zone));
    }
}
