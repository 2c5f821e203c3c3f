//! Great-circle distance on a spherical Earth.
//!
//! Candidate ranking sorts by haversine distance from the requesting user's
//! origin, so this is the one numeric routine the whole discovery pipeline
//! leans on.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 style (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance between two coordinates, in kilometres.
///
/// Inputs are degrees; conversion to radians happens here. Symmetric in its
/// arguments and zero for identical points.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAIROBI: Coordinates = Coordinates {
        latitude: -1.2921,
        longitude: 36.8219,
    };
    const MOMBASA: Coordinates = Coordinates {
        latitude: -4.0435,
        longitude: 39.6682,
    };

    #[test]
    fn nairobi_to_mombasa_is_about_440_km() {
        let d = distance_km(NAIROBI, MOMBASA);
        assert!((d - 440.0).abs() < 5.0, "got {d} km");
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_km(NAIROBI, MOMBASA);
        let back = distance_km(MOMBASA, NAIROBI);
        let rel = (there - back).abs() / there;
        assert!(rel < 1e-9, "relative error {rel}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(NAIROBI, NAIROBI), 0.0);
    }

    #[test]
    fn short_hops_are_small_but_positive() {
        // Two points ~1.1 km apart along the equatorial meridian.
        let a = Coordinates::new(0.0, 36.0);
        let b = Coordinates::new(0.01, 36.0);
        let d = distance_km(a, b);
        assert!(d > 1.0 && d < 1.3, "got {d} km");
    }
}
