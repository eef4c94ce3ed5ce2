//! WGS84 geodetic → ECEF → ENU transforms and look-angle extraction.
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, EARTH_MAJOR_AXIS, WGS84_ECC2};

/// Elevation, azimuth and slant range of a target relative to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAngles {
    pub elevation_deg: Degree,
    pub azimuth_deg: Degree,
    pub range_km: Kilometer,
}

impl LookAngles {
    /// Spherical angles of an East-North-Up vector (km).
    ///
    /// Returns `None` for a zero-length vector, where direction is undefined.
    pub fn from_enu(enu: &Vector3<f64>) -> Option<Self> {
        let range_km = enu.norm();
        if !range_km.is_finite() || range_km <= f64::EPSILON {
            return None;
        }
        let (east, north, up) = (enu.x, enu.y, enu.z);

        let elevation_deg = (up / range_km).clamp(-1.0, 1.0).asin().to_degrees();
        let azimuth_deg = normalize_azimuth(east.atan2(north).to_degrees());

        Some(LookAngles {
            elevation_deg,
            azimuth_deg,
            range_km,
        })
    }
}

/// Fold any angle in degrees into `[0, 360)`.
#[inline]
pub fn normalize_azimuth(az: Degree) -> Degree {
    let wrapped = az.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Geodetic coordinates (radians, km) to ECEF position (km) on the WGS84 ellipsoid.
///
/// ```text
/// N = a / sqrt(1 − e² sin²φ)
/// x = (N + h) cosφ cosλ
/// y = (N + h) cosφ sinλ
/// z = (N (1 − e²) + h) sinφ
/// ```
pub fn geodetic_to_ecef(lat: f64, lon: f64, height_km: Kilometer) -> Vector3<f64> {
    let a_km = EARTH_MAJOR_AXIS / 1000.0;
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let n = a_km / (1.0 - WGS84_ECC2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height_km) * cos_lat * cos_lon,
        (n + height_km) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_ECC2) + height_km) * sin_lat,
    )
}

/// Rotation taking ECEF difference vectors into the local East-North-Up frame at `(lat, lon)`.
pub fn enu_rotation(lat: f64, lon: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    Matrix3::new(
        -sin_lon,
        cos_lon,
        0.0,
        -sin_lat * cos_lon,
        -sin_lat * sin_lon,
        cos_lat,
        cos_lat * cos_lon,
        cos_lat * sin_lon,
        sin_lat,
    )
}

#[cfg(test)]
mod topocentric_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equator_prime_meridian_ecef() {
        let r = geodetic_to_ecef(0.0, 0.0, 0.0);
        assert_relative_eq!(r.x, 6378.137, epsilon = 1e-9);
        assert_relative_eq!(r.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(r.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn north_pole_ecef_uses_polar_radius() {
        let r = geodetic_to_ecef(90f64.to_radians(), 0.0, 0.0);
        assert_relative_eq!(r.z, 6356.752314245, epsilon = 1e-6);
    }

    #[test]
    fn enu_rotation_is_orthonormal() {
        let r = enu_rotation(0.4, 2.1);
        let should_be_identity = r * r.transpose();
        assert_relative_eq!(should_be_identity, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn azimuth_normalization() {
        assert_eq!(normalize_azimuth(-90.0), 270.0);
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_eq!(normalize_azimuth(725.0), 5.0);
        assert_eq!(normalize_azimuth(-1e-18), 0.0);
    }

    #[test]
    fn zero_vector_has_no_direction() {
        assert!(LookAngles::from_enu(&Vector3::zeros()).is_none());
    }
}
