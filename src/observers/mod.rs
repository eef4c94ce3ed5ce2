//! # Ground observer and topocentric geometry
//!
//! A single [`ObserverLocation`] is fixed for a whole pipeline run. On construction it caches its
//! WGS84 Earth-centered Earth-fixed (ECEF) position and the ECEF→ENU rotation, so every
//! per-sample look-angle computation is one subtraction and one 3×3 product.
//!
//! Pipeline
//! -----------------
//! ```text
//! geodetic (lat, lon, alt) ──geodetic_to_ecef──▶ ECEF (km)
//!                       ECEF − observer ECEF ──R_enu──▶ ENU (km)
//!                              ENU ──spherical──▶ (elevation, azimuth, range)
//! ```
//!
//! Conventions
//! -----------------
//! * Azimuth is measured clockwise from geographic North, in `[0, 360)`.
//! * Elevation is the angle above the local horizontal plane, in `[-90, 90]`.
//! * Range is the slant distance in kilometers.
//!
//! See also
//! ------------
//! * [`crate::visibility::calculator::VisibilityCalculator`] – applies [`ObserverLocation::look_angles`] to whole timeseries.
//! * [`crate::satellite::Geodetic`] – input position type.
pub mod topocentric;

use nalgebra::{Matrix3, Vector3};
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Meter};
use crate::pool_errors::PoolError;
use crate::satellite::Geodetic;

use self::topocentric::{enu_rotation, geodetic_to_ecef, LookAngles};

/// Plain serializable form of an observer, as found in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub latitude_deg: Degree,
    pub longitude_deg: Degree,
    #[serde(default)]
    pub altitude_m: Meter,
}

/// Fixed ground station from which visibility is evaluated.
///
/// Units
/// -----
/// * `latitude`, `longitude`: degrees (geodetic, east positive).
/// * `altitude`: meters above the WGS84 ellipsoid.
/// * cached ECEF position: kilometers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObserverConfig", into = "ObserverConfig")]
pub struct ObserverLocation {
    pub latitude: NotNan<f64>,
    pub longitude: NotNan<f64>,
    pub altitude: NotNan<f64>,

    ecef_km: Vector3<f64>,
    ecef_to_enu: Matrix3<f64>,
}

impl ObserverLocation {
    /// Build an observer from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `latitude`: geodetic latitude in **degrees**, within `[-90, 90]`.
    /// * `longitude`: longitude in **degrees**, within `[-180, 360]` (normalized internally).
    /// * `altitude`: height above the ellipsoid in **meters**.
    ///
    /// Errors
    /// ----------
    /// * [`PoolError::FloatIsNan`] if any coordinate is NaN.
    /// * [`PoolError::InvalidObserver`] if a coordinate is infinite or out of range.
    pub fn new(latitude: Degree, longitude: Degree, altitude: Meter) -> Result<Self, PoolError> {
        let latitude = NotNan::new(latitude)?;
        let longitude = NotNan::new(longitude)?;
        let altitude = NotNan::new(altitude)?;

        if !(-90.0..=90.0).contains(&latitude.into_inner()) {
            return Err(PoolError::InvalidObserver(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !(-180.0..=360.0).contains(&longitude.into_inner()) {
            return Err(PoolError::InvalidObserver(format!(
                "longitude {longitude} outside [-180, 360]"
            )));
        }
        if !altitude.is_finite() {
            return Err(PoolError::InvalidObserver("altitude must be finite".into()));
        }

        let lat = latitude.to_radians();
        let lon = longitude.to_radians();
        let ecef_km = geodetic_to_ecef(lat, lon, altitude.into_inner() / 1000.0);

        Ok(ObserverLocation {
            latitude,
            longitude,
            altitude,
            ecef_km,
            ecef_to_enu: enu_rotation(lat, lon),
        })
    }

    /// Observer ECEF position in kilometers.
    pub fn ecef_km(&self) -> &Vector3<f64> {
        &self.ecef_km
    }

    /// Elevation, azimuth and slant range of a geodetic position seen from this observer.
    ///
    /// Returns `None` when the position is malformed (non-finite, out-of-range latitude,
    /// below [`MIN_VALID_ALTITUDE_KM`](crate::constants::MIN_VALID_ALTITUDE_KM)) or coincides
    /// with the observer. Callers flag such samples as invalid instead of failing.
    pub fn look_angles(&self, position: &Geodetic) -> Option<LookAngles> {
        if !position.is_well_formed() {
            return None;
        }
        let target = geodetic_to_ecef(
            position.latitude_deg.to_radians(),
            position.longitude_deg.to_radians(),
            position.altitude_km,
        );
        let enu = self.ecef_to_enu * (target - self.ecef_km);
        LookAngles::from_enu(&enu)
    }
}

impl TryFrom<ObserverConfig> for ObserverLocation {
    type Error = PoolError;

    fn try_from(value: ObserverConfig) -> Result<Self, Self::Error> {
        ObserverLocation::new(value.latitude_deg, value.longitude_deg, value.altitude_m)
    }
}

impl From<ObserverLocation> for ObserverConfig {
    fn from(value: ObserverLocation) -> Self {
        ObserverConfig {
            latitude_deg: value.latitude.into_inner(),
            longitude_deg: value.longitude.into_inner(),
            altitude_m: value.altitude.into_inner(),
        }
    }
}
