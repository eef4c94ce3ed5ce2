//! # Constants and shared identifiers for satpool
//!
//! This module centralizes the **geodetic constants**, **unit aliases** and the small set of
//! identifier types shared by every stage of the pipeline.
//!
//! ## Overview
//!
//! - WGS84 ellipsoid parameters used by the topocentric transform
//! - Type aliases documenting the unit carried by a plain `f64`
//! - [`Constellation`] and [`SatelliteId`], the keys used by every per-satellite map
//! - Hash map alias using the `ahash` hasher for catalog-sized maps

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// Geodetic constants
// -------------------------------------------------------------------------------------------------

/// Earth equatorial radius in meters (WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.314_245;

/// First eccentricity squared of the WGS84 ellipsoid
pub const WGS84_ECC2: f64 =
    1.0 - (EARTH_MINOR_AXIS * EARTH_MINOR_AXIS) / (EARTH_MAJOR_AXIS * EARTH_MAJOR_AXIS);

/// Lowest altitude (km) accepted for a sampled position; anything below is treated as corrupt.
pub const MIN_VALID_ALTITUDE_KM: f64 = -1.0;

/// Placeholder elevation written by some upstream producers when a sample could not be computed.
pub const ELEVATION_SENTINEL: f64 = -999.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Time span in seconds
pub type Second = f64;
/// Time span in minutes
pub type Minute = f64;

/// Catalog identifier of a satellite (NORAD number or operator designation).
pub type SatelliteId = String;

/// Per-satellite map keyed by [`SatelliteId`].
pub type SatelliteMap<V> = HashMap<SatelliteId, V, RandomState>;

// -------------------------------------------------------------------------------------------------
// Constellation identifier
// -------------------------------------------------------------------------------------------------

/// Constellation a satellite belongs to.
///
/// The two LEO constellations the pool planner ships defaults for are spelled out; any other
/// operator is carried verbatim (lower-cased) in [`Constellation::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Constellation {
    Starlink,
    OneWeb,
    Other(String),
}

impl Constellation {
    /// Lower-case name used in configuration files and constraint keys.
    pub fn as_str(&self) -> &str {
        match self {
            Constellation::Starlink => "starlink",
            Constellation::OneWeb => "oneweb",
            Constellation::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for Constellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Constellation {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "starlink" => Constellation::Starlink,
            "oneweb" | "one_web" | "one-web" => Constellation::OneWeb,
            other => Constellation::Other(other.to_string()),
        }
    }
}

impl From<String> for Constellation {
    fn from(value: String) -> Self {
        Constellation::from(value.as_str())
    }
}

impl From<Constellation> for String {
    fn from(value: Constellation) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for Constellation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Constellation::from(s))
    }
}

#[cfg(test)]
mod constants_test {
    use super::*;

    #[test]
    fn constellation_names_are_case_insensitive() {
        assert_eq!(Constellation::from("STARLINK"), Constellation::Starlink);
        assert_eq!(Constellation::from("OneWeb"), Constellation::OneWeb);
        assert_eq!(
            Constellation::from("Kuiper"),
            Constellation::Other("kuiper".into())
        );
        assert_eq!(Constellation::OneWeb.to_string(), "oneweb");
    }

    #[test]
    fn wgs84_eccentricity() {
        assert!((WGS84_ECC2 - 6.694_379_990_14e-3).abs() < 1e-12);
    }
}
