#![allow(dead_code)]

use hifitime::Epoch;
use satpool::constants::Constellation;
use satpool::observers::ObserverLocation;
use satpool::satellite::{Geodetic, PositionSample, SatelliteInput};
use satpool::time::shift_seconds;

pub const NTPU_LAT: f64 = 24.9441667;
pub const NTPU_LON: f64 = 121.3713889;

/// Ground station used across the integration tests.
pub fn ntpu() -> ObserverLocation {
    ObserverLocation::new(NTPU_LAT, NTPU_LON, 50.0).unwrap()
}

pub fn t0() -> Epoch {
    Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0)
}

/// North-bound pass of a 550 km satellite, sampled every 30 s.
///
/// The sub-satellite point moves 2° of latitude per sample from 24° south to 24° north of the
/// observer, `lon_offset_deg` east of it. Small offsets give high passes; beyond about 25° the
/// satellite never rises.
pub fn pass(id: &str, constellation: Constellation, start_s: f64, lon_offset_deg: f64) -> SatelliteInput {
    let samples = (0..=24)
        .map(|i| PositionSample {
            timestamp: shift_seconds(t0(), start_s + 30.0 * i as f64),
            geodetic: Geodetic::new(
                NTPU_LAT - 24.0 + 2.0 * i as f64,
                NTPU_LON + lon_offset_deg,
                550.0,
            ),
        })
        .collect();
    SatelliteInput::new(id, constellation, samples)
}

/// A small mixed batch: staggered Starlink passes and a few OneWeb ones.
pub fn mixed_batch() -> Vec<SatelliteInput> {
    let mut batch: Vec<SatelliteInput> = (0..24)
        .map(|i| {
            pass(
                &format!("STARLINK-{:04}", 1000 + i),
                Constellation::Starlink,
                120.0 * i as f64,
                -12.0 + (i % 7) as f64 * 4.0,
            )
        })
        .collect();
    batch.extend((0..4).map(|i| {
        pass(
            &format!("ONEWEB-{:04}", 100 + i),
            Constellation::OneWeb,
            300.0 * i as f64,
            2.0 + 3.0 * i as f64,
        )
    }));
    batch
}
