//! # Satellite data model
//!
//! Value types flowing between pipeline stages.
//!
//! ```text
//! RawSatelliteRecord ──ingest──▶ SatelliteInput ──calculator──▶ SatelliteTrack
//!                                                  └ ObservedSample { PositionSample + RelativeObservation }
//! ```
//!
//! * [`RawSatelliteRecord`] mirrors the loosely-typed upstream JSON (string timestamps).
//! * [`SatelliteInput`] is validated once at ingestion: typed epochs, parsed constellation.
//! * [`SatelliteTrack`] is the enriched per-satellite record every later stage reads and returns.
//!
//! Invalid samples are never defaulted: a sample whose look angles could not be computed keeps
//! `relative_to_observer = None`, and a sample carrying an out-of-range elevation keeps it as-is
//! so the elevation filter can count it.
use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::{Constellation, Degree, Kilometer, SatelliteId, MIN_VALID_ALTITUDE_KM};
use crate::observers::topocentric::LookAngles;
use crate::pool_errors::{Rejection, RejectionReason};
use crate::time::parse_utc_timestamp;
use crate::visibility::elevation_filter::ElevationFilteringInfo;

/// Sub-satellite point and altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    #[serde(alias = "lat_deg")]
    pub latitude_deg: Degree,
    #[serde(alias = "lon_deg")]
    pub longitude_deg: Degree,
    #[serde(alias = "alt_km")]
    pub altitude_km: Kilometer,
}

impl Geodetic {
    pub fn new(latitude_deg: Degree, longitude_deg: Degree, altitude_km: Kilometer) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_km,
        }
    }

    /// Finite, latitude within `[-90, 90]`, longitude within `[-180, 360]`, not underground.
    pub fn is_well_formed(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.altitude_km.is_finite()
            && (-90.0..=90.0).contains(&self.latitude_deg)
            && (-180.0..=360.0).contains(&self.longitude_deg)
            && self.altitude_km >= MIN_VALID_ALTITUDE_KM
    }
}

/// One propagated position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp: Epoch,
    pub geodetic: Geodetic,
}

/// Elevation tier a sample satisfies, ordered `Critical < Standard < Preferred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Critical,
    Standard,
    Preferred,
}

/// Position of a satellite relative to the observer at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeObservation {
    pub elevation_deg: Degree,
    pub azimuth_deg: Degree,
    pub range_km: Kilometer,
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<QualityTier>,
}

impl RelativeObservation {
    /// Raw horizon test: visible iff `elevation ≥ 0°`.
    pub fn from_look_angles(look: LookAngles) -> Self {
        Self {
            elevation_deg: look.elevation_deg,
            azimuth_deg: look.azimuth_deg,
            range_km: look.range_km,
            is_visible: look.elevation_deg >= 0.0,
            quality_tier: None,
        }
    }

    /// Elevation is finite and within `[-90, 90]`; placeholders such as `-999` fail this test.
    #[inline]
    pub fn has_valid_elevation(&self) -> bool {
        self.elevation_deg.is_finite() && (-90.0..=90.0).contains(&self.elevation_deg)
    }
}

/// A position sample enriched with its observer-relative geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedSample {
    pub timestamp: Epoch,
    pub geodetic: Geodetic,
    /// `None` when the sample was malformed and no geometry could be computed.
    pub relative_to_observer: Option<RelativeObservation>,
}

impl ObservedSample {
    /// Geometry if it is present and its elevation is physically meaningful.
    #[inline]
    pub fn valid_observation(&self) -> Option<&RelativeObservation> {
        self.relative_to_observer
            .as_ref()
            .filter(|rel| rel.has_valid_elevation())
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.valid_observation().is_some_and(|rel| rel.is_visible)
    }
}

/// Per-satellite visibility statistics over a timeseries.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisibilitySummary {
    pub total_points: usize,
    pub valid_points: usize,
    pub visible_points: usize,
    /// `visible_points / total_points`, in percent.
    pub visibility_percentage: f64,
    pub max_elevation_deg: Degree,
    pub min_elevation_deg: Degree,
    pub avg_elevation_deg: Degree,
}

impl VisibilitySummary {
    /// Summarize a timeseries; elevation statistics only use samples with valid geometry.
    ///
    /// With no valid sample the elevation fields are zero.
    pub fn from_samples(samples: &[ObservedSample]) -> Self {
        let total_points = samples.len();
        let mut valid_points = 0usize;
        let mut visible_points = 0usize;
        let mut max_el = f64::NEG_INFINITY;
        let mut min_el = f64::INFINITY;
        let mut sum_el = 0.0;

        for rel in samples.iter().filter_map(ObservedSample::valid_observation) {
            valid_points += 1;
            if rel.is_visible {
                visible_points += 1;
            }
            max_el = max_el.max(rel.elevation_deg);
            min_el = min_el.min(rel.elevation_deg);
            sum_el += rel.elevation_deg;
        }

        if valid_points == 0 {
            return VisibilitySummary {
                total_points,
                ..Default::default()
            };
        }

        VisibilitySummary {
            total_points,
            valid_points,
            visible_points,
            visibility_percentage: if total_points > 0 {
                visible_points as f64 / total_points as f64 * 100.0
            } else {
                0.0
            },
            max_elevation_deg: max_el,
            min_elevation_deg: min_el,
            avg_elevation_deg: sum_el / valid_points as f64,
        }
    }

    pub fn invalid_points(&self) -> usize {
        self.total_points - self.valid_points
    }
}

/// Validated satellite as handed to the visibility calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteInput {
    pub id: SatelliteId,
    pub constellation: Constellation,
    pub position_timeseries: Vec<PositionSample>,
}

impl SatelliteInput {
    pub fn new(
        id: impl Into<SatelliteId>,
        constellation: Constellation,
        position_timeseries: Vec<PositionSample>,
    ) -> Self {
        Self {
            id: id.into(),
            constellation,
            position_timeseries,
        }
    }
}

/// Upstream sample with an ISO-8601 string timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPositionSample {
    pub timestamp: String,
    pub geodetic: Geodetic,
}

/// Upstream satellite record, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSatelliteRecord {
    #[serde(alias = "satellite_id", alias = "name")]
    pub id: SatelliteId,
    pub constellation: String,
    #[serde(default)]
    pub position_timeseries: Vec<RawPositionSample>,
}

impl TryFrom<RawSatelliteRecord> for SatelliteInput {
    type Error = Rejection;

    /// Parse every timestamp; the first unparsable one rejects the whole record.
    fn try_from(raw: RawSatelliteRecord) -> Result<Self, Self::Error> {
        let constellation = Constellation::from(raw.constellation.as_str());
        let mut samples = Vec::with_capacity(raw.position_timeseries.len());
        for (index, sample) in raw.position_timeseries.into_iter().enumerate() {
            let timestamp = parse_utc_timestamp(&sample.timestamp).map_err(|_| {
                Rejection::new(
                    raw.id.clone(),
                    constellation.clone(),
                    RejectionReason::InvalidTimestamp {
                        index,
                        value: sample.timestamp.clone(),
                    },
                )
            })?;
            samples.push(PositionSample {
                timestamp,
                geodetic: sample.geodetic,
            });
        }
        Ok(SatelliteInput::new(raw.id, constellation, samples))
    }
}

/// Outcome of [`ingest_records`]: validated satellites plus the records that could not be parsed.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub satellites: Vec<SatelliteInput>,
    pub rejected: Vec<Rejection>,
}

/// Validate a batch of upstream records.
pub fn ingest_records(records: impl IntoIterator<Item = RawSatelliteRecord>) -> Ingested {
    let mut out = Ingested::default();
    for record in records {
        match SatelliteInput::try_from(record) {
            Ok(sat) => out.satellites.push(sat),
            Err(rejection) => {
                tracing::warn!(id = %rejection.id, reason = %rejection.reason, "record rejected at ingestion");
                out.rejected.push(rejection);
            }
        }
    }
    out
}

/// Per-satellite record produced by the visibility calculator and refined by later stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteTrack {
    pub id: SatelliteId,
    pub constellation: Constellation,
    pub position_timeseries: Vec<ObservedSample>,
    pub visibility_summary: VisibilitySummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_filtering: Option<ElevationFilteringInfo>,
}

impl SatelliteTrack {
    /// Build a track and compute its summary.
    pub fn new(
        id: impl Into<SatelliteId>,
        constellation: Constellation,
        position_timeseries: Vec<ObservedSample>,
    ) -> Self {
        let visibility_summary = VisibilitySummary::from_samples(&position_timeseries);
        Self {
            id: id.into(),
            constellation,
            position_timeseries,
            visibility_summary,
            elevation_filtering: None,
        }
    }

    pub fn first_timestamp(&self) -> Option<Epoch> {
        self.position_timeseries.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<Epoch> {
        self.position_timeseries.last().map(|s| s.timestamp)
    }
}

#[cfg(test)]
mod satellite_test {
    use super::*;
    use crate::time::shift_seconds;

    fn sample(t: f64, el: f64, visible: bool) -> ObservedSample {
        ObservedSample {
            timestamp: shift_seconds(Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0), t),
            geodetic: Geodetic::new(0.0, 0.0, 550.0),
            relative_to_observer: Some(RelativeObservation {
                elevation_deg: el,
                azimuth_deg: 0.0,
                range_km: 1000.0,
                is_visible: visible,
                quality_tier: None,
            }),
        }
    }

    #[test]
    fn summary_ignores_invalid_elevations() {
        let mut missing = sample(3.0, 0.0, false);
        missing.relative_to_observer = None;
        let samples = vec![
            sample(0.0, -10.0, false),
            sample(1.0, 20.0, true),
            sample(2.0, -999.0, false),
            missing,
        ];
        let summary = VisibilitySummary::from_samples(&samples);
        assert_eq!(summary.total_points, 4);
        assert_eq!(summary.valid_points, 2);
        assert_eq!(summary.invalid_points(), 2);
        assert_eq!(summary.visible_points, 1);
        assert_eq!(summary.visibility_percentage, 25.0);
        assert_eq!(summary.max_elevation_deg, 20.0);
        assert_eq!(summary.min_elevation_deg, -10.0);
        assert_eq!(summary.avg_elevation_deg, 5.0);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        assert_eq!(VisibilitySummary::from_samples(&[]), VisibilitySummary::default());
    }

    #[test]
    fn raw_record_rejects_bad_timestamp() {
        let raw = RawSatelliteRecord {
            id: "STARLINK-1007".into(),
            constellation: "Starlink".into(),
            position_timeseries: vec![
                RawPositionSample {
                    timestamp: "2025-09-18T00:00:00Z".into(),
                    geodetic: Geodetic::new(10.0, 120.0, 550.0),
                },
                RawPositionSample {
                    timestamp: "yesterday".into(),
                    geodetic: Geodetic::new(10.5, 120.5, 550.0),
                },
            ],
        };
        let ingested = ingest_records(vec![raw]);
        assert!(ingested.satellites.is_empty());
        assert_eq!(
            ingested.rejected[0].reason,
            RejectionReason::InvalidTimestamp {
                index: 1,
                value: "yesterday".into()
            }
        );
        assert_eq!(ingested.rejected[0].constellation, Constellation::Starlink);
    }

    #[test]
    fn quality_tiers_are_ordered() {
        assert!(QualityTier::Preferred > QualityTier::Standard);
        assert!(QualityTier::Standard > QualityTier::Critical);
    }
}
