//! # Batch visibility calculation
//!
//! Turns propagated geodetic timeseries into observer-relative tracks.
//!
//! For every sample of every satellite the [`VisibilityCalculator`] computes elevation, azimuth
//! and slant range through [`ObserverLocation::look_angles`], applies the raw horizon test
//! (`elevation ≥ 0°`), and summarizes each track in a [`VisibilitySummary`].
//!
//! Result model
//! -----------------
//! ```text
//! BatchVisibilityResult
//! ├─ satellites: SatelliteId → SatelliteTrack   (at least one valid sample)
//! ├─ excluded:   Vec<Rejection>                 (empty / fully malformed / duplicate id)
//! └─ batch_statistics                           (counts include excluded satellites)
//! ```
//!
//! Malformed samples stay in the track with `relative_to_observer = None`; only a satellite with
//! **zero** valid samples is excluded. An empty batch yields a well-formed result with
//! `total_satellites = 0`.
//!
//! Coverage timeline
//! -----------------
//! [`BatchVisibilityResult::coverage_timeline`] counts, for each analysis instant, how many
//! satellites are above the horizon at their nearest sample.
use std::collections::HashSet;

use hifitime::Epoch;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::constants::{SatelliteMap, Second};
use crate::observers::ObserverLocation;
use crate::pool_errors::{Rejection, RejectionReason};
use crate::satellite::{
    ObservedSample, RelativeObservation, SatelliteInput, SatelliteTrack, VisibilitySummary,
};
use crate::time::{cmp_epochs, seconds_between};

use super::ValidationReport;

/// Default tolerance between an analysis instant and the nearest sample (seconds).
pub const DEFAULT_TIMELINE_TOLERANCE: Second = 60.0;

/// Batch-level counters of a [`VisibilityCalculator::calculate_batch`] run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BatchStatistics {
    /// Satellites received, excluded ones included.
    pub total_satellites: usize,
    pub satellites_processed: usize,
    pub satellites_excluded: usize,
    /// Satellites with at least one sample above the horizon.
    pub satellites_with_visibility: usize,
    /// `satellites_with_visibility / total_satellites`, in percent.
    pub visibility_success_rate: f64,
    pub total_points: usize,
    pub valid_points: usize,
    pub invalid_points: usize,
    pub visible_points: usize,
}

/// Output of [`VisibilityCalculator::calculate_batch`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchVisibilityResult {
    pub satellites: SatelliteMap<SatelliteTrack>,
    pub excluded: Vec<Rejection>,
    pub batch_statistics: BatchStatistics,
}

/// Concurrent visibility at one analysis instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoveragePoint {
    pub timestamp: Epoch,
    pub visible_count: usize,
}

/// Number of concurrently visible satellites over time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoverageTimeline {
    pub points: Vec<CoveragePoint>,
    pub max_visible: usize,
    pub min_visible: usize,
    pub avg_visible: f64,
    /// Fraction of instants with at least one visible satellite, in `[0, 1]`.
    pub coverage_rate: f64,
}

/// Computes observer-relative geometry for batches of satellites.
#[derive(Debug, Clone)]
pub struct VisibilityCalculator {
    observer: ObserverLocation,
}

impl VisibilityCalculator {
    pub fn new(observer: ObserverLocation) -> Self {
        Self { observer }
    }

    pub fn observer(&self) -> &ObserverLocation {
        &self.observer
    }

    /// Enrich one satellite's timeseries.
    ///
    /// Samples are ordered by timestamp first. A sample whose geometry cannot be computed is kept
    /// with `relative_to_observer = None`.
    ///
    /// Errors
    /// ----------
    /// * [`RejectionReason::EmptyTimeseries`] if there is no sample at all.
    /// * [`RejectionReason::NoValidSamples`] if every sample is malformed.
    pub fn track_satellite(&self, input: &SatelliteInput) -> Result<SatelliteTrack, RejectionReason> {
        if input.position_timeseries.is_empty() {
            return Err(RejectionReason::EmptyTimeseries);
        }

        let samples: Vec<ObservedSample> = input
            .position_timeseries
            .iter()
            .sorted_by(|a, b| cmp_epochs(&a.timestamp, &b.timestamp))
            .map(|sample| ObservedSample {
                timestamp: sample.timestamp,
                geodetic: sample.geodetic,
                relative_to_observer: self
                    .observer
                    .look_angles(&sample.geodetic)
                    .map(RelativeObservation::from_look_angles),
            })
            .collect();

        let track = SatelliteTrack::new(input.id.clone(), input.constellation.clone(), samples);
        if track.visibility_summary.valid_points == 0 {
            return Err(RejectionReason::NoValidSamples {
                total: track.visibility_summary.total_points,
            });
        }
        Ok(track)
    }

    /// Compute visibility for every satellite of the batch.
    ///
    /// Never fails: problems with individual satellites end up in
    /// [`BatchVisibilityResult::excluded`]. When an id appears twice, the first occurrence wins
    /// and the later ones are excluded as [`RejectionReason::DuplicateId`].
    pub fn calculate_batch(&self, satellites: &[SatelliteInput]) -> BatchVisibilityResult {
        let mut result = BatchVisibilityResult::default();
        result.batch_statistics.total_satellites = satellites.len();

        let mut seen = HashSet::with_capacity(satellites.len());
        let mut unique = Vec::with_capacity(satellites.len());
        for sat in satellites {
            if seen.insert(sat.id.as_str()) {
                unique.push(sat);
            } else {
                result.excluded.push(Rejection::new(
                    sat.id.clone(),
                    sat.constellation.clone(),
                    RejectionReason::DuplicateId,
                ));
            }
        }

        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = unique
            .par_iter()
            .map(|sat| (*sat, self.track_satellite(sat)))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = unique
            .iter()
            .map(|sat| (*sat, self.track_satellite(sat)))
            .collect();

        let stats = &mut result.batch_statistics;
        for (sat, outcome) in outcomes {
            match outcome {
                Ok(track) => {
                    let summary = &track.visibility_summary;
                    stats.satellites_processed += 1;
                    stats.total_points += summary.total_points;
                    stats.valid_points += summary.valid_points;
                    stats.invalid_points += summary.invalid_points();
                    stats.visible_points += summary.visible_points;
                    if summary.visible_points > 0 {
                        stats.satellites_with_visibility += 1;
                    }
                    if summary.invalid_points() > 0 {
                        debug!(
                            id = %track.id,
                            invalid = summary.invalid_points(),
                            "malformed samples flagged"
                        );
                    }
                    result.satellites.insert(track.id.clone(), track);
                }
                Err(reason) => {
                    stats.total_points += sat.position_timeseries.len();
                    stats.invalid_points += sat.position_timeseries.len();
                    warn!(id = %sat.id, %reason, "satellite excluded from visibility batch");
                    result.excluded.push(Rejection::new(
                        sat.id.clone(),
                        sat.constellation.clone(),
                        reason,
                    ));
                }
            }
        }

        stats.satellites_excluded = result.excluded.len();
        stats.visibility_success_rate = if stats.total_satellites > 0 {
            stats.satellites_with_visibility as f64 / stats.total_satellites as f64 * 100.0
        } else {
            0.0
        };

        info!(
            total = stats.total_satellites,
            processed = stats.satellites_processed,
            with_visibility = stats.satellites_with_visibility,
            excluded = stats.satellites_excluded,
            "visibility batch computed"
        );
        result
    }
}

/// Sample of `samples` (sorted by time) closest to `t`, ties going to the earlier one.
pub(crate) fn nearest_sample(samples: &[ObservedSample], t: Epoch) -> Option<&ObservedSample> {
    let idx = samples.partition_point(|s| s.timestamp < t);
    let before = idx.checked_sub(1).and_then(|i| samples.get(i));
    let after = samples.get(idx);
    match (before, after) {
        (Some(b), Some(a)) => {
            if seconds_between(b.timestamp, t) <= seconds_between(t, a.timestamp) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, a) => b.or(a),
    }
}

impl BatchVisibilityResult {
    /// Count concurrently visible satellites at each instant.
    ///
    /// Arguments
    /// -----------------
    /// * `instants`: analysis instants; `None` uses the sorted union of every sample timestamp.
    /// * `tolerance`: a satellite only counts if its nearest sample is within this many seconds.
    pub fn coverage_timeline(&self, instants: Option<&[Epoch]>, tolerance: Second) -> CoverageTimeline {
        let instants: Vec<Epoch> = match instants {
            Some(given) => given.to_vec(),
            None => self
                .satellites
                .values()
                .flat_map(|track| track.position_timeseries.iter().map(|s| s.timestamp))
                .sorted_by(cmp_epochs)
                .dedup()
                .collect(),
        };
        if instants.is_empty() {
            return CoverageTimeline::default();
        }

        let points: Vec<CoveragePoint> = instants
            .iter()
            .map(|&t| {
                let visible_count = self
                    .satellites
                    .values()
                    .filter(|track| {
                        nearest_sample(&track.position_timeseries, t).is_some_and(|s| {
                            seconds_between(s.timestamp, t).abs() <= tolerance && s.is_visible()
                        })
                    })
                    .count();
                CoveragePoint {
                    timestamp: t,
                    visible_count,
                }
            })
            .collect();

        let counts = points.iter().map(|p| p.visible_count);
        let max_visible = counts.clone().max().unwrap_or(0);
        let min_visible = counts.clone().min().unwrap_or(0);
        let avg_visible = counts.clone().sum::<usize>() as f64 / points.len() as f64;
        let covered = counts.filter(|&c| c > 0).count();

        CoverageTimeline {
            max_visible,
            min_visible,
            avg_visible,
            coverage_rate: covered as f64 / points.len() as f64,
            points,
        }
    }
}

/// Consistency checks on a calculator result.
///
/// Verifies angle and range domains, time ordering, per-satellite summaries and batch counters.
pub fn validate_batch(result: &BatchVisibilityResult) -> ValidationReport {
    let mut issues = Vec::new();

    for track in result.satellites.values() {
        let ordered = track
            .position_timeseries
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.timestamp <= b.timestamp);
        if !ordered {
            issues.push(format!("{}: timeseries is not time-ordered", track.id));
        }

        for rel in track.position_timeseries.iter().filter_map(|s| s.relative_to_observer) {
            if !rel.has_valid_elevation() {
                issues.push(format!("{}: elevation {} out of range", track.id, rel.elevation_deg));
            }
            if !(0.0..360.0).contains(&rel.azimuth_deg) {
                issues.push(format!("{}: azimuth {} out of range", track.id, rel.azimuth_deg));
            }
            if rel.range_km.partial_cmp(&0.0) != Some(std::cmp::Ordering::Greater) {
                issues.push(format!("{}: non-positive range {}", track.id, rel.range_km));
            }
        }

        if VisibilitySummary::from_samples(&track.position_timeseries) != track.visibility_summary {
            issues.push(format!("{}: visibility summary is stale", track.id));
        }
    }

    let stats = &result.batch_statistics;
    if stats.satellites_processed != result.satellites.len() {
        issues.push(format!(
            "processed count {} does not match {} tracks",
            stats.satellites_processed,
            result.satellites.len()
        ));
    }
    if stats.satellites_processed + stats.satellites_excluded != stats.total_satellites {
        issues.push("processed + excluded does not add up to total_satellites".into());
    }

    ValidationReport::from_issues(issues)
}

#[cfg(test)]
mod calculator_test {
    use super::*;
    use crate::constants::Constellation;
    use crate::satellite::{Geodetic, PositionSample};
    use crate::time::shift_seconds;

    fn observer() -> ObserverLocation {
        ObserverLocation::new(24.9441667, 121.3713889, 50.0).unwrap()
    }

    fn t0() -> Epoch {
        Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0)
    }

    /// Satellite sliding north along the observer's meridian, 30 s cadence.
    fn meridian_pass(id: &str, lat_offsets: &[f64]) -> SatelliteInput {
        let samples = lat_offsets
            .iter()
            .enumerate()
            .map(|(i, dlat)| PositionSample {
                timestamp: shift_seconds(t0(), 30.0 * i as f64),
                geodetic: Geodetic::new(24.9441667 + dlat, 121.3713889, 550.0),
            })
            .collect();
        SatelliteInput::new(id, Constellation::Starlink, samples)
    }

    #[test]
    fn empty_batch_is_well_formed() {
        let calc = VisibilityCalculator::new(observer());
        let result = calc.calculate_batch(&[]);
        assert_eq!(result.batch_statistics.total_satellites, 0);
        assert_eq!(result.batch_statistics.visibility_success_rate, 0.0);
        assert!(result.satellites.is_empty());
        assert!(validate_batch(&result).passed);
    }

    #[test]
    fn excluded_satellites_are_counted() {
        let calc = VisibilityCalculator::new(observer());
        let good = meridian_pass("STARLINK-1", &[-3.0, 0.0, 3.0]);
        let empty = SatelliteInput::new("STARLINK-2", Constellation::Starlink, vec![]);
        let broken = SatelliteInput::new(
            "STARLINK-3",
            Constellation::Starlink,
            vec![PositionSample {
                timestamp: t0(),
                geodetic: Geodetic::new(f64::NAN, 0.0, 550.0),
            }],
        );
        let dup = meridian_pass("STARLINK-1", &[0.0]);

        let result = calc.calculate_batch(&[good, empty, broken, dup]);
        let stats = result.batch_statistics;
        assert_eq!(stats.total_satellites, 4);
        assert_eq!(stats.satellites_processed, 1);
        assert_eq!(stats.satellites_excluded, 3);
        assert_eq!(stats.satellites_with_visibility, 1);
        assert_eq!(stats.visibility_success_rate, 25.0);

        let reasons: Vec<_> = result.excluded.iter().map(|r| r.reason.clone()).collect();
        assert!(reasons.contains(&RejectionReason::EmptyTimeseries));
        assert!(reasons.contains(&RejectionReason::NoValidSamples { total: 1 }));
        assert!(reasons.contains(&RejectionReason::DuplicateId));
        assert!(validate_batch(&result).passed);
    }

    #[test]
    fn malformed_samples_are_flagged_not_dropped() {
        let calc = VisibilityCalculator::new(observer());
        let mut sat = meridian_pass("STARLINK-9", &[-1.0, 0.0, 1.0]);
        sat.position_timeseries[1].geodetic.altitude_km = f64::INFINITY;
        let track = calc.track_satellite(&sat).unwrap();
        assert_eq!(track.position_timeseries.len(), 3);
        assert!(track.position_timeseries[1].relative_to_observer.is_none());
        assert_eq!(track.visibility_summary.invalid_points(), 1);
    }

    #[test]
    fn unordered_input_is_sorted() {
        let calc = VisibilityCalculator::new(observer());
        let mut sat = meridian_pass("STARLINK-5", &[-2.0, -1.0, 0.0, 1.0]);
        sat.position_timeseries.reverse();
        let track = calc.track_satellite(&sat).unwrap();
        assert!(track
            .position_timeseries
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn elevation_peaks_at_closest_approach() {
        let calc = VisibilityCalculator::new(observer());
        let track = calc
            .track_satellite(&meridian_pass("STARLINK-7", &[-6.0, -3.0, 0.0, 3.0, 6.0]))
            .unwrap();
        let els: Vec<f64> = track
            .position_timeseries
            .iter()
            .map(|s| s.relative_to_observer.unwrap().elevation_deg)
            .collect();
        assert!(els[2] > 89.9);
        assert!(els[0] < els[1] && els[1] < els[2]);
        assert!(els[4] < els[3] && els[3] < els[2]);
        assert!(els.iter().all(|e| (-90.0..=90.0).contains(e)));
    }

    #[test]
    fn coverage_timeline_counts_concurrent_satellites() {
        let calc = VisibilityCalculator::new(observer());
        // visible for the first two samples, then far below the horizon
        let a = meridian_pass("A", &[0.0, 1.0, -60.0, -60.0]);
        let b = meridian_pass("B", &[-60.0, 0.0, 0.0, -60.0]);
        let result = calc.calculate_batch(&[a, b]);

        let timeline = result.coverage_timeline(None, DEFAULT_TIMELINE_TOLERANCE);
        let counts: Vec<usize> = timeline.points.iter().map(|p| p.visible_count).collect();
        assert_eq!(counts, vec![1, 2, 1, 0]);
        assert_eq!(timeline.max_visible, 2);
        assert_eq!(timeline.min_visible, 0);
        assert_eq!(timeline.avg_visible, 1.0);
        assert_eq!(timeline.coverage_rate, 0.75);

        // an instant far from any sample sees nobody
        let far = [shift_seconds(t0(), 3600.0)];
        let timeline = result.coverage_timeline(Some(&far), 60.0);
        assert_eq!(timeline.points[0].visible_count, 0);
    }
}
