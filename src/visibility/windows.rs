//! # Visibility window detection and merging
//!
//! A **window** (pass) is a maximal run of visible samples. Detection is a two-state machine
//! walked once over the time-ordered samples:
//!
//! ```text
//!            visible                       !visible or cadence break
//! NotVisible ───────▶ Visible{start} ───────────────────────────▶ emit run
//!     ▲                                                              │
//!     └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Besides an invisible sample, a jump in time larger than `cadence_gap_factor × median cadence`
//! also closes a run. This matters for filtered tracks, where below-threshold samples have been
//! removed and only the time gap remains.
//!
//! Runs separated by at most `max_gap_seconds` (end of one to start of the next) are then merged
//! into a single window; the merged window keeps its constituent runs as `segments` so that
//! elevation statistics only ever read visible samples.
use std::ops::Range;

use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, Second};
use crate::observers::topocentric::normalize_azimuth;
use crate::satellite::{ObservedSample, RelativeObservation};
use crate::time::seconds_between;

use super::classification::{
    classify_trajectory, ClassificationRules, HandoverSuitability, PassQuality, TrajectoryType,
    WindowFeatures,
};

enum PassState {
    NotVisible,
    Visible { start: usize },
}

/// Median spacing between consecutive samples, `None` with fewer than two samples.
pub fn median_cadence(samples: &[ObservedSample]) -> Option<Second> {
    let mut steps: Vec<Second> = samples
        .iter()
        .tuple_windows()
        .map(|(a, b)| seconds_between(a.timestamp, b.timestamp))
        .filter(|dt| *dt > 0.0)
        .collect();
    if steps.is_empty() {
        return None;
    }
    let mid = steps.len() / 2;
    let (_, median, _) = steps.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*median)
}

/// Index ranges of maximal visible runs.
pub fn detect_runs(samples: &[ObservedSample], cadence_gap_factor: f64) -> Vec<Range<usize>> {
    let max_step = median_cadence(samples).map_or(f64::INFINITY, |c| c * cadence_gap_factor);

    let mut runs = Vec::new();
    let mut state = PassState::NotVisible;
    for (i, sample) in samples.iter().enumerate() {
        let visible = sample.is_visible();
        let time_break = i > 0 && seconds_between(samples[i - 1].timestamp, sample.timestamp) > max_step;

        state = match state {
            PassState::NotVisible if visible => PassState::Visible { start: i },
            PassState::NotVisible => PassState::NotVisible,
            PassState::Visible { start } if !visible => {
                runs.push(start..i);
                PassState::NotVisible
            }
            PassState::Visible { start } if time_break => {
                runs.push(start..i);
                PassState::Visible { start: i }
            }
            visible_state => visible_state,
        };
    }
    if let PassState::Visible { start } = state {
        runs.push(start..samples.len());
    }
    runs
}

/// One window as a list of visible runs (index ranges into the sample slice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpan {
    pub segments: Vec<Range<usize>>,
}

impl WindowSpan {
    pub fn first_index(&self) -> usize {
        self.segments.first().map_or(0, |r| r.start)
    }

    pub fn last_index(&self) -> usize {
        self.segments.last().map_or(0, |r| r.end.saturating_sub(1))
    }

    pub fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.segments.iter().flat_map(|r| r.clone())
    }
}

/// Merge runs whose separation is at most `max_gap_seconds`.
///
/// The separation is measured from the last sample of a run to the first sample of the next.
pub fn merge_runs(samples: &[ObservedSample], runs: Vec<Range<usize>>, max_gap_seconds: Second) -> Vec<WindowSpan> {
    let mut spans: Vec<WindowSpan> = Vec::with_capacity(runs.len());
    for run in runs.into_iter().filter(|r| !r.is_empty()) {
        if let Some(last) = spans.last_mut() {
            let gap = seconds_between(samples[last.last_index()].timestamp, samples[run.start].timestamp);
            if gap <= max_gap_seconds {
                tracing::trace!(gap, "merging visibility runs");
                last.segments.push(run);
                continue;
            }
        }
        spans.push(WindowSpan { segments: vec![run] });
    }
    spans
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzimuthProfile {
    pub start_deg: Degree,
    pub peak_deg: Degree,
    pub end_deg: Degree,
    /// Sum of absolute azimuth changes, wrapping through north.
    pub total_sweep_deg: Degree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeProfile {
    pub min_km: Kilometer,
    pub max_km: Kilometer,
    pub at_peak_km: Kilometer,
}

/// Elevation change statistics in degrees and degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationRate {
    pub total_change_deg: Degree,
    pub min_deg_per_s: f64,
    pub max_deg_per_s: f64,
    pub avg_deg_per_s: f64,
}

/// A characterized pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityWindow {
    pub start: Epoch,
    pub end: Epoch,
    pub duration_seconds: Second,
    pub sample_count: usize,
    /// Total time spent in merged gaps.
    pub merged_gap_seconds: Second,
    pub min_elevation_deg: Degree,
    pub max_elevation_deg: Degree,
    pub avg_elevation_deg: Degree,
    pub high_elevation_fraction: f64,
    pub azimuth: AzimuthProfile,
    pub range: RangeProfile,
    pub elevation_rate: ElevationRate,
    pub trajectory_type: TrajectoryType,
    pub pass_quality: PassQuality,
    pub handover_suitability: HandoverSuitability,
    pub is_valid_pass: bool,
}

impl VisibilityWindow {
    /// Whether `t` falls within `[start, end]`.
    pub fn contains(&self, t: Epoch) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}

fn azimuth_step(a: Degree, b: Degree) -> Degree {
    let d = normalize_azimuth(b - a);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Build a [`VisibilityWindow`] from a span over `samples`.
///
/// Returns `None` for a span without any valid visible sample.
pub fn characterize(
    samples: &[ObservedSample],
    span: &WindowSpan,
    rules: &ClassificationRules,
    min_pass_duration: Second,
) -> Option<VisibilityWindow> {
    let points: Vec<(Epoch, RelativeObservation)> = span
        .visible_indices()
        .filter_map(|i| samples.get(i))
        .filter_map(|s| s.valid_observation().map(|rel| (s.timestamp, *rel)))
        .collect();
    let (first, last) = (points.first()?, points.last()?);

    let elevations: Vec<Degree> = points.iter().map(|(_, rel)| rel.elevation_deg).collect();
    let (peak_idx, peak) = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.1.elevation_deg.total_cmp(&b.1.elevation_deg))?;
    let min_elevation_deg = elevations.iter().copied().fold(f64::INFINITY, f64::min);
    let max_elevation_deg = peak.1.elevation_deg;
    let avg_elevation_deg = elevations.iter().sum::<f64>() / elevations.len() as f64;
    let high_elevation_fraction = elevations
        .iter()
        .filter(|&&e| e >= rules.high_elevation_deg)
        .count() as f64
        / elevations.len() as f64;

    let duration_seconds = seconds_between(first.0, last.0);
    let merged_gap_seconds: Second = span
        .segments
        .iter()
        .tuple_windows()
        .map(|(a, b)| seconds_between(samples[a.end - 1].timestamp, samples[b.start].timestamp))
        .sum();

    let (min_km, max_km) = points
        .iter()
        .map(|(_, rel)| rel.range_km)
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()?;

    let rates: Vec<f64> = points
        .iter()
        .tuple_windows()
        .filter_map(|((ta, a), (tb, b))| {
            let dt = seconds_between(*ta, *tb);
            (dt > 0.0).then(|| (b.elevation_deg - a.elevation_deg) / dt)
        })
        .collect();
    let elevation_rate = if rates.is_empty() {
        ElevationRate::default()
    } else {
        ElevationRate {
            total_change_deg: last.1.elevation_deg - first.1.elevation_deg,
            min_deg_per_s: rates.iter().copied().fold(f64::INFINITY, f64::min),
            max_deg_per_s: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_deg_per_s: rates.iter().sum::<f64>() / rates.len() as f64,
        }
    };

    let features = WindowFeatures {
        duration: duration_seconds,
        max_elevation: max_elevation_deg,
        avg_elevation: avg_elevation_deg,
        high_elevation_fraction,
    };

    Some(VisibilityWindow {
        start: first.0,
        end: last.0,
        duration_seconds,
        sample_count: points.len(),
        merged_gap_seconds,
        min_elevation_deg,
        max_elevation_deg,
        avg_elevation_deg,
        high_elevation_fraction,
        azimuth: AzimuthProfile {
            start_deg: first.1.azimuth_deg,
            peak_deg: peak.1.azimuth_deg,
            end_deg: last.1.azimuth_deg,
            total_sweep_deg: points
                .iter()
                .tuple_windows()
                .map(|((_, a), (_, b))| azimuth_step(a.azimuth_deg, b.azimuth_deg))
                .sum(),
        },
        range: RangeProfile {
            min_km,
            max_km,
            at_peak_km: points[peak_idx].1.range_km,
        },
        elevation_rate,
        trajectory_type: classify_trajectory(&elevations),
        pass_quality: rules.pass_quality(&features),
        handover_suitability: rules.handover_suitability(&features),
        is_valid_pass: duration_seconds >= min_pass_duration,
    })
}
