//! # Visibility analysis
//!
//! Detects and characterizes passes for every satellite, derives handover recommendations, and
//! aggregates global statistics over the whole candidate set.
//!
//! Per satellite
//! -----------------
//! 1. [`detect_runs`] – maximal visible runs (state machine, cadence breaks).
//! 2. [`merge_runs`] – runs closer than `max_gap_seconds` become one window.
//! 3. [`characterize`] – elevation/azimuth/range profile, trajectory, pass quality, handover
//!    suitability, validity (`duration ≥ min_pass_duration_seconds`).
//! 4. [`SatelliteVisibilityStats`] and [`HandoverRecommendation`].
//!
//! Global
//! -----------------
//! [`GlobalVisibilityAnalysis`] counts windows, ranks the best passes, and clusters high-quality
//! windows into [`ObservationPeriod`]s: windows of at least
//! [`OptimalPeriodParams::min_quality`] whose start lies within `cluster_gap_seconds` of the
//! running cluster end are grouped together.
//!
//! Results are keyed by satellite id; iteration order is unspecified.
//! [`AnalysisResult::candidates_by_constellation`] returns a deterministic, id-sorted view.
use std::collections::BTreeMap;

use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::constants::{Constellation, Degree, SatelliteId, SatelliteMap, Second};
use crate::pool_errors::PoolError;
use crate::satellite::{SatelliteTrack, VisibilitySummary};
use crate::time::{cmp_epochs, seconds_between};

use super::classification::{ClassificationRules, HandoverSuitability, PassQuality};
use super::windows::{characterize, detect_runs, merge_runs, VisibilityWindow};
use super::ValidationReport;

/// Clustering of high-quality windows into observation periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimalPeriodParams {
    pub min_quality: PassQuality,
    pub cluster_gap_seconds: Second,
    pub min_windows: usize,
}

impl Default for OptimalPeriodParams {
    fn default() -> Self {
        Self {
            min_quality: PassQuality::Good,
            cluster_gap_seconds: 300.0,
            min_windows: 2,
        }
    }
}

/// Configuration of the [`VisibilityAnalyzer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    /// Runs separated by at most this gap are merged into one window.
    pub max_gap_seconds: Second,
    /// Shortest window counted as a valid pass.
    pub min_pass_duration_seconds: Second,
    /// A time step above `factor × median cadence` closes a run.
    pub cadence_gap_factor: f64,
    pub rules: ClassificationRules,
    pub optimal_periods: OptimalPeriodParams,
    /// Size of the global best-window ranking.
    pub best_windows: usize,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        AnalyzerParams {
            max_gap_seconds: 120.0,
            min_pass_duration_seconds: 60.0,
            cadence_gap_factor: 1.5,
            rules: ClassificationRules::default(),
            optimal_periods: OptimalPeriodParams::default(),
            best_windows: 5,
        }
    }
}

impl AnalyzerParams {
    pub fn builder() -> AnalyzerParamsBuilder {
        AnalyzerParamsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        let ge0 = |x: f64| matches!(x.partial_cmp(&0.0), Some(o) if o.is_ge());
        if !ge0(self.max_gap_seconds) {
            return Err(PoolError::InvalidConfiguration(
                "max_gap_seconds must be >= 0".into(),
            ));
        }
        if !ge0(self.min_pass_duration_seconds) {
            return Err(PoolError::InvalidConfiguration(
                "min_pass_duration_seconds must be >= 0".into(),
            ));
        }
        if self.cadence_gap_factor.partial_cmp(&1.0) != Some(std::cmp::Ordering::Greater) {
            return Err(PoolError::InvalidConfiguration(
                "cadence_gap_factor must be > 1".into(),
            ));
        }
        if !ge0(self.optimal_periods.cluster_gap_seconds) {
            return Err(PoolError::InvalidConfiguration(
                "cluster_gap_seconds must be >= 0".into(),
            ));
        }
        self.rules.validate()
    }
}

/// Builder for [`AnalyzerParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerParamsBuilder {
    params: AnalyzerParams,
}

impl AnalyzerParamsBuilder {
    pub fn max_gap_seconds(mut self, v: Second) -> Self {
        self.params.max_gap_seconds = v;
        self
    }
    pub fn min_pass_duration_seconds(mut self, v: Second) -> Self {
        self.params.min_pass_duration_seconds = v;
        self
    }
    pub fn cadence_gap_factor(mut self, v: f64) -> Self {
        self.params.cadence_gap_factor = v;
        self
    }
    pub fn rules(mut self, v: ClassificationRules) -> Self {
        self.params.rules = v;
        self
    }
    pub fn optimal_periods(mut self, v: OptimalPeriodParams) -> Self {
        self.params.optimal_periods = v;
        self
    }
    pub fn best_windows(mut self, v: usize) -> Self {
        self.params.best_windows = v;
        self
    }

    pub fn build(self) -> Result<AnalyzerParams, PoolError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverAdvantage {
    HighElevationPass,
    MultipleValidPasses,
    LongPasses,
    HighlySuitableWindows,
    HighVisibilityEfficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverIssue {
    NoValidPasses,
    LowMaximumElevation,
    ShortPasses,
    NoSuitableWindows,
    LowAverageElevation,
}

/// Whether and how strongly a satellite should be considered as a handover target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverRecommendation {
    pub is_candidate_for_handover: bool,
    /// Up to three suitable window indices, best first.
    pub recommended_windows: Vec<usize>,
    pub handover_priority: HandoverPriority,
    pub advantages: Vec<HandoverAdvantage>,
    pub issues: Vec<HandoverIssue>,
}

/// Aggregated pass statistics of one satellite.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SatelliteVisibilityStats {
    pub total_visibility_seconds: Second,
    pub pass_count: usize,
    pub valid_pass_count: usize,
    pub longest_pass_seconds: Second,
    pub highest_elevation_deg: Degree,
    /// Mean elevation over all window samples, weighted by sample count.
    pub avg_visible_elevation_deg: Degree,
    /// Visible samples over all samples of the track, in `[0, 1]`.
    pub visibility_efficiency: f64,
    /// Index of the best window (quality first, then peak elevation).
    pub best_pass_index: Option<usize>,
}

/// Analysis of one satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteAnalysis {
    pub id: SatelliteId,
    pub constellation: Constellation,
    pub visibility_summary: VisibilitySummary,
    /// First and last sample instants of the analyzed track.
    pub observed_span: Option<(Epoch, Epoch)>,
    pub enhanced_visibility_windows: Vec<VisibilityWindow>,
    pub satellite_analysis: SatelliteVisibilityStats,
    pub handover_recommendations: HandoverRecommendation,
}

/// Reference to a window in the global ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRef {
    pub satellite_id: SatelliteId,
    pub constellation: Constellation,
    pub window_index: usize,
    pub start: Epoch,
    pub end: Epoch,
    pub max_elevation_deg: Degree,
    pub pass_quality: PassQuality,
}

/// Cluster of high-quality windows close in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationPeriod {
    pub start: Epoch,
    pub end: Epoch,
    pub duration_minutes: f64,
    pub window_count: usize,
    pub satellite_count: usize,
    pub avg_peak_elevation_deg: Degree,
    /// Time covered by at least one window over the period span, in `[0, 1]`.
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GlobalVisibilityAnalysis {
    pub total_satellites: usize,
    pub satellites_with_windows: usize,
    pub handover_candidates: usize,
    pub total_windows: usize,
    pub valid_windows: usize,
    pub total_observation_minutes: f64,
    pub average_window_minutes: f64,
    pub quality_distribution: BTreeMap<PassQuality, usize>,
    pub best_windows: Vec<WindowRef>,
    pub optimal_periods: Vec<ObservationPeriod>,
}

/// Output of [`VisibilityAnalyzer::analyze`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub satellites: SatelliteMap<SatelliteAnalysis>,
    pub global: GlobalVisibilityAnalysis,
}

impl AnalysisResult {
    /// Analyses grouped per constellation, each group sorted by satellite id.
    pub fn candidates_by_constellation(&self) -> BTreeMap<Constellation, Vec<&SatelliteAnalysis>> {
        let mut groups: BTreeMap<Constellation, Vec<&SatelliteAnalysis>> = BTreeMap::new();
        for analysis in self.satellites.values() {
            groups
                .entry(analysis.constellation.clone())
                .or_default()
                .push(analysis);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| a.id.cmp(&b.id));
        }
        groups
    }
}

/// Pass detection and aggregation over filtered (or raw) tracks.
#[derive(Debug, Clone)]
pub struct VisibilityAnalyzer {
    params: AnalyzerParams,
}

impl VisibilityAnalyzer {
    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] if `params` does not validate.
    pub fn new(params: AnalyzerParams) -> Result<Self, PoolError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    /// Windows of one track, time-ordered and non-overlapping.
    pub fn windows_for(&self, track: &SatelliteTrack) -> Vec<VisibilityWindow> {
        let samples = &track.position_timeseries;
        let runs = detect_runs(samples, self.params.cadence_gap_factor);
        merge_runs(samples, runs, self.params.max_gap_seconds)
            .iter()
            .filter_map(|span| {
                characterize(
                    samples,
                    span,
                    &self.params.rules,
                    self.params.min_pass_duration_seconds,
                )
            })
            .collect()
    }

    pub fn analyze_track(&self, track: &SatelliteTrack) -> SatelliteAnalysis {
        let windows = self.windows_for(track);
        let stats = satellite_stats(track, &windows);
        let recommendation = recommend(&stats, &windows);
        SatelliteAnalysis {
            id: track.id.clone(),
            constellation: track.constellation.clone(),
            visibility_summary: track.visibility_summary,
            observed_span: track.first_timestamp().zip(track.last_timestamp()),
            enhanced_visibility_windows: windows,
            satellite_analysis: stats,
            handover_recommendations: recommendation,
        }
    }

    /// Analyze every track and compute the global view.
    pub fn analyze<'a>(&self, tracks: impl IntoIterator<Item = &'a SatelliteTrack>) -> AnalysisResult {
        let tracks: Vec<&SatelliteTrack> = tracks.into_iter().collect();

        #[cfg(feature = "parallel")]
        let analyses: Vec<SatelliteAnalysis> =
            tracks.par_iter().map(|t| self.analyze_track(t)).collect();
        #[cfg(not(feature = "parallel"))]
        let analyses: Vec<SatelliteAnalysis> = tracks.iter().map(|t| self.analyze_track(t)).collect();

        let satellites: SatelliteMap<SatelliteAnalysis> =
            analyses.into_iter().map(|a| (a.id.clone(), a)).collect();
        let global = global_analysis(&satellites, &self.params);

        info!(
            satellites = global.total_satellites,
            windows = global.total_windows,
            valid = global.valid_windows,
            handover_candidates = global.handover_candidates,
            "visibility analysis complete"
        );
        AnalysisResult { satellites, global }
    }
}

fn satellite_stats(track: &SatelliteTrack, windows: &[VisibilityWindow]) -> SatelliteVisibilityStats {
    if windows.is_empty() {
        return SatelliteVisibilityStats::default();
    }
    let total_visibility_seconds: Second = windows.iter().map(|w| w.duration_seconds).sum();
    let samples: usize = windows.iter().map(|w| w.sample_count).sum();
    let weighted_el: f64 = windows
        .iter()
        .map(|w| w.avg_elevation_deg * w.sample_count as f64)
        .sum();

    let summary = &track.visibility_summary;
    let visibility_efficiency = if summary.total_points > 0 {
        summary.visible_points as f64 / summary.total_points as f64
    } else {
        0.0
    };

    let best_pass_index = windows
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            a.pass_quality
                .cmp(&b.pass_quality)
                .then(a.max_elevation_deg.total_cmp(&b.max_elevation_deg))
        })
        .map(|(i, _)| i);

    SatelliteVisibilityStats {
        total_visibility_seconds,
        pass_count: windows.len(),
        valid_pass_count: windows.iter().filter(|w| w.is_valid_pass).count(),
        longest_pass_seconds: windows
            .iter()
            .map(|w| w.duration_seconds)
            .fold(0.0, f64::max),
        highest_elevation_deg: windows
            .iter()
            .map(|w| w.max_elevation_deg)
            .fold(f64::NEG_INFINITY, f64::max),
        avg_visible_elevation_deg: if samples > 0 {
            weighted_el / samples as f64
        } else {
            0.0
        },
        visibility_efficiency,
        best_pass_index,
    }
}

const RECOMMENDED_WINDOWS: usize = 3;

fn recommend(stats: &SatelliteVisibilityStats, windows: &[VisibilityWindow]) -> HandoverRecommendation {
    let mut suitable: Vec<usize> = windows
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_valid_pass && w.handover_suitability >= HandoverSuitability::Suitable)
        .map(|(i, _)| i)
        .collect();
    let highly = suitable
        .iter()
        .filter(|&&i| windows[i].handover_suitability == HandoverSuitability::HighlySuitable)
        .count();
    let is_candidate = !suitable.is_empty();

    let handover_priority = if suitable.len() >= 2 {
        HandoverPriority::High
    } else if is_candidate {
        HandoverPriority::Medium
    } else {
        HandoverPriority::Low
    };

    let mut advantages = Vec::new();
    if stats.highest_elevation_deg >= 45.0 {
        advantages.push(HandoverAdvantage::HighElevationPass);
    }
    if stats.valid_pass_count >= 2 {
        advantages.push(HandoverAdvantage::MultipleValidPasses);
    }
    if stats.longest_pass_seconds >= 300.0 {
        advantages.push(HandoverAdvantage::LongPasses);
    }
    if highly > 0 {
        advantages.push(HandoverAdvantage::HighlySuitableWindows);
    }
    if stats.visibility_efficiency >= 0.30 {
        advantages.push(HandoverAdvantage::HighVisibilityEfficiency);
    }

    let mut issues = Vec::new();
    if stats.valid_pass_count == 0 {
        issues.push(HandoverIssue::NoValidPasses);
    }
    if stats.pass_count > 0 && stats.highest_elevation_deg < 20.0 {
        issues.push(HandoverIssue::LowMaximumElevation);
    }
    if stats.pass_count > 0 && stats.longest_pass_seconds < 120.0 {
        issues.push(HandoverIssue::ShortPasses);
    }
    if !is_candidate {
        issues.push(HandoverIssue::NoSuitableWindows);
    }
    if stats.pass_count > 0 && stats.avg_visible_elevation_deg < 20.0 {
        issues.push(HandoverIssue::LowAverageElevation);
    }

    // stable: equal windows stay in time order
    suitable.sort_by(|&a, &b| {
        let (wa, wb) = (&windows[a], &windows[b]);
        wb.handover_suitability
            .cmp(&wa.handover_suitability)
            .then(wb.pass_quality.cmp(&wa.pass_quality))
            .then(wb.max_elevation_deg.total_cmp(&wa.max_elevation_deg))
    });
    suitable.truncate(RECOMMENDED_WINDOWS);

    HandoverRecommendation {
        is_candidate_for_handover: is_candidate,
        recommended_windows: suitable,
        handover_priority,
        advantages,
        issues,
    }
}

fn global_analysis(satellites: &SatelliteMap<SatelliteAnalysis>, params: &AnalyzerParams) -> GlobalVisibilityAnalysis {
    // sorted by id so rankings do not depend on hash order
    let ordered: Vec<&SatelliteAnalysis> = satellites.values().sorted_by(|a, b| a.id.cmp(&b.id)).collect();
    let all_windows: Vec<(&SatelliteAnalysis, usize, &VisibilityWindow)> = ordered
        .iter()
        .flat_map(|sat| {
            sat.enhanced_visibility_windows
                .iter()
                .enumerate()
                .map(move |(i, w)| (*sat, i, w))
        })
        .collect();

    let total_windows = all_windows.len();
    let total_seconds: Second = all_windows.iter().map(|(_, _, w)| w.duration_seconds).sum();
    let mut quality_distribution = BTreeMap::new();
    for (_, _, w) in &all_windows {
        *quality_distribution.entry(w.pass_quality).or_insert(0) += 1;
    }

    let best_windows = all_windows
        .iter()
        .sorted_by(|(_, _, a), (_, _, b)| b.max_elevation_deg.total_cmp(&a.max_elevation_deg))
        .take(params.best_windows)
        .map(|(sat, i, w)| WindowRef {
            satellite_id: sat.id.clone(),
            constellation: sat.constellation.clone(),
            window_index: *i,
            start: w.start,
            end: w.end,
            max_elevation_deg: w.max_elevation_deg,
            pass_quality: w.pass_quality,
        })
        .collect();

    GlobalVisibilityAnalysis {
        total_satellites: satellites.len(),
        satellites_with_windows: ordered
            .iter()
            .filter(|s| !s.enhanced_visibility_windows.is_empty())
            .count(),
        handover_candidates: ordered
            .iter()
            .filter(|s| s.handover_recommendations.is_candidate_for_handover)
            .count(),
        total_windows,
        valid_windows: all_windows.iter().filter(|(_, _, w)| w.is_valid_pass).count(),
        total_observation_minutes: total_seconds / 60.0,
        average_window_minutes: if total_windows > 0 {
            total_seconds / 60.0 / total_windows as f64
        } else {
            0.0
        },
        quality_distribution,
        best_windows,
        optimal_periods: optimal_periods(&all_windows, &params.optimal_periods),
    }
}

struct Cluster<'a> {
    start: Epoch,
    end: Epoch,
    covered_seconds: Second,
    members: Vec<(&'a SatelliteAnalysis, &'a VisibilityWindow)>,
}

impl Cluster<'_> {
    fn into_period(self) -> ObservationPeriod {
        let span = seconds_between(self.start, self.end);
        let satellite_count = self.members.iter().map(|(s, _)| s.id.as_str()).unique().count();
        let avg_peak = self.members.iter().map(|(_, w)| w.max_elevation_deg).sum::<f64>()
            / self.members.len() as f64;
        ObservationPeriod {
            start: self.start,
            end: self.end,
            duration_minutes: span / 60.0,
            window_count: self.members.len(),
            satellite_count,
            avg_peak_elevation_deg: avg_peak,
            efficiency: if span > 0.0 {
                (self.covered_seconds / span).min(1.0)
            } else {
                1.0
            },
        }
    }
}

/// Group high-quality windows that follow each other closely.
fn optimal_periods(
    windows: &[(&SatelliteAnalysis, usize, &VisibilityWindow)],
    params: &OptimalPeriodParams,
) -> Vec<ObservationPeriod> {
    let candidates = windows
        .iter()
        .filter(|(_, _, w)| w.pass_quality >= params.min_quality)
        .sorted_by(|(_, _, a), (_, _, b)| cmp_epochs(&a.start, &b.start));

    let mut clusters: Vec<Cluster> = Vec::new();
    for &(sat, _, w) in candidates {
        if let Some(current) = clusters.last_mut() {
            if seconds_between(current.end, w.start) <= params.cluster_gap_seconds {
                // union of intervals sorted by start
                if w.end > current.end {
                    let fresh_from = if w.start > current.end { w.start } else { current.end };
                    current.covered_seconds += seconds_between(fresh_from, w.end);
                    current.end = w.end;
                }
                current.members.push((sat, w));
                continue;
            }
        }
        clusters.push(Cluster {
            start: w.start,
            end: w.end,
            covered_seconds: w.duration_seconds,
            members: vec![(sat, w)],
        });
    }

    clusters
        .into_iter()
        .filter(|c| c.members.len() >= params.min_windows)
        .map(Cluster::into_period)
        .sorted_by(|a, b| b.window_count.cmp(&a.window_count).then(cmp_epochs(&a.start, &b.start)))
        .collect()
}

/// Structural checks on an analysis result.
///
/// Windows must be time-ordered, non-overlapping, with consistent elevation statistics, and the
/// per-satellite counters must match the window list.
pub fn validate_analysis(result: &AnalysisResult) -> ValidationReport {
    let mut issues = Vec::new();
    for sat in result.satellites.values() {
        let windows = &sat.enhanced_visibility_windows;
        for w in windows {
            if w.end < w.start || w.duration_seconds < 0.0 {
                issues.push(format!("{}: window ends before it starts", sat.id));
            }
            let ordered = w.min_elevation_deg <= w.avg_elevation_deg + 1e-9
                && w.avg_elevation_deg <= w.max_elevation_deg + 1e-9;
            if !ordered || w.min_elevation_deg < -90.0 || w.max_elevation_deg > 90.0 {
                issues.push(format!("{}: inconsistent window elevations", sat.id));
            }
        }
        if windows.iter().tuple_windows().any(|(a, b)| a.end >= b.start) {
            issues.push(format!("{}: overlapping or unordered windows", sat.id));
        }
        if sat.satellite_analysis.pass_count != windows.len() {
            issues.push(format!("{}: pass count does not match windows", sat.id));
        }
    }
    let total: usize = result
        .satellites
        .values()
        .map(|s| s.enhanced_visibility_windows.len())
        .sum();
    if total != result.global.total_windows {
        issues.push("global window count does not match per-satellite windows".into());
    }
    ValidationReport::from_issues(issues)
}
