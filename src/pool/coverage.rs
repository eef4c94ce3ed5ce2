//! # Time-slot coverage model
//!
//! The optimizer never looks at raw samples. Each candidate is reduced once to the set of time
//! slots in which it is visible (and in which it is a usable handover target), so that adding or
//! removing a satellite from a pool is an `O(slots)` update of per-slot counters.
//!
//! Slots
//! -----------------
//! Slot `i` is the instant `start + i × slot_seconds`, for `i` in `0..slot_count`, where
//! `[start, end]` is the union of the candidates' observed spans. A candidate occupies slot `i`
//! when one of its windows contains that instant.
//!
//! * **visible slot** – any window contains the instant.
//! * **handover slot** – a valid window with suitability ≥ [`HandoverSuitability::Suitable`]
//!   contains the instant.
//!
//! The signal proxy of a candidate is its average visible elevation over 90°, clamped to `[0, 1]`.
use hifitime::Epoch;
use tracing::debug;

use crate::constants::{SatelliteId, Second};
use crate::time::{cmp_epochs, seconds_between, shift_seconds};
use crate::visibility::analyzer::SatelliteAnalysis;
use crate::visibility::classification::HandoverSuitability;
use crate::visibility::windows::VisibilityWindow;

/// One candidate reduced to its slot occupancy.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProfile {
    pub id: SatelliteId,
    pub visible_slots: Vec<usize>,
    pub handover_slots: Vec<usize>,
    /// Elevation-based signal score in `[0, 1]`.
    pub signal: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageGrid {
    pub start: Option<Epoch>,
    pub slot_seconds: Second,
    pub slot_count: usize,
    pub candidates: Vec<CandidateProfile>,
}

fn span_of(analysis: &SatelliteAnalysis) -> Option<(Epoch, Epoch)> {
    analysis.observed_span.or_else(|| {
        let windows = &analysis.enhanced_visibility_windows;
        Some((windows.first()?.start, windows.last()?.end))
    })
}

/// Slot indices whose instant falls within one of `windows`.
fn occupied_slots<'a>(
    windows: impl Iterator<Item = &'a VisibilityWindow>,
    start: Epoch,
    slot_seconds: Second,
    slot_count: usize,
) -> Vec<usize> {
    let mut slots = Vec::new();
    for w in windows {
        let from = (seconds_between(start, w.start) / slot_seconds).ceil().max(0.0) as usize;
        let to = (seconds_between(start, w.end) / slot_seconds).floor();
        if to < 0.0 {
            continue;
        }
        let to = (to as usize).min(slot_count.saturating_sub(1));
        if from <= to && from < slot_count {
            slots.extend(from..=to);
        }
    }
    slots.sort_unstable();
    slots.dedup();
    slots
}

impl CoverageGrid {
    /// Build the grid for one constellation's candidates.
    ///
    /// Candidate order is preserved; callers pass id-sorted candidates for reproducible runs.
    pub fn build(candidates: &[&SatelliteAnalysis], slot_seconds: Second) -> Self {
        let spans: Vec<(Epoch, Epoch)> = candidates.iter().filter_map(|a| span_of(a)).collect();
        let start = spans.iter().map(|(s, _)| *s).min_by(cmp_epochs);
        let end = spans.iter().map(|(_, e)| *e).max_by(cmp_epochs);

        let slot_count = match (start, end) {
            (Some(s), Some(e)) => (seconds_between(s, e) / slot_seconds).floor() as usize + 1,
            _ => 0,
        };

        let candidates = candidates
            .iter()
            .map(|a| {
                let windows = &a.enhanced_visibility_windows;
                let (visible_slots, handover_slots) = match start {
                    Some(s) => (
                        occupied_slots(windows.iter(), s, slot_seconds, slot_count),
                        occupied_slots(
                            windows.iter().filter(|w| {
                                w.is_valid_pass
                                    && w.handover_suitability >= HandoverSuitability::Suitable
                            }),
                            s,
                            slot_seconds,
                            slot_count,
                        ),
                    ),
                    None => (Vec::new(), Vec::new()),
                };
                CandidateProfile {
                    id: a.id.clone(),
                    visible_slots,
                    handover_slots,
                    signal: (a.satellite_analysis.avg_visible_elevation_deg / 90.0).clamp(0.0, 1.0),
                }
            })
            .collect();

        debug!(slot_count, slot_seconds, "coverage grid built");
        CoverageGrid {
            start,
            slot_seconds,
            slot_count,
            candidates,
        }
    }

    /// Instant of slot `index`, if the grid is not empty.
    pub fn slot_instant(&self, index: usize) -> Option<Epoch> {
        self.start
            .map(|s| shift_seconds(s, index as f64 * self.slot_seconds))
    }
}

/// Per-slot counters of a pool, updated incrementally as satellites enter or leave it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCounts {
    pub visible: Vec<u32>,
    pub handover: Vec<u32>,
    pub signal_sum: f64,
    pub size: usize,
}

impl SlotCounts {
    pub fn empty(grid: &CoverageGrid) -> Self {
        SlotCounts {
            visible: vec![0; grid.slot_count],
            handover: vec![0; grid.slot_count],
            signal_sum: 0.0,
            size: 0,
        }
    }

    /// Counters of the pool made of the candidates at `members`.
    pub fn of(grid: &CoverageGrid, members: &[usize]) -> Self {
        let mut counts = Self::empty(grid);
        for &m in members {
            counts.add(&grid.candidates[m]);
        }
        counts
    }

    pub fn add(&mut self, candidate: &CandidateProfile) {
        for &s in &candidate.visible_slots {
            self.visible[s] += 1;
        }
        for &s in &candidate.handover_slots {
            self.handover[s] += 1;
        }
        self.signal_sum += candidate.signal;
        self.size += 1;
    }

    pub fn remove(&mut self, candidate: &CandidateProfile) {
        for &s in &candidate.visible_slots {
            self.visible[s] = self.visible[s].saturating_sub(1);
        }
        for &s in &candidate.handover_slots {
            self.handover[s] = self.handover[s].saturating_sub(1);
        }
        self.signal_sum -= candidate.signal;
        self.size = self.size.saturating_sub(1);
    }

    /// Mean signal proxy of the pool, `0` when empty.
    pub fn mean_signal(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            (self.signal_sum / self.size as f64).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod coverage_test {
    use super::*;
    use crate::constants::Constellation;
    use crate::satellite::VisibilitySummary;
    use crate::visibility::analyzer::{HandoverPriority, HandoverRecommendation, SatelliteVisibilityStats};
    use crate::visibility::classification::{PassQuality, TrajectoryType};
    use crate::visibility::windows::{AzimuthProfile, ElevationRate, RangeProfile};

    fn t0() -> Epoch {
        Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0)
    }

    fn window(from: f64, to: f64, suitability: HandoverSuitability) -> VisibilityWindow {
        VisibilityWindow {
            start: shift_seconds(t0(), from),
            end: shift_seconds(t0(), to),
            duration_seconds: to - from,
            sample_count: 2,
            merged_gap_seconds: 0.0,
            min_elevation_deg: 10.0,
            max_elevation_deg: 40.0,
            avg_elevation_deg: 25.0,
            high_elevation_fraction: 0.5,
            azimuth: AzimuthProfile {
                start_deg: 0.0,
                peak_deg: 90.0,
                end_deg: 180.0,
                total_sweep_deg: 180.0,
            },
            range: RangeProfile {
                min_km: 600.0,
                max_km: 1500.0,
                at_peak_km: 600.0,
            },
            elevation_rate: ElevationRate::default(),
            trajectory_type: TrajectoryType::Transit,
            pass_quality: PassQuality::Fair,
            handover_suitability: suitability,
            is_valid_pass: true,
        }
    }

    fn analysis(id: &str, span: (f64, f64), windows: Vec<VisibilityWindow>, avg_el: f64) -> SatelliteAnalysis {
        SatelliteAnalysis {
            id: id.into(),
            constellation: Constellation::Starlink,
            visibility_summary: VisibilitySummary::default(),
            observed_span: Some((shift_seconds(t0(), span.0), shift_seconds(t0(), span.1))),
            enhanced_visibility_windows: windows,
            satellite_analysis: SatelliteVisibilityStats {
                avg_visible_elevation_deg: avg_el,
                ..Default::default()
            },
            handover_recommendations: HandoverRecommendation {
                is_candidate_for_handover: true,
                recommended_windows: vec![0],
                handover_priority: HandoverPriority::Medium,
                advantages: vec![],
                issues: vec![],
            },
        }
    }

    #[test]
    fn slots_cover_window_instants() {
        let a = analysis(
            "A",
            (0.0, 300.0),
            vec![
                window(45.0, 120.0, HandoverSuitability::Suitable),
                window(200.0, 300.0, HandoverSuitability::MarginallySuitable),
            ],
            45.0,
        );
        let grid = CoverageGrid::build(&[&a], 30.0);
        assert_eq!(grid.slot_count, 11);
        let c = &grid.candidates[0];
        // 60, 90, 120 then 210 .. 300
        assert_eq!(c.visible_slots, vec![2, 3, 4, 7, 8, 9, 10]);
        assert_eq!(c.handover_slots, vec![2, 3, 4]);
        assert_eq!(c.signal, 0.5);
        assert_eq!(grid.slot_instant(2), Some(shift_seconds(t0(), 60.0)));
    }

    #[test]
    fn counts_update_incrementally() {
        let a = analysis("A", (0.0, 90.0), vec![window(0.0, 60.0, HandoverSuitability::Suitable)], 90.0);
        let b = analysis("B", (0.0, 90.0), vec![window(30.0, 90.0, HandoverSuitability::NotSuitable)], 0.0);
        let grid = CoverageGrid::build(&[&a, &b], 30.0);

        let mut counts = SlotCounts::of(&grid, &[0, 1]);
        assert_eq!(counts.visible, vec![1, 2, 2, 1]);
        assert_eq!(counts.handover, vec![1, 1, 1, 0]);
        assert_eq!(counts.mean_signal(), 0.5);

        counts.remove(&grid.candidates[0]);
        assert_eq!(counts, SlotCounts::of(&grid, &[1]));
    }

    #[test]
    fn empty_candidates_give_empty_grid() {
        let grid = CoverageGrid::build(&[], 30.0);
        assert_eq!(grid.slot_count, 0);
        assert_eq!(grid.slot_instant(0), None);
        assert_eq!(SlotCounts::empty(&grid).mean_signal(), 0.0);
    }
}
