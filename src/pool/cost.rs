//! # Pool cost function
//!
//! The annealer minimizes a weighted sum of normalized penalties, each roughly in `[0, 1]`:
//!
//! | term | penalty |
//! |---|---|
//! | visibility | mean distance of the per-slot visible count outside `target_visible_range`, over `max(range.max, 1)` |
//! | temporal | per-orbit variance of visible counts over `max(range.max², 1)` plus mean \|Δcount\| over `max(range.max, 1)` |
//! | signal | `1 − mean signal proxy` (`1` for an empty pool) |
//! | handover | same as visibility, for handover-capable counts against `target_handover_range` |
//! | pool size | `|size − estimate| / estimate`, only when an estimate is configured |
//!
//! `mean |Δcount|` between consecutive slots is the imbalance between satellites entering and
//! leaving the observer's sky.
use serde::{Deserialize, Serialize};

use super::coverage::SlotCounts;
use super::{CountRange, CoverageTarget};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub visibility: f64,
    pub temporal: f64,
    pub signal: f64,
    pub handover: f64,
    pub pool_size: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            visibility: 10_000.0,
            temporal: 5_000.0,
            signal: 100.0,
            handover: 75.0,
            pool_size: 8_000.0,
        }
    }
}

impl CostWeights {
    pub(crate) fn is_valid(&self) -> bool {
        [
            self.visibility,
            self.temporal,
            self.signal,
            self.handover,
            self.pool_size,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Unweighted penalties and their weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub visibility: f64,
    pub temporal: f64,
    pub signal: f64,
    pub handover: f64,
    pub pool_size: f64,
    pub total: f64,
}

/// Mean distance of `counts` outside `range`, normalized. An empty series is maximally penalized.
pub fn range_penalty(counts: &[u32], range: CountRange) -> f64 {
    if counts.is_empty() {
        return 1.0;
    }
    let (lo, hi) = (range.0 as f64, range.1 as f64);
    let outside: f64 = counts
        .iter()
        .map(|&c| {
            let c = c as f64;
            if c < lo {
                lo - c
            } else if c > hi {
                c - hi
            } else {
                0.0
            }
        })
        .sum();
    outside / (counts.len() as f64 * hi.max(1.0))
}

/// Fraction of slots whose count lies within `range`; `0` for an empty series.
pub fn range_compliance(counts: &[u32], range: CountRange) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let inside = counts
        .iter()
        .filter(|&&c| (range.0..=range.1).contains(&(c as usize)))
        .count();
    inside as f64 / counts.len() as f64
}

fn variance(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n
}

/// Unevenness of coverage: variance within each orbit-long block of slots, plus the mean
/// absolute change between consecutive slots.
pub fn temporal_penalty(counts: &[u32], slots_per_orbit: usize, scale: usize) -> f64 {
    if counts.is_empty() {
        return 1.0;
    }
    let scale = (scale as f64).max(1.0);
    let blocks: Vec<&[u32]> = counts.chunks(slots_per_orbit.max(1)).collect();
    let block_variance = blocks.iter().map(|b| variance(b)).sum::<f64>() / blocks.len() as f64;

    let churn = if counts.len() > 1 {
        counts
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64).abs())
            .sum::<f64>()
            / (counts.len() - 1) as f64
    } else {
        0.0
    };
    block_variance / (scale * scale) + churn / scale
}

/// Evaluate the cost of a pool described by its slot counters.
pub fn evaluate(
    counts: &SlotCounts,
    target: &CoverageTarget,
    weights: &CostWeights,
    slots_per_orbit: usize,
) -> CostBreakdown {
    let visibility = range_penalty(&counts.visible, target.target_visible_range);
    let temporal = temporal_penalty(&counts.visible, slots_per_orbit, target.target_visible_range.1);
    let signal = if counts.size == 0 {
        1.0
    } else {
        1.0 - counts.mean_signal()
    };
    let handover = range_penalty(&counts.handover, target.target_handover_range);
    let pool_size = match target.estimated_pool_size {
        Some(est) if est > 0 => (counts.size as f64 - est as f64).abs() / est as f64,
        _ => 0.0,
    };

    let total = weights.visibility * visibility
        + weights.temporal * temporal
        + weights.signal * signal
        + weights.handover * handover
        + weights.pool_size * pool_size;

    CostBreakdown {
        visibility,
        temporal,
        signal,
        handover,
        pool_size,
        total,
    }
}
