//! # Dynamic satellite pool optimization
//!
//! Selects, per constellation, a bounded subset of handover candidates whose combined visibility
//! keeps the number of concurrently visible satellites inside a target range over time.
//!
//! ## Pipeline
//! -----------------
//! ```text
//! candidates (SatelliteAnalysis per constellation)
//!        │  coverage::CoverageGrid::build      one-off reduction to slot occupancy
//!        ▼
//!  slot counts ──cost::evaluate──▶ cost
//!        ▲                          │
//!        └─── annealing (swap / add / remove, Metropolis acceptance, geometric cooling)
//! ```
//!
//! Constellations never share state and are optimized independently (concurrently with the
//! `parallel` feature). Each run returns the **best state visited**, so the reported cost never
//! exceeds the cost of the initial state.
//!
//! ## Targets
//! -----------------
//! A [`CoverageTarget`] carries the per-constellation goals. Defaults:
//!
//! | constellation | visible | handover | orbit (min) | pool size |
//! |---|---|---|---|---|
//! | Starlink | 10–15 | 3–5 | 96 | 10–250 |
//! | OneWeb | 3–6 | 1–2 | 109 | 3–80 |
//!
//! ## Constraint keys
//! -----------------
//! [`PoolSolution::constraints_satisfied`] is keyed by `"<constellation>_target_met"`,
//! `"<constellation>_handover_met"`, `"<constellation>_pool_size"` (lower-cased constellation
//! name) and the global `"visibility_compliance_ok"`, `"temporal_distribution_ok"`,
//! `"signal_quality_ok"`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{Constellation, Minute, SatelliteId};
use crate::pool_errors::PoolError;

pub mod annealing;
pub mod coverage;
pub mod cost;
#[cfg(feature = "progress")]
pub mod progress_bar;

pub use annealing::{AnnealingConfig, AnnealingConfigBuilder, CoverageOptimizer, OptimizationStatistics, StopReason};
pub use cost::CostWeights;

/// Inclusive `(min, max)` count range.
pub type CountRange = (usize, usize);

/// Per-constellation coverage goals, read-only during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTarget {
    pub constellation: Constellation,
    /// Concurrently visible satellites to keep at every instant.
    pub target_visible_range: CountRange,
    /// Concurrently available handover-capable satellites.
    pub target_handover_range: CountRange,
    pub orbit_period_minutes: Minute,
    pub pool_size_bounds: CountRange,
    /// Expected pool size; adds a deviation term to the cost when set.
    #[serde(default)]
    pub estimated_pool_size: Option<usize>,
}

impl CoverageTarget {
    pub fn starlink() -> Self {
        CoverageTarget {
            constellation: Constellation::Starlink,
            target_visible_range: (10, 15),
            target_handover_range: (3, 5),
            orbit_period_minutes: 96.0,
            pool_size_bounds: (10, 250),
            estimated_pool_size: None,
        }
    }

    pub fn oneweb() -> Self {
        CoverageTarget {
            constellation: Constellation::OneWeb,
            target_visible_range: (3, 6),
            target_handover_range: (1, 2),
            orbit_period_minutes: 109.0,
            pool_size_bounds: (3, 80),
            estimated_pool_size: None,
        }
    }

    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] on an inverted range, non-positive pool bounds, or a
    ///   non-positive orbit period.
    pub fn validate(&self) -> Result<(), PoolError> {
        let name = &self.constellation;
        let inverted = |what: &str, r: CountRange| {
            PoolError::InvalidConfiguration(format!(
                "{name}: {what} is inverted ({} > {})",
                r.0, r.1
            ))
        };
        if self.target_visible_range.0 > self.target_visible_range.1 {
            return Err(inverted("target_visible_range", self.target_visible_range));
        }
        if self.target_handover_range.0 > self.target_handover_range.1 {
            return Err(inverted("target_handover_range", self.target_handover_range));
        }
        if self.pool_size_bounds.0 == 0 || self.pool_size_bounds.1 == 0 {
            return Err(PoolError::InvalidConfiguration(format!(
                "{name}: pool_size_bounds must be positive"
            )));
        }
        if self.pool_size_bounds.0 > self.pool_size_bounds.1 {
            return Err(inverted("pool_size_bounds", self.pool_size_bounds));
        }
        if self.orbit_period_minutes.partial_cmp(&0.0) != Some(std::cmp::Ordering::Greater) {
            return Err(PoolError::InvalidConfiguration(format!(
                "{name}: orbit_period_minutes must be > 0"
            )));
        }
        Ok(())
    }

    /// Lower-cased constellation name used in constraint keys.
    pub(crate) fn key(&self) -> String {
        self.constellation.as_str().to_lowercase()
    }
}

/// Optimized pool of one constellation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstellationPool {
    pub constellation: Constellation,
    /// Selected ids, sorted.
    pub satellites: Vec<SatelliteId>,
    pub candidate_count: usize,
    pub cost: f64,
    /// Fraction of time slots with the visible count inside the target range.
    pub visibility_compliance: f64,
    /// `1 − temporal penalty`, clamped to `[0, 1]`.
    pub temporal_distribution: f64,
    /// Mean signal proxy of the selection.
    pub signal_quality: f64,
    /// Fraction of time slots with the handover-capable count inside its target range.
    pub handover_compliance: f64,
    pub statistics: OptimizationStatistics,
}

/// Best pools found, with aggregate metrics over constellations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PoolSolution {
    pub pools: BTreeMap<Constellation, ConstellationPool>,
    /// Copies of the Starlink and OneWeb selections, flat in the serialized output.
    starlink_satellites: Vec<SatelliteId>,
    oneweb_satellites: Vec<SatelliteId>,
    /// Sum of the per-constellation costs.
    pub cost: f64,
    pub visibility_compliance: f64,
    pub temporal_distribution: f64,
    pub signal_quality: f64,
    pub constraints_satisfied: BTreeMap<String, bool>,
}

impl PoolSolution {
    pub fn satellites(&self, constellation: &Constellation) -> &[SatelliteId] {
        self.pools
            .get(constellation)
            .map_or(&[], |p| p.satellites.as_slice())
    }

    pub fn starlink_satellites(&self) -> &[SatelliteId] {
        &self.starlink_satellites
    }

    pub fn oneweb_satellites(&self) -> &[SatelliteId] {
        &self.oneweb_satellites
    }

    pub fn total_selected(&self) -> usize {
        self.pools.values().map(|p| p.satellites.len()).sum()
    }

    /// `true` when every named check holds.
    pub fn all_constraints_satisfied(&self) -> bool {
        self.constraints_satisfied.values().all(|ok| *ok)
    }
}

#[cfg(test)]
mod pool_test {
    use super::*;

    #[test]
    fn default_targets_validate() {
        assert!(CoverageTarget::starlink().validate().is_ok());
        assert!(CoverageTarget::oneweb().validate().is_ok());
        assert_eq!(CoverageTarget::oneweb().key(), "oneweb");
    }

    #[test]
    fn invalid_targets_fail_fast() {
        let inverted = CoverageTarget {
            target_visible_range: (15, 10),
            ..CoverageTarget::starlink()
        };
        assert!(matches!(inverted.validate(), Err(PoolError::InvalidConfiguration(_))));

        let zero_bound = CoverageTarget {
            pool_size_bounds: (0, 10),
            ..CoverageTarget::oneweb()
        };
        assert!(zero_bound.validate().is_err());

        let no_period = CoverageTarget {
            orbit_period_minutes: f64::NAN,
            ..CoverageTarget::oneweb()
        };
        assert!(no_period.validate().is_err());
    }

    #[test]
    fn solution_accessors_default_to_empty() {
        let solution = PoolSolution::default();
        assert!(solution.starlink_satellites().is_empty());
        assert_eq!(solution.total_selected(), 0);
        assert!(solution.all_constraints_satisfied());

        let value = serde_json::to_value(&solution).unwrap();
        assert_eq!(value["starlink_satellites"], serde_json::json!([]));
        assert_eq!(value["oneweb_satellites"], serde_json::json!([]));
    }
}
