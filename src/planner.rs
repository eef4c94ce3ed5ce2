//! # Pool planning pipeline
//!
//! [`PoolPlanner`] chains the four stages over one batch of propagated satellites:
//!
//! ```text
//! SatelliteInput[] ─▶ VisibilityCalculator ─▶ ElevationFilter ─▶ VisibilityAnalyzer ─▶ CoverageOptimizer
//!                     geometry, horizon       tiers, quality      windows, handover     pools
//! ```
//!
//! All configuration is validated once in [`PoolPlanner::new`]; a planner that was built never
//! fails on data. Satellites dropped along the way are reported with their reason in the
//! [`PlanReport`].
//!
//! Only satellites with at least one visibility window are offered to the optimizer.
//!
//! ## Configuration
//! -----------------
//! [`PlannerConfig`] deserializes from JSON; everything but the observer has defaults:
//!
//! ```json
//! {
//!   "observer": { "latitude_deg": 24.9441667, "longitude_deg": 121.3713889, "altitude_m": 50.0 },
//!   "elevation": { "environment": "urban", "weather": "light_rain" },
//!   "analyzer": { "max_gap_seconds": 120.0, "min_pass_duration_seconds": 60.0 },
//!   "sa_config": { "initial_temperature": 1000.0, "cooling_rate": 0.995, "rng_seed": 42 }
//! }
//! ```
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::Constellation;
use crate::observers::ObserverLocation;
use crate::pool::{AnnealingConfig, CoverageOptimizer, CoverageTarget, PoolSolution};
use crate::pool_errors::{PoolError, Rejection};
use crate::satellite::{ingest_records, RawSatelliteRecord, SatelliteInput};
use crate::visibility::analyzer::{validate_analysis, AnalysisResult, AnalyzerParams, SatelliteAnalysis, VisibilityAnalyzer};
use crate::visibility::calculator::{validate_batch, BatchStatistics, VisibilityCalculator};
use crate::visibility::elevation_filter::{validate_filter, ElevationConfig, ElevationFilter, FilterStatistics};
use crate::visibility::ValidationReport;

fn default_targets() -> Vec<CoverageTarget> {
    vec![CoverageTarget::starlink(), CoverageTarget::oneweb()]
}

/// Complete configuration of a [`PoolPlanner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub observer: ObserverLocation,
    #[serde(default)]
    pub elevation: ElevationConfig,
    #[serde(default)]
    pub analyzer: AnalyzerParams,
    #[serde(default = "default_targets")]
    pub targets: Vec<CoverageTarget>,
    #[serde(default, alias = "sa_config")]
    pub annealing: AnnealingConfig,
}

impl PlannerConfig {
    /// Default stages for `observer`, with Starlink and OneWeb targets.
    pub fn new(observer: ObserverLocation) -> Self {
        PlannerConfig {
            observer,
            elevation: ElevationConfig::default(),
            analyzer: AnalyzerParams::default(),
            targets: default_targets(),
            annealing: AnnealingConfig::default(),
        }
    }

    pub fn with_elevation(mut self, elevation: ElevationConfig) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerParams) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_targets(mut self, targets: Vec<CoverageTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_annealing(mut self, annealing: AnnealingConfig) -> Self {
        self.annealing = annealing;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        PoolPlanner::new(self.clone()).map(|_| ())
    }
}

/// Outcome of one planning run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub visibility_statistics: BatchStatistics,
    pub filter_statistics: FilterStatistics,
    /// Satellites dropped at ingestion, by the calculator, or by the filter.
    pub excluded: Vec<Rejection>,
    pub analysis: AnalysisResult,
    pub solution: PoolSolution,
    /// Structural checks per stage, keyed `visibility`, `elevation_filter`, `analysis`.
    pub validation: BTreeMap<String, ValidationReport>,
}

impl PlanReport {
    pub fn all_stages_valid(&self) -> bool {
        self.validation.values().all(|r| r.passed)
    }
}

/// Validated four-stage pipeline.
#[derive(Debug, Clone)]
pub struct PoolPlanner {
    calculator: VisibilityCalculator,
    filter: ElevationFilter,
    analyzer: VisibilityAnalyzer,
    optimizer: CoverageOptimizer,
}

impl PoolPlanner {
    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] if any stage configuration is invalid.
    pub fn new(config: PlannerConfig) -> Result<Self, PoolError> {
        Ok(PoolPlanner {
            calculator: VisibilityCalculator::new(config.observer),
            filter: ElevationFilter::new(config.elevation)?,
            analyzer: VisibilityAnalyzer::new(config.analyzer)?,
            optimizer: CoverageOptimizer::new(config.targets, config.annealing)?,
        })
    }

    pub fn observer(&self) -> &ObserverLocation {
        self.calculator.observer()
    }

    pub fn plan(&self, satellites: &[SatelliteInput]) -> PlanReport {
        self.plan_with_cancel(satellites, || false)
    }

    /// Validate raw upstream records, then plan; unparsable records join the exclusions.
    pub fn plan_records(&self, records: impl IntoIterator<Item = RawSatelliteRecord>) -> PlanReport {
        let ingested = ingest_records(records);
        let mut report = self.plan(&ingested.satellites);
        let mut excluded = ingested.rejected;
        excluded.append(&mut report.excluded);
        report.excluded = excluded;
        report
    }

    /// Same as [`plan`](Self::plan); `should_cancel` is forwarded to the optimizer.
    pub fn plan_with_cancel<F>(&self, satellites: &[SatelliteInput], should_cancel: F) -> PlanReport
    where
        F: Fn() -> bool + Sync,
    {
        let visibility = self.calculator.calculate_batch(satellites);
        let filtered = self.filter.filter(visibility.satellites.values());
        let analysis = self.analyzer.analyze(filtered.satellites.values());

        let candidates: BTreeMap<Constellation, Vec<&SatelliteAnalysis>> = analysis
            .candidates_by_constellation()
            .into_iter()
            .map(|(c, group)| {
                let with_windows = group
                    .into_iter()
                    .filter(|a| !a.enhanced_visibility_windows.is_empty())
                    .collect();
                (c, with_windows)
            })
            .collect();
        let solution = self.optimizer.optimize_with_cancel(&candidates, should_cancel);

        let mut validation = BTreeMap::new();
        validation.insert("visibility".to_string(), validate_batch(&visibility));
        validation.insert(
            "elevation_filter".to_string(),
            validate_filter(&filtered, self.filter.config()),
        );
        validation.insert("analysis".to_string(), validate_analysis(&analysis));

        info!(
            input = satellites.len(),
            filtered = filtered.satellites.len(),
            selected = solution.total_selected(),
            cost = solution.cost,
            "pool plan complete"
        );

        let mut excluded = visibility.excluded;
        excluded.extend(filtered.rejected);
        PlanReport {
            visibility_statistics: visibility.batch_statistics,
            filter_statistics: filtered.statistics,
            excluded,
            analysis,
            solution,
            validation,
        }
    }
}

#[cfg(test)]
mod planner_test {
    use super::*;

    #[test]
    fn config_from_minimal_json() {
        let json = r#"{
            "observer": { "latitude_deg": 24.9441667, "longitude_deg": 121.3713889, "altitude_m": 50.0 },
            "sa_config": { "rng_seed": 7, "max_iterations": 500 }
        }"#;
        let config: PlannerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.annealing.rng_seed, Some(7));
        assert_eq!(config.annealing.max_iterations, 500);
        assert_eq!(config.annealing.cooling_rate, 0.995);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.analyzer.max_gap_seconds, 120.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_stage_config_fails_fast() {
        let observer = ObserverLocation::new(24.9, 121.4, 50.0).unwrap();
        let config = PlannerConfig::new(observer.clone()).with_targets(vec![CoverageTarget {
            pool_size_bounds: (20, 10),
            ..CoverageTarget::starlink()
        }]);
        assert!(matches!(
            PoolPlanner::new(config),
            Err(PoolError::InvalidConfiguration(_))
        ));

        let bad_json = r#"{ "observer": { "latitude_deg": 95.0, "longitude_deg": 0.0 } }"#;
        assert!(serde_json::from_str::<PlannerConfig>(bad_json).is_err());
    }

    #[test]
    fn empty_batch_plans_without_error() {
        let observer = ObserverLocation::new(24.9, 121.4, 50.0).unwrap();
        let config = PlannerConfig::new(observer)
            .with_annealing(AnnealingConfig::builder().rng_seed(1).build().unwrap());
        let report = PoolPlanner::new(config).unwrap().plan(&[]);

        assert_eq!(report.visibility_statistics.total_satellites, 0);
        assert!(report.analysis.satellites.is_empty());
        assert_eq!(report.solution.total_selected(), 0);
        assert!(!report.solution.constraints_satisfied["starlink_pool_size"]);
        assert!(report.excluded.is_empty());
    }
}
