//! # Simulated annealing over satellite subsets
//!
//! For each constellation the state is a subset of its candidates with a size inside
//! `pool_size_bounds`. One iteration:
//!
//! 1. pick a feasible move uniformly among **swap** (one selected ↔ one unselected),
//!    **add** (while below the upper bound), **remove** (while above the lower bound);
//! 2. apply it to the slot counters and evaluate the cost;
//! 3. accept if `Δ ≤ 0`, else with probability `exp(-Δ/T)` (Metropolis); revert otherwise;
//! 4. cool: `T ← T × cooling_rate`.
//!
//! The run stops on the first of:
//!
//! | reason | condition |
//! |---|---|
//! | [`StopReason::MaxIterations`] | `iterations ≥ max_iterations` |
//! | [`StopReason::MinTemperature`] | `T < min_temperature` |
//! | [`StopReason::Plateau`] | more than `plateau_tolerance` iterations without a new best |
//! | [`StopReason::TimeBudget`] | wall-clock budget spent |
//! | [`StopReason::Cancelled`] | `should_cancel()` returned `true` (checked before every iteration) |
//! | [`StopReason::NoFeasibleMove`] | bounds leave no move to make |
//!
//! The best state ever visited is returned. The initial state is the top-ranked feasible subset
//! (most visible slots first, then signal, then id).
//!
//! A constellation with fewer candidates than `pool_size_bounds.0` is not annealed: every
//! candidate is selected, [`StopReason::Degenerate`] is reported and the
//! `"<constellation>_pool_size"` check fails.
//!
//! ## Reproducibility
//! -----------------
//! Each constellation draws from its own [`StdRng`], seeded from the master seed and the
//! constellation name. With `rng_seed` set, identical inputs give identical [`PoolSolution`]s
//! (unless a time budget or cancellation cuts a run short). Without it the master seed comes from
//! OS entropy.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use satpool::pool::{AnnealingConfig, CoverageOptimizer, CoverageTarget};
//! # fn run(candidates: BTreeMap<satpool::constants::Constellation, Vec<&satpool::visibility::analyzer::SatelliteAnalysis>>)
//! #   -> Result<(), satpool::pool_errors::PoolError> {
//! let config = AnnealingConfig::builder().rng_seed(42).max_iterations(5_000).build()?;
//! let optimizer = CoverageOptimizer::new(
//!     vec![CoverageTarget::starlink(), CoverageTarget::oneweb()],
//!     config,
//! )?;
//! let solution = optimizer.optimize(&candidates);
//! println!("{} starlink satellites", solution.starlink_satellites().len());
//! # Ok(()) }
//! ```
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "progress")]
use super::progress_bar::AnnealingProgress;

use crate::constants::{Constellation, Second};
use crate::pool_errors::PoolError;
use crate::visibility::analyzer::SatelliteAnalysis;

use super::coverage::{CoverageGrid, SlotCounts};
use super::cost::{evaluate, range_compliance, temporal_penalty, CostBreakdown, CostWeights};
use super::{ConstellationPool, CoverageTarget, PoolSolution};

const COST_HISTORY_STRIDE: usize = 100;
/// Minimum cost decrease registered as a new best.
const IMPROVEMENT_EPS: f64 = 1e-9;

/// Minimum fractions for the named checks of a [`PoolSolution`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceThresholds {
    pub visibility: f64,
    pub temporal: f64,
    pub signal: f64,
    pub handover: f64,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        AcceptanceThresholds {
            visibility: 0.90,
            temporal: 0.70,
            signal: 0.80,
            handover: 0.90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub min_temperature: f64,
    pub max_iterations: usize,
    /// Stop after more than this many consecutive iterations without a new best.
    pub plateau_tolerance: usize,
    /// Spacing of the coverage time slots.
    pub slot_seconds: Second,
    /// Optional wall-clock budget per constellation.
    pub time_budget_seconds: Option<f64>,
    pub rng_seed: Option<u64>,
    pub weights: CostWeights,
    pub acceptance: AcceptanceThresholds,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temperature: 1_000.0,
            cooling_rate: 0.995,
            min_temperature: 0.1,
            max_iterations: 10_000,
            plateau_tolerance: 100,
            slot_seconds: 30.0,
            time_budget_seconds: None,
            rng_seed: None,
            weights: CostWeights::default(),
            acceptance: AcceptanceThresholds::default(),
        }
    }
}

impl AnnealingConfig {
    pub fn builder() -> AnnealingConfigBuilder {
        AnnealingConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !positive(self.initial_temperature) {
            return Err(PoolError::InvalidConfiguration(
                "initial_temperature must be > 0".into(),
            ));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(PoolError::InvalidConfiguration(
                "cooling_rate must be in (0, 1)".into(),
            ));
        }
        if !positive(self.min_temperature) {
            return Err(PoolError::InvalidConfiguration(
                "min_temperature must be > 0".into(),
            ));
        }
        if !positive(self.slot_seconds) {
            return Err(PoolError::InvalidConfiguration(
                "slot_seconds must be > 0".into(),
            ));
        }
        if self.time_budget_seconds.is_some_and(|b| !positive(b)) {
            return Err(PoolError::InvalidConfiguration(
                "time_budget_seconds must be > 0 when set".into(),
            ));
        }
        if !self.weights.is_valid() {
            return Err(PoolError::InvalidConfiguration(
                "cost weights must be finite and non-negative".into(),
            ));
        }
        let a = &self.acceptance;
        if ![a.visibility, a.temporal, a.signal, a.handover]
            .iter()
            .all(|f| (0.0..=1.0).contains(f))
        {
            return Err(PoolError::InvalidConfiguration(
                "acceptance thresholds must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`AnnealingConfig`], validated in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct AnnealingConfigBuilder {
    config: AnnealingConfig,
}

impl AnnealingConfigBuilder {
    pub fn initial_temperature(mut self, v: f64) -> Self {
        self.config.initial_temperature = v;
        self
    }
    pub fn cooling_rate(mut self, v: f64) -> Self {
        self.config.cooling_rate = v;
        self
    }
    pub fn min_temperature(mut self, v: f64) -> Self {
        self.config.min_temperature = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.config.max_iterations = v;
        self
    }
    pub fn plateau_tolerance(mut self, v: usize) -> Self {
        self.config.plateau_tolerance = v;
        self
    }
    pub fn slot_seconds(mut self, v: Second) -> Self {
        self.config.slot_seconds = v;
        self
    }
    pub fn time_budget_seconds(mut self, v: f64) -> Self {
        self.config.time_budget_seconds = Some(v);
        self
    }
    pub fn rng_seed(mut self, v: u64) -> Self {
        self.config.rng_seed = Some(v);
        self
    }
    pub fn weights(mut self, v: CostWeights) -> Self {
        self.config.weights = v;
        self
    }
    pub fn acceptance(mut self, v: AcceptanceThresholds) -> Self {
        self.config.acceptance = v;
        self
    }

    pub fn build(self) -> Result<AnnealingConfig, PoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MinTemperature,
    MaxIterations,
    Plateau,
    TimeBudget,
    Cancelled,
    NoFeasibleMove,
    Degenerate,
}

/// Trace of one annealing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStatistics {
    pub iterations: usize,
    pub accepted_moves: usize,
    pub improving_moves: usize,
    /// Iteration at which the returned state was first reached (`0` for the initial state).
    pub best_iteration: usize,
    pub initial_cost: f64,
    pub best_cost: f64,
    pub final_temperature: f64,
    /// Current cost at iteration 0 and every 100 iterations.
    pub cost_history: Vec<f64>,
    pub stop_reason: StopReason,
    pub acceptance_rate: f64,
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Swap { out_pos: usize, in_pos: usize },
    Add { in_pos: usize },
    Remove { out_pos: usize },
}

/// Subset state: candidate indices into the grid, split in selected / unselected.
struct PoolState<'g> {
    grid: &'g CoverageGrid,
    selected: Vec<usize>,
    unselected: Vec<usize>,
    counts: SlotCounts,
}

impl<'g> PoolState<'g> {
    fn new(grid: &'g CoverageGrid, initial_size: usize) -> Self {
        let mut ranked: Vec<usize> = (0..grid.candidates.len()).collect();
        // stable: ties keep id order
        ranked.sort_by(|&a, &b| {
            let (ca, cb) = (&grid.candidates[a], &grid.candidates[b]);
            cb.visible_slots
                .len()
                .cmp(&ca.visible_slots.len())
                .then(cb.signal.total_cmp(&ca.signal))
        });
        let unselected = ranked.split_off(initial_size.min(ranked.len()));
        let counts = SlotCounts::of(grid, &ranked);
        PoolState {
            grid,
            selected: ranked,
            unselected,
            counts,
        }
    }

    fn propose(&self, rng: &mut StdRng, bounds: (usize, usize)) -> Option<Move> {
        let (n_sel, n_unsel) = (self.selected.len(), self.unselected.len());
        let mut kinds = [0u8; 3];
        let mut n = 0;
        if n_sel > 0 && n_unsel > 0 {
            kinds[n] = 0;
            n += 1;
        }
        if n_sel < bounds.1 && n_unsel > 0 {
            kinds[n] = 1;
            n += 1;
        }
        if n_sel > bounds.0 {
            kinds[n] = 2;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(match kinds[rng.random_range(0..n)] {
            0 => Move::Swap {
                out_pos: rng.random_range(0..n_sel),
                in_pos: rng.random_range(0..n_unsel),
            },
            1 => Move::Add {
                in_pos: rng.random_range(0..n_unsel),
            },
            _ => Move::Remove {
                out_pos: rng.random_range(0..n_sel),
            },
        })
    }

    fn apply(&mut self, mv: Move) {
        let candidates = &self.grid.candidates;
        match mv {
            Move::Swap { out_pos, in_pos } => {
                self.counts.remove(&candidates[self.selected[out_pos]]);
                self.counts.add(&candidates[self.unselected[in_pos]]);
                std::mem::swap(&mut self.selected[out_pos], &mut self.unselected[in_pos]);
            }
            Move::Add { in_pos } => {
                let c = self.unselected.swap_remove(in_pos);
                self.counts.add(&candidates[c]);
                self.selected.push(c);
            }
            Move::Remove { out_pos } => {
                let c = self.selected.swap_remove(out_pos);
                self.counts.remove(&candidates[c]);
                self.unselected.push(c);
            }
        }
    }

    fn revert(&mut self, mv: Move) {
        let candidates = &self.grid.candidates;
        match mv {
            Move::Swap { out_pos, in_pos } => {
                self.counts.remove(&candidates[self.selected[out_pos]]);
                self.counts.add(&candidates[self.unselected[in_pos]]);
                std::mem::swap(&mut self.selected[out_pos], &mut self.unselected[in_pos]);
            }
            Move::Add { in_pos } => {
                if let Some(c) = self.selected.pop() {
                    self.counts.remove(&candidates[c]);
                    self.unselected.push(c);
                    let last = self.unselected.len() - 1;
                    self.unselected.swap(in_pos, last);
                }
            }
            Move::Remove { out_pos } => {
                if let Some(c) = self.unselected.pop() {
                    self.counts.add(&candidates[c]);
                    self.selected.push(c);
                    let last = self.selected.len() - 1;
                    self.selected.swap(out_pos, last);
                }
            }
        }
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed of a constellation's RNG, derived from the master seed and the constellation name.
fn constellation_seed(master: u64, constellation: &Constellation) -> u64 {
    constellation
        .as_str()
        .bytes()
        .fold(splitmix64(master), |acc, b| splitmix64(acc ^ u64::from(b)))
}

/// Outcome of one constellation's run, before metrics are attached.
struct RunOutcome {
    selected: Vec<usize>,
    statistics: OptimizationStatistics,
}

/// Per-constellation simulated annealing over [`CoverageTarget`]s.
#[derive(Debug, Clone)]
pub struct CoverageOptimizer {
    targets: Vec<CoverageTarget>,
    config: AnnealingConfig,
}

impl CoverageOptimizer {
    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] for an invalid target or config, or a constellation
    ///   targeted twice.
    pub fn new(targets: Vec<CoverageTarget>, config: AnnealingConfig) -> Result<Self, PoolError> {
        config.validate()?;
        for (i, target) in targets.iter().enumerate() {
            target.validate()?;
            if targets[..i].iter().any(|t| t.constellation == target.constellation) {
                return Err(PoolError::InvalidConfiguration(format!(
                    "duplicate coverage target for {}",
                    target.constellation
                )));
            }
        }
        Ok(Self { targets, config })
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    pub fn targets(&self) -> &[CoverageTarget] {
        &self.targets
    }

    /// Target of `constellation`.
    ///
    /// Errors
    /// ----------
    /// * [`PoolError::UnknownConstellation`] if no target is configured for it.
    pub fn target(&self, constellation: &Constellation) -> Result<&CoverageTarget, PoolError> {
        self.targets
            .iter()
            .find(|t| &t.constellation == constellation)
            .ok_or_else(|| PoolError::UnknownConstellation(constellation.clone()))
    }

    pub fn optimize(&self, candidates: &BTreeMap<Constellation, Vec<&SatelliteAnalysis>>) -> PoolSolution {
        self.optimize_with_cancel(candidates, || false)
    }

    /// Same as [`optimize`](Self::optimize), checking `should_cancel` before every iteration, so it
    /// should be cheap (an atomic load). A cancelled run still returns the best pools found so far.
    pub fn optimize_with_cancel<F>(
        &self,
        candidates: &BTreeMap<Constellation, Vec<&SatelliteAnalysis>>,
        should_cancel: F,
    ) -> PoolSolution
    where
        F: Fn() -> bool + Sync,
    {
        for constellation in candidates.keys() {
            if let Err(e) = self.target(constellation) {
                warn!(%e, "candidates ignored");
            }
        }

        let master = self
            .config
            .rng_seed
            .unwrap_or_else(|| StdRng::from_os_rng().random());

        let jobs: Vec<(&CoverageTarget, Vec<&SatelliteAnalysis>)> = self
            .targets
            .iter()
            .map(|t| {
                let mut group = candidates.get(&t.constellation).cloned().unwrap_or_default();
                group.sort_by(|a, b| a.id.cmp(&b.id));
                group.dedup_by(|a, b| a.id == b.id);
                (t, group)
            })
            .collect();

        #[cfg(feature = "parallel")]
        let pools: Vec<ConstellationPool> = jobs
            .par_iter()
            .map(|(t, group)| self.optimize_constellation(t, group, master, &should_cancel))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let pools: Vec<ConstellationPool> = jobs
            .iter()
            .map(|(t, group)| self.optimize_constellation(t, group, master, &should_cancel))
            .collect();

        self.assemble(pools)
    }

    fn optimize_constellation<F>(
        &self,
        target: &CoverageTarget,
        candidates: &[&SatelliteAnalysis],
        master_seed: u64,
        should_cancel: &F,
    ) -> ConstellationPool
    where
        F: Fn() -> bool,
    {
        let grid = CoverageGrid::build(candidates, self.config.slot_seconds);
        let slots_per_orbit =
            ((target.orbit_period_minutes * 60.0 / self.config.slot_seconds).round() as usize).max(1);
        let (min_size, max_size) = target.pool_size_bounds;
        let n = grid.candidates.len();

        let outcome = if n < min_size {
            warn!(
                constellation = %target.constellation,
                candidates = n,
                min_pool_size = min_size,
                "fewer candidates than the minimum pool size, selecting all"
            );
            let state = PoolState::new(&grid, n);
            let cost = evaluate(&state.counts, target, &self.config.weights, slots_per_orbit).total;
            RunOutcome {
                selected: state.selected,
                statistics: OptimizationStatistics {
                    iterations: 0,
                    accepted_moves: 0,
                    improving_moves: 0,
                    best_iteration: 0,
                    initial_cost: cost,
                    best_cost: cost,
                    final_temperature: self.config.initial_temperature,
                    cost_history: vec![cost],
                    stop_reason: StopReason::Degenerate,
                    acceptance_rate: 0.0,
                },
            }
        } else {
            let initial_size = target
                .estimated_pool_size
                .unwrap_or((min_size + max_size) / 2)
                .clamp(min_size, max_size)
                .min(n);
            let seed = constellation_seed(master_seed, &target.constellation);
            anneal(
                PoolState::new(&grid, initial_size),
                target,
                &self.config,
                slots_per_orbit,
                seed,
                should_cancel,
            )
        };

        let counts = SlotCounts::of(&grid, &outcome.selected);
        let breakdown = evaluate(&counts, target, &self.config.weights, slots_per_orbit);
        let mut satellites: Vec<_> = outcome
            .selected
            .iter()
            .map(|&i| grid.candidates[i].id.clone())
            .collect();
        satellites.sort();

        let mut statistics = outcome.statistics;
        statistics.best_cost = breakdown.total;

        info!(
            constellation = %target.constellation,
            candidates = n,
            selected = satellites.len(),
            cost = breakdown.total,
            iterations = statistics.iterations,
            stop = ?statistics.stop_reason,
            "pool optimized"
        );

        ConstellationPool {
            constellation: target.constellation.clone(),
            satellites,
            candidate_count: n,
            cost: breakdown.total,
            visibility_compliance: range_compliance(&counts.visible, target.target_visible_range),
            temporal_distribution: (1.0
                - temporal_penalty(&counts.visible, slots_per_orbit, target.target_visible_range.1))
            .clamp(0.0, 1.0),
            signal_quality: counts.mean_signal(),
            handover_compliance: range_compliance(&counts.handover, target.target_handover_range),
            statistics,
        }
    }

    fn assemble(&self, pools: Vec<ConstellationPool>) -> PoolSolution {
        let acceptance = &self.config.acceptance;
        let mut constraints = BTreeMap::new();
        for (pool, target) in pools.iter().zip(&self.targets) {
            let key = target.key();
            let (min_size, max_size) = target.pool_size_bounds;
            let size_ok = pool.statistics.stop_reason != StopReason::Degenerate
                && (min_size..=max_size).contains(&pool.satellites.len());
            constraints.insert(
                format!("{key}_target_met"),
                pool.visibility_compliance >= acceptance.visibility,
            );
            constraints.insert(
                format!("{key}_handover_met"),
                pool.handover_compliance >= acceptance.handover,
            );
            constraints.insert(format!("{key}_pool_size"), size_ok);
        }

        let mean = |f: fn(&ConstellationPool) -> f64| {
            if pools.is_empty() {
                0.0
            } else {
                pools.iter().map(f).sum::<f64>() / pools.len() as f64
            }
        };
        let visibility_compliance = mean(|p| p.visibility_compliance);
        let temporal_distribution = mean(|p| p.temporal_distribution);
        let signal_quality = mean(|p| p.signal_quality);
        constraints.insert(
            "visibility_compliance_ok".into(),
            visibility_compliance >= acceptance.visibility,
        );
        constraints.insert(
            "temporal_distribution_ok".into(),
            temporal_distribution >= acceptance.temporal,
        );
        constraints.insert("signal_quality_ok".into(), signal_quality >= acceptance.signal);

        let selected = |c: Constellation| {
            pools
                .iter()
                .find(|p| p.constellation == c)
                .map_or_else(Vec::new, |p| p.satellites.clone())
        };
        PoolSolution {
            cost: pools.iter().map(|p| p.cost).sum(),
            starlink_satellites: selected(Constellation::Starlink),
            oneweb_satellites: selected(Constellation::OneWeb),
            pools: pools
                .into_iter()
                .map(|p| (p.constellation.clone(), p))
                .collect(),
            visibility_compliance,
            temporal_distribution,
            signal_quality,
            constraints_satisfied: constraints,
        }
    }
}

fn anneal<F>(
    mut state: PoolState<'_>,
    target: &CoverageTarget,
    config: &AnnealingConfig,
    slots_per_orbit: usize,
    seed: u64,
    should_cancel: &F,
) -> RunOutcome
where
    F: Fn() -> bool,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let cost_of = |counts: &SlotCounts| -> CostBreakdown {
        evaluate(counts, target, &config.weights, slots_per_orbit)
    };

    let initial_cost = cost_of(&state.counts).total;
    let mut current_cost = initial_cost;
    let mut best_cost = initial_cost;
    let mut best_selected = state.selected.clone();
    let mut best_iteration = 0;

    let mut temperature = config.initial_temperature;
    let mut iterations = 0;
    let mut accepted_moves = 0;
    let mut improving_moves = 0;
    let mut since_best = 0;
    let mut cost_history = vec![initial_cost];

    let started = Instant::now();
    let budget = config.time_budget_seconds.map(Duration::from_secs_f64);

    #[cfg(feature = "progress")]
    let mut progress = AnnealingProgress::new(target.constellation.as_str(), config.max_iterations);

    let stop_reason = loop {
        if iterations >= config.max_iterations {
            break StopReason::MaxIterations;
        }
        if temperature < config.min_temperature {
            break StopReason::MinTemperature;
        }
        if budget.is_some_and(|b| started.elapsed() >= b) {
            break StopReason::TimeBudget;
        }
        if should_cancel() {
            break StopReason::Cancelled;
        }

        let Some(mv) = state.propose(&mut rng, target.pool_size_bounds) else {
            break StopReason::NoFeasibleMove;
        };
        state.apply(mv);
        let candidate_cost = cost_of(&state.counts).total;
        let delta = candidate_cost - current_cost;

        let accept = delta <= 0.0 || rng.random::<f64>() < (-delta / temperature).exp();
        if accept {
            accepted_moves += 1;
            if delta < 0.0 {
                improving_moves += 1;
            }
            current_cost = candidate_cost;
        } else {
            state.revert(mv);
        }

        iterations += 1;
        if accept && current_cost < best_cost - IMPROVEMENT_EPS {
            best_cost = current_cost;
            best_selected.clone_from(&state.selected);
            best_iteration = iterations;
            since_best = 0;
            debug!(
                constellation = %target.constellation,
                iteration = iterations,
                cost = best_cost,
                size = best_selected.len(),
                "new best pool"
            );
        } else {
            since_best += 1;
        }

        temperature *= config.cooling_rate;
        if iterations % COST_HISTORY_STRIDE == 0 {
            cost_history.push(current_cost);
        }

        #[cfg(feature = "progress")]
        progress.tick(temperature, best_cost);

        if since_best > config.plateau_tolerance {
            break StopReason::Plateau;
        }
    };

    #[cfg(feature = "progress")]
    progress.finish(stop_reason);

    RunOutcome {
        selected: best_selected,
        statistics: OptimizationStatistics {
            iterations,
            accepted_moves,
            improving_moves,
            best_iteration,
            initial_cost,
            best_cost,
            final_temperature: temperature,
            cost_history,
            stop_reason,
            acceptance_rate: if iterations > 0 {
                accepted_moves as f64 / iterations as f64
            } else {
                0.0
            },
        },
    }
}
