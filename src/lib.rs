//! # satpool
//!
//! Ground-observer visibility analysis and dynamic satellite pool selection for large LEO
//! constellations (Starlink, OneWeb, ...).
//!
//! Given propagated positions for thousands of satellites and a fixed ground station, the crate
//! computes which satellites are visible over time, grades their passes, and selects per
//! constellation a bounded pool whose combined coverage keeps a target number of satellites
//! overhead at every instant.
//!
//! Stages
//! -----------------
//! * [`visibility::calculator`] – WGS84 topocentric look angles, horizon test, coverage timeline.
//! * [`visibility::elevation_filter`] – tiered elevation thresholds adjusted for environment and
//!   weather, data-quality rejection.
//! * [`visibility::analyzer`] – pass detection and merging, pass quality, handover suitability.
//! * [`pool`] – simulated annealing over satellite subsets.
//! * [`planner`] – the whole chain behind one validated configuration.
//!
//! Features
//! -----------------
//! * `parallel` – per-satellite stages and per-constellation annealing on a Rayon pool.
//! * `progress` – terminal progress bars while annealing.
pub mod constants;
pub mod observers;
pub mod planner;
pub mod pool;
pub mod pool_errors;
pub mod satellite;
pub mod time;
pub mod visibility;

pub use observers::ObserverLocation;
pub use planner::{PlanReport, PlannerConfig, PoolPlanner};
pub use pool::{CoverageOptimizer, CoverageTarget, PoolSolution};
pub use pool_errors::PoolError;
pub use satellite::{SatelliteInput, SatelliteTrack};
