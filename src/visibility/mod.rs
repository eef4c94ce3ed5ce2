//! # Visibility stages
//!
//! The three per-satellite stages of the pipeline, in order:
//!
//! 1. [`calculator`] – topocentric geometry for every sample, raw horizon test.
//! 2. [`elevation_filter`] – environment/weather adjusted thresholds, data-quality gate, tiers.
//! 3. [`analyzer`] – window detection and merging ([`windows`]), classification
//!    ([`classification`]), per-satellite and global aggregation.
//!
//! Each stage takes its input by reference and returns a new value; nothing is mutated in place.
//! With the `parallel` feature, the per-satellite work of every stage is spread over a Rayon pool.
pub mod analyzer;
pub mod calculator;
pub mod classification;
pub mod elevation_filter;
pub mod windows;

use serde::Serialize;

/// Outcome of a `validate_*` check: never an error, just a verdict and the reasons behind it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_issues(issues: Vec<String>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }
}
