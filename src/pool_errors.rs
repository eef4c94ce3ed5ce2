use serde::Serialize;
use thiserror::Error;

use crate::constants::{Constellation, SatelliteId};

/// Failures that abort a call.
///
/// Only configuration and ingestion problems surface as `Err`. Problems tied to a single
/// satellite are reported as a [`Rejection`] inside the batch result instead.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid observer location: {0}")]
    InvalidObserver(String),

    #[error("Invalid timestamp {0:?}: expected ISO-8601 UTC")]
    InvalidTimestamp(String),

    #[error("Unknown constellation in coverage targets: {0}")]
    UnknownConstellation(Constellation),

    #[error("Encountered NaN where a number was required: {0}")]
    FloatIsNan(#[from] ordered_float::FloatIsNan),
}

impl PartialEq for PoolError {
    fn eq(&self, other: &Self) -> bool {
        use PoolError::*;
        match (self, other) {
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,
            (InvalidObserver(a), InvalidObserver(b)) => a == b,
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (UnknownConstellation(a), UnknownConstellation(b)) => a == b,
            (FloatIsNan(_), FloatIsNan(_)) => true,
            _ => false,
        }
    }
}

/// Broad class of a per-satellite rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    /// Empty or malformed timeseries.
    InputData,
    /// Too many invalid or placeholder samples.
    DataQuality,
}

/// Why a satellite was left out of a stage's output.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("position timeseries is empty")]
    EmptyTimeseries,

    #[error("none of the {total} samples carries a valid position")]
    NoValidSamples { total: usize },

    #[error("satellite id appears more than once in the batch")]
    DuplicateId,

    #[error("timestamp {value:?} at sample {index} could not be parsed")]
    InvalidTimestamp { index: usize, value: String },

    #[error("{invalid} of {total} samples have missing or out-of-range elevation")]
    ExcessiveInvalidData { invalid: usize, total: usize },
}

impl RejectionReason {
    pub fn category(&self) -> RejectionCategory {
        match self {
            RejectionReason::ExcessiveInvalidData { .. } => RejectionCategory::DataQuality,
            _ => RejectionCategory::InputData,
        }
    }
}

/// A satellite excluded from a stage, with the reason it was excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub id: SatelliteId,
    pub constellation: Constellation,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn new(id: impl Into<SatelliteId>, constellation: Constellation, reason: RejectionReason) -> Self {
        Self {
            id: id.into(),
            constellation,
            reason,
        }
    }
}
