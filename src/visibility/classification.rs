//! Rule tables grading visibility windows.
//!
//! Both tables are ordered lists scanned top to bottom; the first rule a window satisfies wins and
//! a window matching none gets the lowest grade. The defaults are:
//!
//! | pass quality | max elevation | duration |
//! |---|---|---|
//! | excellent | ≥ 60° | ≥ 8 min |
//! | good | ≥ 45° | ≥ 5 min |
//! | fair | ≥ 30° | ≥ 3 min |
//! | poor | ≥ 15° | ≥ 1 min |
//!
//! | handover suitability | avg elevation | duration | samples ≥ 20° |
//! |---|---|---|---|
//! | highly suitable | ≥ 30° | ≥ 5 min | ≥ 60 % |
//! | suitable | ≥ 20° | ≥ 3 min | ≥ 40 % |
//! | marginally suitable | ≥ 15° | ≥ 2 min | – |
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Second};
use crate::pool_errors::PoolError;

/// Overall grade of a pass, ordered `VeryPoor < … < Excellent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassQuality {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// How usable a pass is as a handover target, ordered `NotSuitable < … < HighlySuitable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverSuitability {
    NotSuitable,
    MarginallySuitable,
    Suitable,
    HighlySuitable,
}

/// Shape of the elevation profile over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryType {
    Rising,
    Setting,
    Transit,
    Level,
}

/// Window features the rule tables look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFeatures {
    pub duration: Second,
    pub max_elevation: Degree,
    pub avg_elevation: Degree,
    /// Share of samples at or above [`ClassificationRules::high_elevation_deg`].
    pub high_elevation_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassQualityRule {
    pub quality: PassQuality,
    pub min_max_elevation_deg: Degree,
    pub min_duration_seconds: Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoverRule {
    pub suitability: HandoverSuitability,
    pub min_avg_elevation_deg: Degree,
    pub min_duration_seconds: Second,
    /// Required share of samples at or above [`ClassificationRules::high_elevation_deg`].
    pub min_high_elevation_fraction: f64,
}

/// Externally configurable classification tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationRules {
    pub pass_quality: Vec<PassQualityRule>,
    pub handover: Vec<HandoverRule>,
    /// Elevation used for the high-elevation sample share of handover rules.
    pub high_elevation_deg: Degree,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        let q = |quality, el, min| PassQualityRule {
            quality,
            min_max_elevation_deg: el,
            min_duration_seconds: min * 60.0,
        };
        let h = |suitability, el, min, frac| HandoverRule {
            suitability,
            min_avg_elevation_deg: el,
            min_duration_seconds: min * 60.0,
            min_high_elevation_fraction: frac,
        };
        ClassificationRules {
            pass_quality: vec![
                q(PassQuality::Excellent, 60.0, 8.0),
                q(PassQuality::Good, 45.0, 5.0),
                q(PassQuality::Fair, 30.0, 3.0),
                q(PassQuality::Poor, 15.0, 1.0),
            ],
            handover: vec![
                h(HandoverSuitability::HighlySuitable, 30.0, 5.0, 0.6),
                h(HandoverSuitability::Suitable, 20.0, 3.0, 0.4),
                h(HandoverSuitability::MarginallySuitable, 15.0, 2.0, 0.0),
            ],
            high_elevation_deg: 20.0,
        }
    }
}

impl ClassificationRules {
    pub fn pass_quality(&self, f: &WindowFeatures) -> PassQuality {
        self.pass_quality
            .iter()
            .find(|r| f.max_elevation >= r.min_max_elevation_deg && f.duration >= r.min_duration_seconds)
            .map_or(PassQuality::VeryPoor, |r| r.quality)
    }

    pub fn handover_suitability(&self, f: &WindowFeatures) -> HandoverSuitability {
        self.handover
            .iter()
            .find(|r| {
                f.avg_elevation >= r.min_avg_elevation_deg
                    && f.duration >= r.min_duration_seconds
                    && f.high_elevation_fraction >= r.min_high_elevation_fraction
            })
            .map_or(HandoverSuitability::NotSuitable, |r| r.suitability)
    }

    /// Reject NaN or negative rule values.
    pub fn validate(&self) -> Result<(), PoolError> {
        let non_negative = |x: f64| matches!(x.partial_cmp(&0.0), Some(o) if o.is_ge());
        let quality_ok = self.pass_quality.iter().all(|r| {
            non_negative(r.min_max_elevation_deg) && non_negative(r.min_duration_seconds)
        });
        let handover_ok = self.handover.iter().all(|r| {
            non_negative(r.min_avg_elevation_deg)
                && non_negative(r.min_duration_seconds)
                && (0.0..=1.0).contains(&r.min_high_elevation_fraction)
        });
        if !(quality_ok && handover_ok && non_negative(self.high_elevation_deg)) {
            return Err(PoolError::InvalidConfiguration(
                "classification rules must hold non-negative thresholds and fractions within [0, 1]"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// Elevation change (degrees) below which a half-window counts as flat.
pub const LEVEL_TOLERANCE_DEG: Degree = 1.0;

/// Classify an elevation profile from its first-half and second-half slopes.
///
/// Profiles with fewer than three samples carry no shape information and are `Level`.
pub fn classify_trajectory(elevations: &[Degree]) -> TrajectoryType {
    let n = elevations.len();
    if n < 3 {
        return TrajectoryType::Level;
    }
    let mid = n / 2;
    let first = elevations[mid] - elevations[0];
    let second = elevations[n - 1] - elevations[mid];
    let tol = LEVEL_TOLERANCE_DEG;

    if first > tol && second < -tol {
        TrajectoryType::Transit
    } else if first >= -tol && second >= -tol && (first > tol || second > tol) {
        TrajectoryType::Rising
    } else if first <= tol && second <= tol && (first < -tol || second < -tol) {
        TrajectoryType::Setting
    } else {
        TrajectoryType::Level
    }
}

#[cfg(test)]
mod classification_test {
    use super::*;

    fn features(duration_min: f64, max_el: f64, avg_el: f64, high: f64) -> WindowFeatures {
        WindowFeatures {
            duration: duration_min * 60.0,
            max_elevation: max_el,
            avg_elevation: avg_el,
            high_elevation_fraction: high,
        }
    }

    #[test]
    fn pass_quality_ladder() {
        let rules = ClassificationRules::default();
        assert_eq!(rules.pass_quality(&features(8.0, 60.0, 40.0, 1.0)), PassQuality::Excellent);
        // high elevation but too short for excellent
        assert_eq!(rules.pass_quality(&features(6.0, 70.0, 40.0, 1.0)), PassQuality::Good);
        assert_eq!(rules.pass_quality(&features(3.0, 30.0, 20.0, 1.0)), PassQuality::Fair);
        assert_eq!(rules.pass_quality(&features(1.0, 15.0, 10.0, 0.0)), PassQuality::Poor);
        assert_eq!(rules.pass_quality(&features(0.5, 80.0, 50.0, 1.0)), PassQuality::VeryPoor);
    }

    #[test]
    fn handover_ladder() {
        let rules = ClassificationRules::default();
        assert_eq!(
            rules.handover_suitability(&features(5.0, 70.0, 30.0, 0.6)),
            HandoverSuitability::HighlySuitable
        );
        assert_eq!(
            rules.handover_suitability(&features(5.0, 70.0, 30.0, 0.5)),
            HandoverSuitability::Suitable
        );
        assert_eq!(
            rules.handover_suitability(&features(2.0, 40.0, 15.0, 0.0)),
            HandoverSuitability::MarginallySuitable
        );
        assert_eq!(
            rules.handover_suitability(&features(10.0, 14.0, 12.0, 0.0)),
            HandoverSuitability::NotSuitable
        );
    }

    #[test]
    fn custom_tables_replace_defaults() {
        let rules = ClassificationRules {
            pass_quality: vec![PassQualityRule {
                quality: PassQuality::Good,
                min_max_elevation_deg: 10.0,
                min_duration_seconds: 0.0,
            }],
            ..Default::default()
        };
        assert_eq!(rules.pass_quality(&features(0.1, 12.0, 5.0, 0.0)), PassQuality::Good);
        assert!(rules.validate().is_ok());

        let broken = ClassificationRules {
            high_elevation_deg: f64::NAN,
            ..Default::default()
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn trajectory_shapes() {
        assert_eq!(classify_trajectory(&[0.0, 20.0, 45.0, 20.0, 0.0]), TrajectoryType::Transit);
        assert_eq!(classify_trajectory(&[5.0, 10.0, 20.0, 30.0]), TrajectoryType::Rising);
        assert_eq!(classify_trajectory(&[30.0, 20.0, 10.0, 5.0]), TrajectoryType::Setting);
        assert_eq!(classify_trajectory(&[20.0, 20.3, 20.1, 19.9]), TrajectoryType::Level);
        assert_eq!(classify_trajectory(&[10.0, 50.0]), TrajectoryType::Level);
        // climbs then plateaus
        assert_eq!(classify_trajectory(&[5.0, 25.0, 40.0, 40.2, 40.0]), TrajectoryType::Rising);
    }
}
