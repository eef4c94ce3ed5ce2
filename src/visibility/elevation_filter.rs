//! # Elevation filtering
//!
//! Applies constellation-specific elevation thresholds, adjusted for the observing environment and
//! the weather, and rejects satellites whose data cannot be trusted.
//!
//! Threshold model
//! -----------------
//! ```text
//! adjusted[tier] = base[tier] × environment_factor × weather_factor
//!
//! environment: open 1.0 · urban 1.1 · mountainous 1.3
//! weather:     clear 1.0 · light_rain 1.2 · heavy_rain 1.4
//! ```
//!
//! Three tiers are configured per constellation: `critical ≤ standard ≤ preferred`.
//! A sample is **kept** iff `elevation ≥ adjusted[standard]`, and tagged with the highest tier it
//! reaches.
//!
//! Data-quality gate
//! -----------------
//! A sample without geometry, or whose elevation is outside `[-90, 90]` (e.g. a `-999`
//! placeholder), is invalid and never defaulted. A satellite whose invalid ratio exceeds
//! [`ElevationConfig::max_invalid_ratio`] (50 % by default) is rejected with
//! [`RejectionReason::ExcessiveInvalidData`].
//!
//! Idempotence
//! -----------------
//! Every derived field of a kept satellite is computed from the retained samples only, so
//! filtering an already filtered set with the same configuration returns it unchanged.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::constants::{Constellation, Degree, SatelliteMap};
use crate::pool_errors::{PoolError, Rejection, RejectionReason};
use crate::satellite::{ObservedSample, QualityTier, SatelliteTrack};

use super::ValidationReport;

/// Observing environment around the ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentType {
    #[default]
    Open,
    Urban,
    Mountainous,
}

impl EnvironmentType {
    pub fn factor(self) -> f64 {
        match self {
            EnvironmentType::Open => 1.0,
            EnvironmentType::Urban => 1.1,
            EnvironmentType::Mountainous => 1.3,
        }
    }
}

/// Weather at the ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    LightRain,
    HeavyRain,
}

impl WeatherCondition {
    pub fn factor(self) -> f64 {
        match self {
            WeatherCondition::Clear => 1.0,
            WeatherCondition::LightRain => 1.2,
            WeatherCondition::HeavyRain => 1.4,
        }
    }
}

/// Elevation thresholds (degrees) of the three quality tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub critical: Degree,
    pub standard: Degree,
    pub preferred: Degree,
}

impl TierThresholds {
    pub const fn new(critical: Degree, standard: Degree, preferred: Degree) -> Self {
        Self {
            critical,
            standard,
            preferred,
        }
    }

    /// Every tier multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            critical: self.critical * factor,
            standard: self.standard * factor,
            preferred: self.preferred * factor,
        }
    }

    /// Highest tier `elevation` satisfies, `None` below the critical threshold.
    pub fn tier_of(&self, elevation: Degree) -> Option<QualityTier> {
        if elevation >= self.preferred {
            Some(QualityTier::Preferred)
        } else if elevation >= self.standard {
            Some(QualityTier::Standard)
        } else if elevation >= self.critical {
            Some(QualityTier::Critical)
        } else {
            None
        }
    }

    /// `0 ≤ critical ≤ standard ≤ preferred ≤ 90`, NaN rejected.
    fn is_well_ordered(&self) -> bool {
        let le = |a: f64, b: f64| matches!(a.partial_cmp(&b), Some(o) if o.is_le());
        le(0.0, self.critical)
            && le(self.critical, self.standard)
            && le(self.standard, self.preferred)
            && le(self.preferred, 90.0)
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        TierThresholds::new(5.0, 10.0, 15.0)
    }
}

/// Configuration of the [`ElevationFilter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// Thresholds for constellations without a specific entry.
    pub default_thresholds: TierThresholds,
    /// Base thresholds per constellation, before environment and weather adjustment.
    #[serde(alias = "base_thresholds")]
    pub constellation_thresholds: BTreeMap<Constellation, TierThresholds>,
    #[serde(alias = "environment_type")]
    pub environment: EnvironmentType,
    #[serde(alias = "weather_conditions")]
    pub weather: WeatherCondition,
    /// Largest tolerated fraction of invalid samples; above it a satellite is rejected.
    pub max_invalid_ratio: f64,
    /// Minimum fraction of retained samples at the preferred tier to recommend for handover.
    pub handover_preferred_fraction: f64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        let mut constellation_thresholds = BTreeMap::new();
        constellation_thresholds.insert(Constellation::Starlink, TierThresholds::new(3.0, 5.0, 10.0));
        constellation_thresholds.insert(Constellation::OneWeb, TierThresholds::new(5.0, 10.0, 15.0));
        ElevationConfig {
            default_thresholds: TierThresholds::default(),
            constellation_thresholds,
            environment: EnvironmentType::Open,
            weather: WeatherCondition::Clear,
            max_invalid_ratio: 0.5,
            handover_preferred_fraction: 0.10,
        }
    }
}

impl ElevationConfig {
    pub fn builder() -> ElevationConfigBuilder {
        ElevationConfigBuilder::new()
    }

    /// `environment_factor × weather_factor`.
    pub fn combined_factor(&self) -> f64 {
        self.environment.factor() * self.weather.factor()
    }

    /// Base thresholds of a constellation, falling back to the defaults.
    pub fn base_thresholds(&self, constellation: &Constellation) -> TierThresholds {
        self.constellation_thresholds
            .get(constellation)
            .copied()
            .unwrap_or(self.default_thresholds)
    }

    /// Environment and weather adjusted thresholds of a constellation.
    pub fn adjusted_thresholds(&self, constellation: &Constellation) -> TierThresholds {
        self.base_thresholds(constellation).scaled(self.combined_factor())
    }

    /// Check every threshold table, before and after adjustment, and the ratios.
    ///
    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] on inverted, negative, NaN or above-zenith thresholds,
    ///   or ratios outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), PoolError> {
        let factor = self.combined_factor();
        let tables = std::iter::once(("default", &self.default_thresholds)).chain(
            self.constellation_thresholds
                .iter()
                .map(|(c, t)| (c.as_str(), t)),
        );
        for (name, table) in tables {
            if !table.is_well_ordered() {
                return Err(PoolError::InvalidConfiguration(format!(
                    "{name} thresholds must satisfy 0 <= critical <= standard <= preferred <= 90"
                )));
            }
            if !table.scaled(factor).is_well_ordered() {
                return Err(PoolError::InvalidConfiguration(format!(
                    "{name} thresholds exceed 90 degrees after environment/weather adjustment"
                )));
            }
        }
        let in_unit = |x: f64| (0.0..=1.0).contains(&x);
        if !in_unit(self.max_invalid_ratio) {
            return Err(PoolError::InvalidConfiguration(
                "max_invalid_ratio must be within [0, 1]".into(),
            ));
        }
        if !in_unit(self.handover_preferred_fraction) {
            return Err(PoolError::InvalidConfiguration(
                "handover_preferred_fraction must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ElevationConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct ElevationConfigBuilder {
    config: ElevationConfig,
}

impl ElevationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_thresholds(mut self, v: TierThresholds) -> Self {
        self.config.default_thresholds = v;
        self
    }
    pub fn constellation_thresholds(mut self, constellation: Constellation, v: TierThresholds) -> Self {
        self.config.constellation_thresholds.insert(constellation, v);
        self
    }
    pub fn environment(mut self, v: EnvironmentType) -> Self {
        self.config.environment = v;
        self
    }
    pub fn weather(mut self, v: WeatherCondition) -> Self {
        self.config.weather = v;
        self
    }
    pub fn max_invalid_ratio(mut self, v: f64) -> Self {
        self.config.max_invalid_ratio = v;
        self
    }
    pub fn handover_preferred_fraction(mut self, v: f64) -> Self {
        self.config.handover_preferred_fraction = v;
        self
    }

    pub fn build(self) -> Result<ElevationConfig, PoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Share of retained samples per tier, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TierDistribution {
    pub standard_pct: f64,
    pub preferred_pct: f64,
}

/// Per-satellite outcome of elevation filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationFilteringInfo {
    pub thresholds_applied: TierThresholds,
    pub tier_distribution: TierDistribution,
    /// At least one sample reaches the standard tier.
    pub meets_standards: bool,
    pub recommended_for_handover: bool,
}

/// Counters over one [`ElevationFilter::filter`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FilterStatistics {
    pub satellites_checked: usize,
    pub satellites_passed: usize,
    /// Rejected by the data-quality gate or for an empty timeseries.
    pub satellites_rejected: usize,
    /// Valid data, but no sample above the standard threshold.
    pub satellites_below_threshold: usize,
    pub positions_checked: usize,
    pub invalid_positions: usize,
    pub positions_above_critical: usize,
    pub positions_above_standard: usize,
    pub positions_above_preferred: usize,
    pub average_retained_elevation_deg: Degree,
}

/// Output of [`ElevationFilter::filter`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterResult {
    pub satellites: SatelliteMap<SatelliteTrack>,
    pub rejected: Vec<Rejection>,
    pub statistics: FilterStatistics,
}

#[derive(Debug, Default, Clone, Copy)]
struct TrackCounts {
    checked: usize,
    invalid: usize,
    above_critical: usize,
    above_standard: usize,
    above_preferred: usize,
    retained_elevation_sum: f64,
}

#[derive(Debug)]
enum TrackOutcome {
    Passed(SatelliteTrack),
    BelowThreshold,
    Rejected(RejectionReason),
}

/// Constellation-aware elevation filter.
#[derive(Debug, Clone)]
pub struct ElevationFilter {
    config: ElevationConfig,
}

impl ElevationFilter {
    /// Errors
    /// ----------
    /// * [`PoolError::InvalidConfiguration`] if `config` does not validate.
    pub fn new(config: ElevationConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ElevationConfig {
        &self.config
    }

    fn filter_track(&self, track: &SatelliteTrack) -> (TrackOutcome, TrackCounts) {
        let thresholds = self.config.adjusted_thresholds(&track.constellation);
        let mut counts = TrackCounts {
            checked: track.position_timeseries.len(),
            ..Default::default()
        };

        if track.position_timeseries.is_empty() {
            return (TrackOutcome::Rejected(RejectionReason::EmptyTimeseries), counts);
        }

        let mut retained: Vec<ObservedSample> = Vec::new();
        for sample in &track.position_timeseries {
            let Some(rel) = sample.valid_observation() else {
                counts.invalid += 1;
                continue;
            };
            let el = rel.elevation_deg;
            counts.above_critical += usize::from(el >= thresholds.critical);
            counts.above_standard += usize::from(el >= thresholds.standard);
            counts.above_preferred += usize::from(el >= thresholds.preferred);

            if el >= thresholds.standard {
                let mut kept = *sample;
                if let Some(kept_rel) = kept.relative_to_observer.as_mut() {
                    kept_rel.is_visible = true;
                    kept_rel.quality_tier = thresholds.tier_of(el);
                }
                counts.retained_elevation_sum += el;
                retained.push(kept);
            }
        }

        let invalid_ratio = counts.invalid as f64 / counts.checked as f64;
        if invalid_ratio > self.config.max_invalid_ratio {
            return (
                TrackOutcome::Rejected(RejectionReason::ExcessiveInvalidData {
                    invalid: counts.invalid,
                    total: counts.checked,
                }),
                counts,
            );
        }
        if retained.is_empty() {
            return (TrackOutcome::BelowThreshold, counts);
        }

        let n = retained.len() as f64;
        let preferred = retained
            .iter()
            .filter(|s| s.relative_to_observer.and_then(|r| r.quality_tier) == Some(QualityTier::Preferred))
            .count() as f64;
        let standard = n - preferred;
        let tier_distribution = TierDistribution {
            standard_pct: standard / n * 100.0,
            preferred_pct: preferred / n * 100.0,
        };

        let mut filtered = SatelliteTrack::new(track.id.clone(), track.constellation.clone(), retained);
        filtered.elevation_filtering = Some(ElevationFilteringInfo {
            thresholds_applied: thresholds,
            tier_distribution,
            meets_standards: true,
            recommended_for_handover: preferred / n >= self.config.handover_preferred_fraction,
        });
        (TrackOutcome::Passed(filtered), counts)
    }

    /// Filter a set of tracks.
    ///
    /// Rejections are logged and listed in [`FilterResult::rejected`]; satellites with valid data
    /// but no sample above the standard threshold are dropped and only counted.
    pub fn filter<'a>(&self, tracks: impl IntoIterator<Item = &'a SatelliteTrack>) -> FilterResult {
        let tracks: Vec<&SatelliteTrack> = tracks.into_iter().collect();

        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = tracks
            .par_iter()
            .map(|track| (*track, self.filter_track(track)))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = tracks
            .iter()
            .map(|track| (*track, self.filter_track(track)))
            .collect();

        let mut result = FilterResult::default();
        let stats = &mut result.statistics;
        let mut retained_points = 0usize;
        let mut retained_sum = 0.0;

        for (track, (outcome, counts)) in outcomes {
            stats.satellites_checked += 1;
            stats.positions_checked += counts.checked;
            stats.invalid_positions += counts.invalid;
            stats.positions_above_critical += counts.above_critical;
            stats.positions_above_standard += counts.above_standard;
            stats.positions_above_preferred += counts.above_preferred;

            match outcome {
                TrackOutcome::Passed(filtered) => {
                    stats.satellites_passed += 1;
                    retained_points += filtered.position_timeseries.len();
                    retained_sum += counts.retained_elevation_sum;
                    result.satellites.insert(filtered.id.clone(), filtered);
                }
                TrackOutcome::BelowThreshold => {
                    stats.satellites_below_threshold += 1;
                    debug!(id = %track.id, "no sample above the standard threshold");
                }
                TrackOutcome::Rejected(reason) => {
                    stats.satellites_rejected += 1;
                    warn!(id = %track.id, %reason, "satellite rejected by elevation filter");
                    result.rejected.push(Rejection::new(
                        track.id.clone(),
                        track.constellation.clone(),
                        reason,
                    ));
                }
            }
        }

        stats.average_retained_elevation_deg = if retained_points > 0 {
            retained_sum / retained_points as f64
        } else {
            0.0
        };

        info!(
            checked = stats.satellites_checked,
            passed = stats.satellites_passed,
            rejected = stats.satellites_rejected,
            factor = self.config.combined_factor(),
            "elevation filter applied"
        );
        result
    }
}

/// Check that a filter result honors the configured thresholds.
///
/// Every kept sample must be valid, at or above the adjusted standard threshold, visible, and
/// tagged with the tier matching its elevation.
pub fn validate_filter(result: &FilterResult, config: &ElevationConfig) -> ValidationReport {
    let mut issues = Vec::new();
    for track in result.satellites.values() {
        let thresholds = config.adjusted_thresholds(&track.constellation);
        if track.position_timeseries.is_empty() {
            issues.push(format!("{}: kept with no samples", track.id));
        }
        if track.elevation_filtering.is_none() {
            issues.push(format!("{}: missing elevation_filtering block", track.id));
        }
        for sample in &track.position_timeseries {
            match sample.valid_observation() {
                None => issues.push(format!("{}: invalid sample kept", track.id)),
                Some(rel) => {
                    if rel.elevation_deg < thresholds.standard || !rel.is_visible {
                        issues.push(format!(
                            "{}: sample at {:.2} deg below standard threshold {:.2}",
                            track.id, rel.elevation_deg, thresholds.standard
                        ));
                    }
                    if rel.quality_tier != thresholds.tier_of(rel.elevation_deg) {
                        issues.push(format!("{}: wrong quality tier", track.id));
                    }
                }
            }
        }
    }
    if result
        .rejected
        .iter()
        .any(|r| result.satellites.contains_key(&r.id))
    {
        issues.push("a rejected satellite is also present in the output".into());
    }
    ValidationReport::from_issues(issues)
}

#[cfg(test)]
mod elevation_filter_test {
    use super::*;
    use crate::satellite::{Geodetic, RelativeObservation};
    use crate::time::shift_seconds;
    use hifitime::Epoch;

    fn track(id: &str, constellation: Constellation, elevations: &[f64]) -> SatelliteTrack {
        let t0 = Epoch::from_gregorian_utc_hms(2025, 9, 18, 0, 0, 0);
        let samples = elevations
            .iter()
            .enumerate()
            .map(|(i, &el)| ObservedSample {
                timestamp: shift_seconds(t0, 30.0 * i as f64),
                geodetic: Geodetic::new(25.0, 121.0, 550.0),
                relative_to_observer: Some(RelativeObservation {
                    elevation_deg: el,
                    azimuth_deg: 10.0 * i as f64,
                    range_km: 1200.0,
                    is_visible: el >= 0.0,
                    quality_tier: None,
                }),
            })
            .collect();
        SatelliteTrack::new(id, constellation, samples)
    }

    #[test]
    fn adjusted_thresholds_apply_both_factors() {
        let config = ElevationConfig::builder()
            .environment(EnvironmentType::Urban)
            .weather(WeatherCondition::HeavyRain)
            .build()
            .unwrap();
        let t = config.adjusted_thresholds(&Constellation::OneWeb);
        approx::assert_relative_eq!(t.standard, 10.0 * 1.1 * 1.4, epsilon = 1e-12);
        approx::assert_relative_eq!(t.preferred, 15.0 * 1.1 * 1.4, epsilon = 1e-12);

        let other = config.adjusted_thresholds(&Constellation::Other("kuiper".into()));
        approx::assert_relative_eq!(other.critical, 5.0 * 1.54, epsilon = 1e-12);
    }

    #[test]
    fn inverted_or_nan_thresholds_are_rejected() {
        let inverted = ElevationConfig::builder()
            .constellation_thresholds(Constellation::Starlink, TierThresholds::new(10.0, 5.0, 15.0))
            .build();
        assert!(matches!(inverted, Err(PoolError::InvalidConfiguration(_))));

        let nan = ElevationConfig::builder()
            .default_thresholds(TierThresholds::new(f64::NAN, 10.0, 15.0))
            .build();
        assert!(nan.is_err());

        let too_high = ElevationConfig::builder()
            .default_thresholds(TierThresholds::new(50.0, 60.0, 80.0))
            .environment(EnvironmentType::Mountainous)
            .build();
        assert!(too_high.is_err());

        assert!(ElevationConfig::builder().max_invalid_ratio(1.5).build().is_err());
    }

    #[test]
    fn keeps_samples_above_standard_and_tags_tiers() {
        let filter = ElevationFilter::new(ElevationConfig::default()).unwrap();
        let input = track("OW-1", Constellation::OneWeb, &[2.0, 7.0, 10.0, 12.0, 15.0, 30.0, 8.0]);
        let result = filter.filter([&input]);

        let kept = &result.satellites["OW-1"];
        let tiers: Vec<_> = kept
            .position_timeseries
            .iter()
            .map(|s| s.relative_to_observer.unwrap().quality_tier.unwrap())
            .collect();
        assert_eq!(
            tiers,
            vec![
                QualityTier::Standard,
                QualityTier::Standard,
                QualityTier::Preferred,
                QualityTier::Preferred
            ]
        );
        let info = kept.elevation_filtering.unwrap();
        assert_eq!(info.tier_distribution.preferred_pct, 50.0);
        assert!(info.meets_standards);
        assert!(info.recommended_for_handover);
        assert_eq!(kept.visibility_summary.visible_points, 4);

        let stats = result.statistics;
        assert_eq!(stats.positions_checked, 7);
        assert_eq!(stats.positions_above_critical, 6);
        assert_eq!(stats.positions_above_standard, 4);
        assert_eq!(stats.positions_above_preferred, 2);
        approx::assert_relative_eq!(stats.average_retained_elevation_deg, 67.0 / 4.0);
        assert!(validate_filter(&result, filter.config()).passed);
    }

    #[test]
    fn starlink_uses_its_own_lower_thresholds() {
        let filter = ElevationFilter::new(ElevationConfig::default()).unwrap();
        let sl = track("SL-1", Constellation::Starlink, &[6.0, 6.0]);
        let ow = track("OW-1", Constellation::OneWeb, &[6.0, 6.0]);
        let result = filter.filter([&sl, &ow]);
        assert!(result.satellites.contains_key("SL-1"));
        assert!(!result.satellites.contains_key("OW-1"));
        assert_eq!(result.statistics.satellites_below_threshold, 1);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn majority_invalid_is_rejected_exactly_half_is_kept() {
        let filter = ElevationFilter::new(ElevationConfig::default()).unwrap();
        let bad = track("SL-BAD", Constellation::Starlink, &[-999.0, 95.0, f64::NAN, 20.0]);
        let mut half = track("SL-HALF", Constellation::Starlink, &[-999.0, 30.0, 40.0, 20.0]);
        half.position_timeseries[3].relative_to_observer = None;

        let result = filter.filter([&bad, &half]);
        assert!(!result.satellites.contains_key("SL-BAD"));
        assert!(result.satellites.contains_key("SL-HALF"));
        assert_eq!(
            result.rejected,
            vec![Rejection::new(
                "SL-BAD",
                Constellation::Starlink,
                RejectionReason::ExcessiveInvalidData { invalid: 3, total: 4 }
            )]
        );
        assert_eq!(result.statistics.invalid_positions, 5);
        assert_eq!(result.statistics.satellites_rejected, 1);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let config = ElevationConfig::builder()
            .weather(WeatherCondition::LightRain)
            .build()
            .unwrap();
        let filter = ElevationFilter::new(config).unwrap();
        let a = track("SL-A", Constellation::Starlink, &[1.0, 5.0, 9.0, 14.0, 25.0, 11.0, 4.0]);
        let b = track("OW-B", Constellation::OneWeb, &[12.0, 19.0, 40.0, 13.0, -999.0]);

        let once = filter.filter([&a, &b]);
        let twice = filter.filter(once.satellites.values());
        assert_eq!(once.satellites, twice.satellites);
        assert!(twice.rejected.is_empty());
    }
}
