mod common;

use approx::assert_relative_eq;
use satpool::constants::Constellation;
use satpool::pool_errors::{RejectionCategory, RejectionReason};
use satpool::satellite::{Geodetic, ObservedSample, PositionSample, RelativeObservation, SatelliteInput, SatelliteTrack};
use satpool::time::shift_seconds;
use satpool::visibility::analyzer::{AnalyzerParams, VisibilityAnalyzer};
use satpool::visibility::calculator::{validate_batch, VisibilityCalculator};
use satpool::visibility::classification::TrajectoryType;
use satpool::visibility::elevation_filter::{
    validate_filter, ElevationConfig, ElevationFilter, EnvironmentType, WeatherCondition,
};

use common::{mixed_batch, ntpu, pass, t0};

#[test]
fn elevations_stay_within_bounds() {
    let calculator = VisibilityCalculator::new(ntpu());
    let result = calculator.calculate_batch(&mixed_batch());

    assert_eq!(result.batch_statistics.total_satellites, 28);
    assert_eq!(result.batch_statistics.satellites_excluded, 0);
    for track in result.satellites.values() {
        for sample in &track.position_timeseries {
            let rel = sample.relative_to_observer.unwrap();
            assert!((-90.0..=90.0).contains(&rel.elevation_deg));
            assert!((0.0..360.0).contains(&rel.azimuth_deg));
            assert!(rel.range_km > 0.0);
            assert_eq!(rel.is_visible, rel.elevation_deg >= 0.0);
        }
    }
    assert!(validate_batch(&result).passed);
}

#[test]
fn overhead_pass_peaks_near_zenith() {
    let calculator = VisibilityCalculator::new(ntpu());
    let track = calculator
        .track_satellite(&pass("SL-ZENITH", Constellation::Starlink, 0.0, 0.0))
        .unwrap();
    // sample 12 sits straight above the observer
    assert!(track.visibility_summary.max_elevation_deg > 85.0);
    let peak = track.position_timeseries[12].relative_to_observer.unwrap();
    assert_relative_eq!(peak.range_km, 550.0, epsilon = 15.0);

    let far = calculator
        .track_satellite(&pass("SL-FAR", Constellation::Starlink, 0.0, 40.0))
        .unwrap();
    assert_eq!(far.visibility_summary.visible_points, 0);
}

#[test]
fn empty_batch_is_not_an_error() {
    let result = VisibilityCalculator::new(ntpu()).calculate_batch(&[]);
    assert_eq!(result.batch_statistics.total_satellites, 0);
    assert!(result.satellites.is_empty());
    assert!(result.excluded.is_empty());
}

#[test]
fn empty_and_duplicate_satellites_are_excluded() {
    let batch = vec![
        pass("SL-1", Constellation::Starlink, 0.0, 5.0),
        SatelliteInput::new("SL-EMPTY", Constellation::Starlink, vec![]),
        pass("SL-1", Constellation::Starlink, 600.0, 5.0),
    ];
    let result = VisibilityCalculator::new(ntpu()).calculate_batch(&batch);
    assert_eq!(result.satellites.len(), 1);
    assert_eq!(result.batch_statistics.satellites_excluded, 2);
    let reasons: Vec<_> = result.excluded.iter().map(|r| r.reason.clone()).collect();
    assert!(reasons.contains(&RejectionReason::EmptyTimeseries));
    assert!(reasons.contains(&RejectionReason::DuplicateId));
    // the first occurrence wins
    assert_eq!(result.satellites["SL-1"].first_timestamp(), Some(t0()));
}

#[test]
fn filtered_samples_clear_the_adjusted_standard_threshold() {
    let config = ElevationConfig::builder()
        .environment(EnvironmentType::Urban)
        .weather(WeatherCondition::HeavyRain)
        .build()
        .unwrap();
    let filter = ElevationFilter::new(config.clone()).unwrap();
    let visibility = VisibilityCalculator::new(ntpu()).calculate_batch(&mixed_batch());
    let filtered = filter.filter(visibility.satellites.values());

    assert!(filtered.statistics.satellites_passed > 0);
    for track in filtered.satellites.values() {
        let standard = config.adjusted_thresholds(&track.constellation).standard;
        for sample in &track.position_timeseries {
            let rel = sample.relative_to_observer.unwrap();
            assert!(rel.is_visible);
            assert!(rel.elevation_deg >= standard);
        }
    }
    assert!(validate_filter(&filtered, &config).passed);
}

#[test]
fn filtering_twice_changes_nothing() {
    let filter = ElevationFilter::new(ElevationConfig::default()).unwrap();
    let visibility = VisibilityCalculator::new(ntpu()).calculate_batch(&mixed_batch());
    let once = filter.filter(visibility.satellites.values());
    let twice = filter.filter(once.satellites.values());
    assert_eq!(once.satellites, twice.satellites);
    assert!(twice.rejected.is_empty());
}

#[test]
fn mostly_invalid_satellite_is_rejected_by_the_filter() {
    let mut input = pass("SL-BROKEN", Constellation::Starlink, 0.0, 2.0);
    // 15 of 25 samples carry a placeholder latitude
    for sample in input.position_timeseries.iter_mut().take(15) {
        sample.geodetic = Geodetic::new(-999.0, 0.0, 550.0);
    }
    let visibility = VisibilityCalculator::new(ntpu()).calculate_batch(&[input]);
    assert_eq!(visibility.satellites.len(), 1);

    let filtered = ElevationFilter::new(ElevationConfig::default())
        .unwrap()
        .filter(visibility.satellites.values());
    assert!(filtered.satellites.is_empty());
    assert_eq!(filtered.statistics.satellites_rejected, 1);
    assert_eq!(
        filtered.rejected[0].reason,
        RejectionReason::ExcessiveInvalidData {
            invalid: 15,
            total: 25
        }
    );
    assert_eq!(filtered.rejected[0].reason.category(), RejectionCategory::DataQuality);
}

#[test]
fn filtered_pass_becomes_one_transit_window() {
    let visibility = VisibilityCalculator::new(ntpu())
        .calculate_batch(&[pass("SL-HIGH", Constellation::Starlink, 0.0, 3.0)]);
    let filtered = ElevationFilter::new(ElevationConfig::default())
        .unwrap()
        .filter(visibility.satellites.values());
    let analysis = VisibilityAnalyzer::new(AnalyzerParams::default())
        .unwrap()
        .analyze(filtered.satellites.values());

    let sat = &analysis.satellites["SL-HIGH"];
    assert_eq!(sat.enhanced_visibility_windows.len(), 1);
    let window = &sat.enhanced_visibility_windows[0];
    assert_eq!(window.trajectory_type, TrajectoryType::Transit);
    assert!(window.is_valid_pass);
    assert!(window.max_elevation_deg > 45.0);
    assert!(sat.handover_recommendations.is_candidate_for_handover);
}

/// 1 Hz samples visible on [0, 10] and [13, 20].
fn gapped_track() -> SatelliteTrack {
    let samples = (0..=20)
        .map(|t| {
            let visible = !(11..=12).contains(&t);
            let el = if visible { 20.0 } else { -2.0 };
            ObservedSample {
                timestamp: shift_seconds(t0(), t as f64),
                geodetic: Geodetic::new(25.0, 121.0, 550.0),
                relative_to_observer: Some(RelativeObservation {
                    elevation_deg: el,
                    azimuth_deg: 90.0,
                    range_km: 1500.0,
                    is_visible: visible,
                    quality_tier: None,
                }),
            }
        })
        .collect();
    SatelliteTrack::new("SL-GAP", Constellation::Starlink, samples)
}

#[test]
fn merge_gap_controls_window_count() {
    let track = gapped_track();

    let merging = VisibilityAnalyzer::new(AnalyzerParams::builder().max_gap_seconds(120.0).build().unwrap()).unwrap();
    let windows = merging.windows_for(&track);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start, t0());
    assert_eq!(windows[0].end, shift_seconds(t0(), 20.0));

    let strict = VisibilityAnalyzer::new(AnalyzerParams::builder().max_gap_seconds(0.0).build().unwrap()).unwrap();
    assert_eq!(strict.windows_for(&track).len(), 2);
}

#[test]
fn unordered_input_is_sorted() {
    let mut input = pass("SL-SHUFFLED", Constellation::Starlink, 0.0, 4.0);
    input.position_timeseries.reverse();
    let samples: &Vec<PositionSample> = &input.position_timeseries;
    assert!(samples[0].timestamp > samples[1].timestamp);

    let track = VisibilityCalculator::new(ntpu()).track_satellite(&input).unwrap();
    assert!(track
        .position_timeseries
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}
