use crate::anomaly::{detect_anomalies, AnomalyKind};
use crate::cache::{CacheKey, SummaryCache};
use crate::recommend::{recommend_thresholds, Confidence};
use crate::statistics::{compute_statistics, StatisticalSummary};
use chrono::{DateTime, Duration, TimeZone, Utc};
use telemon_common::types::Reading;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// Build a series with one reading per second starting at a fixed epoch.
fn series_from(values: &[f64]) -> Vec<Reading> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| Reading::new(base_time() + Duration::seconds(i as i64), *v))
        .collect()
}

fn key(device: &str, sensor: &str) -> CacheKey {
    CacheKey {
        device_id: device.to_string(),
        sensor_id: sensor.to_string(),
        range: "24h".to_string(),
        aggregation: "raw".to_string(),
    }
}

#[test]
fn statistics_known_values() {
    let series = series_from(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    let summary = compute_statistics(&series, 1);

    assert_eq!(summary.count, 8);
    assert!((summary.mean - 5.0).abs() < 1e-12);
    // population std dev: sqrt(32 / 8) = 2
    assert!((summary.std_dev - 2.0).abs() < 1e-12);
    assert_eq!(summary.min, 2.0);
    assert_eq!(summary.max, 9.0);
    // nearest-rank on sorted [2,4,4,4,5,5,7,9]: median idx 4, p10 idx 1, p90 idx 6
    assert_eq!(summary.median, 5.0);
    assert_eq!(summary.p10, 4.0);
    assert_eq!(summary.p90, 7.0);
    // |9 - 5| = 4 is not strictly beyond 2 std devs
    assert_eq!(summary.outlier_percentage, 0.0);
}

#[test]
fn statistics_nearest_rank_rounds_half_away_from_zero() {
    let series = series_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    let summary = compute_statistics(&series, 1);

    // median index: round(0.5 * 9) = round(4.5) = 5
    assert_eq!(summary.median, 6.0);
    assert_eq!(summary.p10, 2.0);
    assert_eq!(summary.p90, 9.0);
}

#[test]
fn statistics_filters_non_finite_values() {
    let series = series_from(&[1.0, f64::NAN, 2.0, f64::INFINITY, 3.0, f64::NEG_INFINITY]);
    let summary = compute_statistics(&series, 1);

    assert_eq!(summary.count, 3);
    assert!((summary.mean - 2.0).abs() < 1e-12);
}

#[test]
fn statistics_all_filtered_yields_empty_summary() {
    let series = series_from(&[f64::NAN, f64::NAN]);
    let summary = compute_statistics(&series, 50);

    assert_eq!(summary.count, 0);
    assert!(!summary.has_enough_data());
}

#[test]
fn statistics_is_idempotent() {
    let values: Vec<f64> = (0..80).map(|i| 30.0 + (i as f64 * 0.31).sin() * 4.0).collect();
    let series = series_from(&values);

    let first = compute_statistics(&series, 50);
    let second = compute_statistics(&series, 50);
    assert_eq!(first, second);
}

#[test]
fn recommend_rejects_insufficient_data() {
    let series = series_from(&[1.0; 10]);
    let summary = compute_statistics(&series, 50);
    let rec = recommend_thresholds(&summary, None, 50);

    assert!(!rec.has_enough_data);
    assert!(rec.optimal.is_none());
    assert!(rec.warning.is_none());
    assert!(rec.critical.is_none());
    assert_eq!(rec.reasoning[0], "insufficient data: 10/50");
}

#[test]
fn recommend_bands_are_properly_nested() {
    let values: Vec<f64> = (0..120).map(|i| 50.0 + (i as f64 * 0.7).sin() * 10.0).collect();
    let series = series_from(&values);
    let summary = compute_statistics(&series, 50);
    let rec = recommend_thresholds(&summary, None, 50);

    assert!(rec.has_enough_data);
    let optimal = rec.optimal.unwrap();
    let warning = rec.warning.unwrap();
    let critical = rec.critical.unwrap();

    assert!(optimal.min < optimal.max);
    assert!(warning.min <= optimal.min);
    assert!(optimal.max <= warning.max);
    assert!(critical.min <= warning.min);
    assert!(warning.max <= critical.max);
}

#[test]
fn recommend_constant_signal_widens_degenerate_bands() {
    let series = series_from(&[5.0; 60]);
    let summary = compute_statistics(&series, 50);
    let rec = recommend_thresholds(&summary, None, 50);

    let optimal = rec.optimal.unwrap();
    let warning = rec.warning.unwrap();
    let critical = rec.critical.unwrap();
    assert!(optimal.min < optimal.max);
    assert!(warning.min < warning.max);
    assert!(critical.min < critical.max);
    assert!(rec
        .reasoning
        .iter()
        .any(|r| r.contains("constant signal")));
}

#[test]
fn recommend_temperature_scenario() {
    // 60 readings, mean 22.0, population std dev exactly 1.5
    let mut values = Vec::new();
    for i in 0..60 {
        values.push(if i % 2 == 0 { 20.5 } else { 23.5 });
    }
    let series = series_from(&values);
    let summary = compute_statistics(&series, 50);

    assert!((summary.mean - 22.0).abs() < 1e-9);
    assert!((summary.std_dev - 1.5).abs() < 1e-9);

    let rec = recommend_thresholds(&summary, None, 50);
    let optimal = rec.optimal.unwrap();
    let warning = rec.warning.unwrap();

    // p10/p90 of the observed distribution, near the 19.8..24.2 normal band
    assert!(optimal.min >= 19.5 && optimal.min <= 21.0);
    assert!(optimal.max >= 23.0 && optimal.max <= 24.5);
    assert!((warning.min - 19.0).abs() < 1e-9);
    assert!((warning.max - 25.0).abs() < 1e-9);
    // exactly at min_data_points with a low outlier ratio
    assert_eq!(rec.confidence, Confidence::Medium);
}

#[test]
fn recommend_confidence_high_with_large_clean_sample() {
    let values: Vec<f64> = (0..250).map(|i| 50.0 + (i as f64).sin() * 10.0).collect();
    let series = series_from(&values);
    let summary = compute_statistics(&series, 50);
    let rec = recommend_thresholds(&summary, None, 50);

    assert_eq!(rec.confidence, Confidence::High);
}

#[test]
fn recommend_clamps_to_physical_bounds() {
    // humidity hovering at the sensor ceiling: mean 99, std dev 1
    let mut values = Vec::new();
    for i in 0..60 {
        values.push(if i % 2 == 0 { 98.0 } else { 100.0 });
    }
    let series = series_from(&values);
    let summary = compute_statistics(&series, 50);
    let rec = recommend_thresholds(&summary, Some((0.0, 100.0)), 50);

    let warning = rec.warning.unwrap();
    let critical = rec.critical.unwrap();
    assert_eq!(warning.max, 100.0);
    assert_eq!(critical.max, 100.0);
    assert!(critical.min <= warning.min);
}

#[test]
fn anomaly_zero_variance_baseline() {
    let series = series_from(&[10.0; 20]);
    let summary = compute_statistics(&series, 1);
    assert_eq!(summary.std_dev, 0.0);

    // every value equals the mean: nothing anomalous
    assert!(detect_anomalies(&series, &summary, Duration::hours(24)).is_empty());

    // any other value is always anomalous
    let mut bumped = series.clone();
    bumped.push(Reading::new(base_time() + Duration::seconds(20), 12.0));
    let records = detect_anomalies(&bumped, &summary, Duration::hours(24));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, 12.0);
    assert_eq!(records[0].kind, AnomalyKind::High);
    assert!(records[0].deviation.is_infinite());
}

#[test]
fn anomaly_flags_beyond_three_sigma_newest_first() {
    let summary = StatisticalSummary {
        count: 100,
        mean: 50.0,
        median: 50.0,
        std_dev: 5.0,
        min: 45.0,
        max: 55.0,
        p10: 45.0,
        p90: 55.0,
        outlier_percentage: 0.0,
        min_data_points: 50,
    };
    let series = series_from(&[50.0, 70.0, 36.0, 30.0]);
    let records = detect_anomalies(&series, &summary, Duration::hours(24));

    // 70 is +4 sigma, 30 is -4 sigma, 36 is only -2.8 sigma
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].value, 30.0);
    assert_eq!(records[0].kind, AnomalyKind::Low);
    assert_eq!(records[1].value, 70.0);
    assert_eq!(records[1].kind, AnomalyKind::High);
    assert!((records[1].deviation - 4.0).abs() < 1e-12);
}

#[test]
fn anomaly_ignores_readings_outside_recent_window() {
    let summary = StatisticalSummary {
        count: 100,
        mean: 50.0,
        median: 50.0,
        std_dev: 5.0,
        min: 45.0,
        max: 55.0,
        p10: 45.0,
        p90: 55.0,
        outlier_percentage: 0.0,
        min_data_points: 50,
    };
    let series = vec![
        Reading::new(base_time() - Duration::hours(48), 100.0),
        Reading::new(base_time(), 51.0),
    ];
    let records = detect_anomalies(&series, &summary, Duration::hours(24));
    assert!(records.is_empty());
}

#[test]
fn cache_returns_cached_summary_within_ttl() {
    let mut cache = SummaryCache::new(600);
    let series = series_from(&[1.0, 2.0, 3.0]);
    let now = base_time();
    let mut computations = 0;

    let first = cache.get_or_compute(key("dev-1", "temperature"), now, || {
        computations += 1;
        compute_statistics(&series, 50)
    });
    let second = cache.get_or_compute(key("dev-1", "temperature"), now + Duration::seconds(30), || {
        computations += 1;
        compute_statistics(&series, 50)
    });

    assert_eq!(computations, 1);
    assert_eq!(first, second);
}

#[test]
fn cache_expires_by_ttl_only() {
    let mut cache = SummaryCache::new(600);
    let series = series_from(&[1.0, 2.0, 3.0]);
    let now = base_time();
    let mut computations = 0;

    for offset in [0i64, 601] {
        cache.get_or_compute(key("dev-1", "temperature"), now + Duration::seconds(offset), || {
            computations += 1;
            compute_statistics(&series, 50)
        });
    }
    assert_eq!(computations, 2);

    cache.evict_expired(now + Duration::hours(2));
    assert!(cache.is_empty());
}
