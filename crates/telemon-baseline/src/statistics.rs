use serde::{Deserialize, Serialize};
use telemon_common::types::Reading;

/// Default minimum number of readings before a baseline is considered usable.
pub const DEFAULT_MIN_DATA_POINTS: usize = 50;

/// Descriptive statistics over one window of readings.
///
/// A summary with `count == 0` means every value in the series was filtered
/// out (non-finite); callers must treat it as insufficient data, not as an
/// error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p90: f64,
    /// Percentage of values farther than 2 standard deviations from the mean.
    pub outlier_percentage: f64,
    pub min_data_points: usize,
}

impl StatisticalSummary {
    pub fn has_enough_data(&self) -> bool {
        self.count >= self.min_data_points
    }

    fn empty(min_data_points: usize) -> Self {
        Self {
            count: 0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            p10: 0.0,
            p90: 0.0,
            outlier_percentage: 0.0,
            min_data_points,
        }
    }
}

/// Compute descriptive statistics over a reading series.
///
/// Non-finite values are filtered before anything else runs; a series that
/// filters down to nothing yields a `count == 0` summary. Standard deviation
/// is the population form (denominator `n`, not `n - 1`) so small windows
/// stay deterministic. Percentiles use the nearest-rank method:
/// `index = round(p * (n - 1))` on the sorted copy, never interpolated, so
/// identical series produce bit-identical summaries.
pub fn compute_statistics(series: &[Reading], min_data_points: usize) -> StatisticalSummary {
    let values: Vec<f64> = series
        .iter()
        .map(|r| r.value)
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return StatisticalSummary::empty(min_data_points);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let outliers = values
        .iter()
        .filter(|v| (*v - mean).abs() > 2.0 * std_dev)
        .count();

    StatisticalSummary {
        count: values.len(),
        mean,
        median: percentile_sorted(&sorted, 0.5),
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p10: percentile_sorted(&sorted, 0.1),
        p90: percentile_sorted(&sorted, 0.9),
        outlier_percentage: outliers as f64 / n * 100.0,
        min_data_points,
    }
}

/// Nearest-rank percentile over an already-sorted slice.
///
/// `round()` here is half-away-from-zero, which fixes the tie-break at small
/// sample sizes instead of leaving it to incidental rounding.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let idx = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
