//! Statistical baselines for sensor telemetry.
//!
//! Computes descriptive statistics over a window of historical readings,
//! derives optimal/warning/critical threshold bands with a confidence
//! rating, and flags anomalous readings against the baseline. All
//! computation here is pure: the same series always produces the same
//! output, so independent (device, sensor) pairs can be processed in
//! parallel without coordination.

pub mod anomaly;
pub mod cache;
pub mod recommend;
pub mod statistics;

#[cfg(test)]
mod tests;

pub use anomaly::{detect_anomalies, AnomalyKind, AnomalyRecord};
pub use cache::{CacheKey, SummaryCache};
pub use recommend::{recommend_thresholds, Band, Confidence, ThresholdRecommendation};
pub use statistics::{compute_statistics, StatisticalSummary, DEFAULT_MIN_DATA_POINTS};
