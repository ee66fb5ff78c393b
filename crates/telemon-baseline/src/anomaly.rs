use crate::statistics::StatisticalSummary;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use telemon_common::types::Reading;

/// Readings beyond this many standard deviations are flagged.
const DEVIATION_LIMIT: f64 = 3.0;

/// Which side of the baseline an anomalous reading fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    High,
    Low,
}

/// One flagged reading. Derived, never persisted by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Distance from the baseline mean in standard-deviation units. Signed
    /// infinity when the baseline has zero variance.
    pub deviation: f64,
    pub kind: AnomalyKind,
}

/// Flag readings that deviate more than 3σ from the baseline mean.
///
/// Only readings within `recent_window` of the newest reading's timestamp
/// are inspected, so the result depends on the series alone and reruns are
/// identical. With a zero-variance baseline, a reading equal to the mean is
/// never anomalous and any other reading always is. Records come back newest
/// first.
pub fn detect_anomalies(
    series: &[Reading],
    summary: &StatisticalSummary,
    recent_window: Duration,
) -> Vec<AnomalyRecord> {
    let Some(newest) = series.last() else {
        return Vec::new();
    };
    let cutoff = newest.timestamp - recent_window;

    let mut records = Vec::new();
    for reading in series {
        if reading.timestamp < cutoff || !reading.value.is_finite() {
            continue;
        }

        let deviation = if summary.std_dev == 0.0 {
            if reading.value == summary.mean {
                continue;
            } else if reading.value > summary.mean {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        } else {
            (reading.value - summary.mean) / summary.std_dev
        };

        if deviation.abs() > DEVIATION_LIMIT {
            records.push(AnomalyRecord {
                timestamp: reading.timestamp,
                value: reading.value,
                deviation,
                kind: if deviation > 0.0 {
                    AnomalyKind::High
                } else {
                    AnomalyKind::Low
                },
            });
        }
    }

    records.reverse();
    records
}
