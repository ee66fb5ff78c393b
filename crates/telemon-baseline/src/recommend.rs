use crate::statistics::StatisticalSummary;
use serde::{Deserialize, Serialize};

/// Minimum width kept between a band's min and max when the signal is
/// degenerate (zero variance).
const BAND_EPSILON: f64 = 1e-6;

/// One inclusive `[min, max]` threshold band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    fn clamp_to(self, bounds: Option<(f64, f64)>) -> Band {
        match bounds {
            // clamp() on both endpoints is monotone, so min <= max survives
            Some((lo, hi)) => Band {
                min: self.min.clamp(lo, hi),
                max: self.max.clamp(lo, hi),
            },
            None => self,
        }
    }

    /// Widen so that `inner` fits entirely inside this band.
    fn contain(self, inner: Band) -> Band {
        Band {
            min: self.min.min(inner.min),
            max: self.max.max(inner.max),
        }
    }

    /// Widen a degenerate band symmetrically so `min < max` holds.
    fn ensure_width(self) -> Band {
        if self.max - self.min >= BAND_EPSILON {
            return self;
        }
        Band {
            min: self.min - BAND_EPSILON / 2.0,
            max: self.max + BAND_EPSILON / 2.0,
        }
    }
}

/// How trustworthy a recommendation is, from sample size and outlier ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// Recommended threshold bands for one (device, sensor) pair.
///
/// Bands are `None` when `has_enough_data` is false. When present they are
/// properly nested: `critical ⊇ warning ⊇ optimal`, each with `min < max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecommendation {
    pub optimal: Option<Band>,
    pub warning: Option<Band>,
    pub critical: Option<Band>,
    pub confidence: Confidence,
    /// Deterministic, human-readable justifications in a fixed order.
    pub reasoning: Vec<String>,
    pub has_enough_data: bool,
    pub min_data_points: usize,
}

/// Derive optimal/warning/critical bands from a statistical summary.
///
/// - `optimal` is the empirically observed normal range `[p10, p90]`
/// - `warning` is `mean ± 2σ`, widened to contain `optimal`
/// - `critical` is `mean ± 3σ`, widened to contain `warning`
///
/// `bounds` are the sensor's physically possible limits (see
/// [`telemon_common::types::SensorKind::physical_bounds`]); bands never
/// extend past them. A constant signal (σ = 0) collapses every band to a
/// point, which is widened by a small epsilon so ranges never cross.
pub fn recommend_thresholds(
    summary: &StatisticalSummary,
    bounds: Option<(f64, f64)>,
    min_data_points: usize,
) -> ThresholdRecommendation {
    if summary.count < min_data_points {
        return ThresholdRecommendation {
            optimal: None,
            warning: None,
            critical: None,
            confidence: Confidence::Low,
            reasoning: vec![format!(
                "insufficient data: {}/{}",
                summary.count, min_data_points
            )],
            has_enough_data: false,
            min_data_points,
        };
    }

    let optimal = Band {
        min: summary.p10,
        max: summary.p90,
    }
    .clamp_to(bounds)
    .ensure_width();

    let warning = Band {
        min: summary.mean - 2.0 * summary.std_dev,
        max: summary.mean + 2.0 * summary.std_dev,
    }
    .clamp_to(bounds)
    .contain(optimal);

    let critical = Band {
        min: summary.mean - 3.0 * summary.std_dev,
        max: summary.mean + 3.0 * summary.std_dev,
    }
    .clamp_to(bounds)
    .contain(warning);

    let confidence = if summary.count >= 5 * min_data_points && summary.outlier_percentage < 5.0 {
        Confidence::High
    } else if summary.count >= min_data_points && summary.outlier_percentage < 15.0 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    let mut reasoning = vec![
        format!(
            "sample size: {} readings (minimum {})",
            summary.count, min_data_points
        ),
        format!(
            "outlier ratio: {:.1}% of readings beyond 2 standard deviations",
            summary.outlier_percentage
        ),
        format!(
            "observed spread: mean {:.2}, std dev {:.2}, p10-p90 [{:.2}, {:.2}]",
            summary.mean, summary.std_dev, summary.p10, summary.p90
        ),
    ];
    if summary.std_dev == 0.0 {
        reasoning.push("constant signal: bands widened by a minimal epsilon".to_string());
    }

    ThresholdRecommendation {
        optimal: Some(optimal),
        warning: Some(warning),
        critical: Some(critical),
        confidence,
        reasoning,
        has_enough_data: true,
        min_data_points,
    }
}
