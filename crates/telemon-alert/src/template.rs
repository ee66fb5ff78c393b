use crate::condition::{Condition, ConditionError};
use serde::{Deserialize, Serialize};
use telemon_common::types::Severity;

/// One condition as written in a template's JSON config.
///
/// Kind and operator stay raw strings here so a typo in one condition is a
/// per-condition error at compile time, not a parse failure that takes the
/// whole template down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub operator: String,
    pub value: f64,
    #[serde(default)]
    pub secondary_value: Option<f64>,
}

impl ConditionSpec {
    /// Validate and convert into a typed [`Condition`].
    pub fn compile(&self) -> Result<Condition, ConditionError> {
        Ok(Condition {
            kind: self.kind.parse()?,
            operator: self.operator.parse()?,
            value: self.value,
            secondary_value: self.secondary_value,
        })
    }
}

fn default_evaluation_window_secs() -> u64 {
    300
}

/// Rule parameters carried by a template, JSON-compatible with the rule
/// rows the management layer stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub conditions: Vec<ConditionSpec>,
    pub severity: Severity,
    /// Alert message; `{value}` is replaced with the triggering reading.
    #[serde(default)]
    pub message: String,
    /// How long all conditions must match continuously before firing.
    #[serde(default = "default_evaluation_window_secs")]
    pub evaluation_window_secs: u64,
    /// Re-emit a fired decision every this many seconds while still firing.
    /// `None` (the default) means fire once and stay silent until clear.
    #[serde(default)]
    pub renotify_secs: Option<u64>,
}

/// A reusable alert-rule definition.
///
/// System templates (`is_system`) are immutable from this crate's
/// perspective: deletion is always rejected as a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub id: String,
    pub name: String,
    /// Glob over device-sensor ids selecting which sensors this template can
    /// bind to, e.g. `"*/temperature"`.
    pub sensor_pattern: String,
    #[serde(default)]
    pub is_system: bool,
    pub config: RuleConfig,
}
