use serde::{Deserialize, Serialize};
use std::str::FromStr;
use telemon_common::types::Reading;

/// Minimum run length for pattern conditions.
const MIN_PATTERN_RUN: usize = 3;

/// Configuration error for a single condition.
///
/// These never abort evaluation of sibling conditions in the same rule; the
/// engine records them and treats the malformed condition as non-matching.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("unknown condition type: {0}")]
    UnknownKind(String),

    #[error("unknown compare operator: {0}")]
    UnknownOperator(String),

    #[error("{kind} condition requires a secondary value")]
    MissingSecondaryValue { kind: ConditionKind },

    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("pattern condition does not support operator {0}")]
    UnsupportedPatternOperator(CompareOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl FromStr for CompareOp {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "greater_than" | "gt" => Ok(Self::Gt),
            "<" | "less_than" | "lt" => Ok(Self::Lt),
            ">=" | "greater_equal" | "gte" | "ge" => Ok(Self::Ge),
            "<=" | "less_equal" | "lte" | "le" => Ok(Self::Le),
            "==" | "eq" => Ok(Self::Eq),
            "!=" | "ne" => Ok(Self::Ne),
            _ => Err(ConditionError::UnknownOperator(s.to_string())),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        write!(f, "{s}")
    }
}

impl CompareOp {
    /// `Eq`/`Ne` use exact floating-point equality. This is a known
    /// limitation of the condition language, kept rather than silently
    /// coercing to near-equality.
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Ge => value >= threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Threshold,
    Range,
    Change,
    Pattern,
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Threshold => "threshold",
            Self::Range => "range",
            Self::Change => "change",
            Self::Pattern => "pattern",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConditionKind {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "threshold" => Ok(Self::Threshold),
            "range" => Ok(Self::Range),
            "change" => Ok(Self::Change),
            "pattern" => Ok(Self::Pattern),
            _ => Err(ConditionError::UnknownKind(s.to_string())),
        }
    }
}

/// One typed, validated condition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub operator: CompareOp,
    pub value: f64,
    pub secondary_value: Option<f64>,
}

/// Evaluate one condition against the current value.
///
/// `history` is the rule's evaluation-window samples, oldest first, with the
/// current reading as the last element; `change` and `pattern` conditions
/// read it, the others ignore it.
///
/// Semantics:
/// - `threshold`: `operator(value, condition.value)`
/// - `range`: the value must stay within `[value, secondary_value]`; a match
///   is an out-of-range violation
/// - `change`: `operator(|value - previous|, condition.value)`; with fewer
///   than two samples in the window the condition never matches
/// - `pattern`: strictly monotonic run over the last `condition.value`
///   samples (at least 3): `>`/`>=` selects increasing, `<`/`<=` decreasing.
///   A deliberately conservative trend rule; a shorter history never matches.
pub fn evaluate_condition(
    condition: &Condition,
    value: f64,
    history: &[Reading],
) -> Result<bool, ConditionError> {
    match condition.kind {
        ConditionKind::Threshold => Ok(condition.operator.check(value, condition.value)),
        ConditionKind::Range => {
            let max = condition
                .secondary_value
                .ok_or(ConditionError::MissingSecondaryValue {
                    kind: ConditionKind::Range,
                })?;
            if max < condition.value {
                return Err(ConditionError::InvalidRange {
                    min: condition.value,
                    max,
                });
            }
            Ok(value < condition.value || value > max)
        }
        ConditionKind::Change => {
            if history.len() < 2 {
                return Ok(false);
            }
            let previous = history[history.len() - 2].value;
            Ok(condition.operator.check((value - previous).abs(), condition.value))
        }
        ConditionKind::Pattern => {
            let increasing = match condition.operator {
                CompareOp::Gt | CompareOp::Ge => true,
                CompareOp::Lt | CompareOp::Le => false,
                op => return Err(ConditionError::UnsupportedPatternOperator(op)),
            };
            let run = (condition.value as usize).max(MIN_PATTERN_RUN);
            if history.len() < run {
                return Ok(false);
            }
            let tail = &history[history.len() - run..];
            Ok(tail.windows(2).all(|pair| {
                if increasing {
                    pair[1].value > pair[0].value
                } else {
                    pair[1].value < pair[0].value
                }
            }))
        }
    }
}
