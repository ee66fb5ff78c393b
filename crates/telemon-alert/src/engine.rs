use crate::binder::BoundRule;
use crate::condition::{evaluate_condition, ConditionError};
use crate::error::AlertError;
use crate::window::SlidingWindow;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use telemon_common::types::{AlertDecision, Reading};

/// Key: (device_sensor_id, rule/binding id)
type EngineKey = (String, String);

/// Windows must keep enough history for change/pattern conditions even when
/// the evaluation window is short.
const MIN_WINDOW_SECS: u64 = 600;

/// Dwell state of one (device sensor, rule) key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleState {
    Normal,
    /// Conditions are matching but the evaluation window has not elapsed.
    Violating { first_violation_at: DateTime<Utc> },
    /// Alert emitted; stays here without re-emitting until clear (or the
    /// rule's renotify interval elapses).
    Firing {
        since: DateTime<Utc>,
        last_notified_at: DateTime<Utc>,
    },
}

/// What one `ingest` call produced: emitted decisions plus any stale
/// readings rejected per key as [`AlertError::OutOfOrder`].
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub decisions: Vec<AlertDecision>,
    pub rejected: Vec<AlertError>,
}

/// Result of evaluating one rule against one reading.
pub struct Evaluation {
    pub state: RuleState,
    pub decision: Option<AlertDecision>,
    /// Configuration errors hit during this evaluation, by condition index.
    pub condition_errors: Vec<(usize, ConditionError)>,
}

/// Pure transition function for the per-key state machine.
///
/// `history` is the rule's evaluation window, oldest first, with `reading`
/// as the last element. The reading's own timestamp drives dwell timing, so
/// replaying a series gives identical transitions.
///
/// State machine: `Normal → Violating → Firing → Normal`. A rule fires only
/// after all conditions have matched continuously for
/// `evaluation_window_secs`; a transient blip that stops matching earlier
/// falls back to `Normal` with no decision. A firing rule emits exactly one
/// clear (`fired = false`) decision when matching stops.
pub fn evaluate_rule(
    rule: &BoundRule,
    reading: &Reading,
    history: &[Reading],
    prior: RuleState,
) -> Evaluation {
    let now = reading.timestamp;
    let mut condition_errors = Vec::new();

    // All conditions must match (AND); a rule with no conditions never does.
    let mut matching = !rule.conditions.is_empty();
    for (index, slot) in rule.conditions.iter().enumerate() {
        let matched = match slot {
            Ok(condition) => match evaluate_condition(condition, reading.value, history) {
                Ok(matched) => matched,
                Err(err) => {
                    condition_errors.push((index, err));
                    false
                }
            },
            Err(err) => {
                condition_errors.push((index, err.clone()));
                false
            }
        };
        matching &= matched;
    }

    let window = Duration::seconds(rule.evaluation_window_secs as i64);

    let (state, decision) = match prior {
        RuleState::Normal if !matching => (RuleState::Normal, None),
        RuleState::Normal => {
            if window.is_zero() {
                (
                    RuleState::Firing {
                        since: now,
                        last_notified_at: now,
                    },
                    Some(fire_decision(rule, reading, now, now)),
                )
            } else {
                (
                    RuleState::Violating {
                        first_violation_at: now,
                    },
                    None,
                )
            }
        }
        RuleState::Violating { .. } if !matching => (RuleState::Normal, None),
        RuleState::Violating { first_violation_at } => {
            if now - first_violation_at >= window {
                (
                    RuleState::Firing {
                        since: first_violation_at,
                        last_notified_at: now,
                    },
                    Some(fire_decision(rule, reading, first_violation_at, now)),
                )
            } else {
                (RuleState::Violating { first_violation_at }, None)
            }
        }
        RuleState::Firing { .. } if !matching => (RuleState::Normal, Some(clear_decision(rule, reading, now))),
        RuleState::Firing {
            since,
            last_notified_at,
        } => match rule.renotify_secs {
            Some(renotify)
                if now - last_notified_at >= Duration::seconds(renotify as i64) =>
            {
                (
                    RuleState::Firing {
                        since,
                        last_notified_at: now,
                    },
                    Some(fire_decision(rule, reading, since, now)),
                )
            }
            _ => (
                RuleState::Firing {
                    since,
                    last_notified_at,
                },
                None,
            ),
        },
    };

    Evaluation {
        state,
        decision,
        condition_errors,
    }
}

fn fire_decision(
    rule: &BoundRule,
    reading: &Reading,
    first_violation_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AlertDecision {
    let message = if rule.message.is_empty() {
        format!(
            "{} triggered on {} (value {:.2})",
            rule.name, rule.device_sensor_id, reading.value
        )
    } else {
        rule.message
            .replace("{value}", &format!("{:.2}", reading.value))
    };
    AlertDecision {
        rule_id: rule.id.clone(),
        device_sensor_id: rule.device_sensor_id.clone(),
        fired: true,
        severity: rule.severity,
        message,
        value: reading.value,
        first_violation_at: Some(first_violation_at),
        last_evaluated_at: now,
    }
}

fn clear_decision(rule: &BoundRule, reading: &Reading, now: DateTime<Utc>) -> AlertDecision {
    AlertDecision {
        rule_id: rule.id.clone(),
        device_sensor_id: rule.device_sensor_id.clone(),
        fired: false,
        severity: rule.severity,
        message: format!("{} cleared on {}", rule.name, rule.device_sensor_id),
        value: reading.value,
        first_violation_at: None,
        last_evaluated_at: now,
    }
}

/// Stateful rule engine over live readings.
///
/// Holds the per-key windows and dwell states for every bound rule it owns.
/// `ingest` takes `&mut self`, so evaluation of a given key is single-writer
/// by construction; deployments shard engines across workers with each
/// (device sensor, rule) key owned by exactly one engine.
pub struct AlertEngine {
    rules: Vec<BoundRule>,
    windows: HashMap<EngineKey, SlidingWindow>,
    states: HashMap<EngineKey, RuleState>,
    last_evaluated: HashMap<EngineKey, DateTime<Utc>>,
}

impl AlertEngine {
    pub fn new(rules: Vec<BoundRule>) -> Self {
        Self {
            rules,
            windows: HashMap::new(),
            states: HashMap::new(),
            last_evaluated: HashMap::new(),
        }
    }

    pub fn rules(&self) -> &[BoundRule] {
        &self.rules
    }

    pub fn get_rule(&self, id: &str) -> Option<&BoundRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Add a rule at runtime.
    pub fn add_rule(&mut self, rule: BoundRule) {
        self.rules.push(rule);
    }

    /// Remove a rule and its accumulated state. Returns true if found.
    pub fn remove_rule(&mut self, id: &str) -> bool {
        let len_before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.windows.retain(|(_, rule_id), _| rule_id != id);
        self.states.retain(|(_, rule_id), _| rule_id != id);
        self.last_evaluated.retain(|(_, rule_id), _| rule_id != id);
        self.rules.len() < len_before
    }

    /// Replace all rules with a new set, dropping accumulated state.
    pub fn replace_rules(&mut self, rules: Vec<BoundRule>) {
        self.rules = rules;
        self.windows.clear();
        self.states.clear();
        self.last_evaluated.clear();
    }

    /// Current dwell state for one key, `Normal` if never evaluated.
    pub fn state(&self, device_sensor_id: &str, rule_id: &str) -> RuleState {
        self.states
            .get(&(device_sensor_id.to_string(), rule_id.to_string()))
            .copied()
            .unwrap_or(RuleState::Normal)
    }

    /// Evaluate one reading against every rule bound to its device sensor.
    ///
    /// Readings must arrive in timestamp order per key; an out-of-order
    /// reading is rejected for that key — logged and reported in the
    /// outcome — rather than allowed to reset a dwell timer retroactively.
    /// Rejection of one key never blocks evaluation of the others.
    pub fn ingest(&mut self, device_sensor_id: &str, reading: Reading) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for rule in &self.rules {
            if rule.device_sensor_id != device_sensor_id {
                continue;
            }

            let key = (device_sensor_id.to_string(), rule.id.clone());

            if let Some(last) = self.last_evaluated.get(&key) {
                if reading.timestamp < *last {
                    tracing::warn!(
                        rule_id = %rule.id,
                        device_sensor_id,
                        timestamp = %reading.timestamp,
                        last_evaluated_at = %last,
                        "out-of-order reading rejected"
                    );
                    outcome.rejected.push(AlertError::OutOfOrder {
                        rule_id: rule.id.clone(),
                        timestamp: reading.timestamp,
                        last_evaluated_at: *last,
                    });
                    continue;
                }
            }

            let window_secs = rule.evaluation_window_secs.max(MIN_WINDOW_SECS);
            let window = self
                .windows
                .entry(key.clone())
                .or_insert_with(|| SlidingWindow::new(window_secs));
            window.push(reading);
            window.evict(reading.timestamp);
            let history = window.as_contiguous_slice();

            let prior = self
                .states
                .get(&key)
                .copied()
                .unwrap_or(RuleState::Normal);
            let evaluation = evaluate_rule(rule, &reading, history, prior);

            for (index, err) in &evaluation.condition_errors {
                tracing::warn!(
                    rule_id = %rule.id,
                    device_sensor_id,
                    condition = index,
                    %err,
                    "malformed condition treated as non-matching"
                );
            }

            self.states.insert(key.clone(), evaluation.state);
            self.last_evaluated.insert(key, reading.timestamp);

            if let Some(decision) = evaluation.decision {
                tracing::debug!(
                    rule_id = %rule.id,
                    device_sensor_id,
                    fired = decision.fired,
                    "alert decision emitted"
                );
                outcome.decisions.push(decision);
            }
        }

        outcome
    }
}
