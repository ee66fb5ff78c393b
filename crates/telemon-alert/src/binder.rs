use crate::condition::{Condition, ConditionError};
use crate::error::{AlertError, Conflict, Result};
use crate::template::RuleTemplate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use telemon_common::types::Severity;

/// Per-binding customizations, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingOverrides {
    /// Positional replacement values for the template's conditions;
    /// `None` entries keep the template value.
    #[serde(default)]
    pub condition_values: Vec<Option<f64>>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub evaluation_window_secs: Option<u64>,
}

/// The resolved association of one template to exactly one device-sensor
/// pair. At most one binding per (template, device sensor) exists; rebinding
/// updates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBinding {
    pub id: String,
    pub template_id: String,
    pub device_sensor_id: String,
    pub overrides: BindingOverrides,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A concrete rule ready for the engine: template merged with overrides.
///
/// Conditions are kept per-slot as `Result` so one malformed condition
/// surfaces its configuration error on every evaluation without taking the
/// siblings down.
#[derive(Debug, Clone)]
pub struct BoundRule {
    /// The binding's id; the engine keys its state by this.
    pub id: String,
    pub name: String,
    pub device_sensor_id: String,
    pub severity: Severity,
    pub message: String,
    pub evaluation_window_secs: u64,
    pub renotify_secs: Option<u64>,
    pub conditions: Vec<std::result::Result<Condition, ConditionError>>,
}

/// Key: (template_id, device_sensor_id)
type BindingKey = (String, String);

/// In-memory template catalog and binding registry.
///
/// The management layer persists templates and bindings; this binder holds
/// the loaded working set and enforces the uniqueness and deletion rules.
#[derive(Default)]
pub struct TemplateBinder {
    templates: HashMap<String, RuleTemplate>,
    bindings: HashMap<BindingKey, RuleBinding>,
}

impl TemplateBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&mut self, template: RuleTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn template(&self, id: &str) -> Option<&RuleTemplate> {
        self.templates.get(id)
    }

    /// Replace a user template's definition. System templates are immutable.
    pub fn update_template(&mut self, template: RuleTemplate) -> Result<()> {
        match self.templates.get(&template.id) {
            None => Err(AlertError::TemplateNotFound {
                id: template.id.clone(),
            }),
            Some(existing) if existing.is_system => Err(Conflict::SystemTemplate {
                id: template.id.clone(),
            }
            .into()),
            Some(_) => {
                self.templates.insert(template.id.clone(), template);
                Ok(())
            }
        }
    }

    /// Bind a template to a device-sensor pair.
    ///
    /// Binding the same template to the same pair again updates the existing
    /// binding (same binding id) rather than inserting a duplicate.
    pub fn bind(
        &mut self,
        template_id: &str,
        device_sensor_id: &str,
        overrides: BindingOverrides,
    ) -> Result<RuleBinding> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| AlertError::TemplateNotFound {
                id: template_id.to_string(),
            })?;

        if !glob_match::glob_match(&template.sensor_pattern, device_sensor_id) {
            return Err(AlertError::SensorMismatch {
                template_id: template_id.to_string(),
                pattern: template.sensor_pattern.clone(),
                device_sensor_id: device_sensor_id.to_string(),
            });
        }

        if overrides.condition_values.len() > template.config.conditions.len() {
            return Err(AlertError::OverrideOutOfRange {
                index: overrides.condition_values.len() - 1,
                conditions: template.config.conditions.len(),
            });
        }

        let now = Utc::now();
        let key = (template_id.to_string(), device_sensor_id.to_string());
        let binding = match self.bindings.get_mut(&key) {
            Some(existing) => {
                existing.overrides = overrides;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let binding = RuleBinding {
                    id: telemon_common::id::next_id(),
                    template_id: template_id.to_string(),
                    device_sensor_id: device_sensor_id.to_string(),
                    overrides,
                    created_at: now,
                    updated_at: now,
                };
                self.bindings.insert(key, binding.clone());
                binding
            }
        };
        Ok(binding)
    }

    pub fn binding(&self, template_id: &str, device_sensor_id: &str) -> Option<&RuleBinding> {
        self.bindings
            .get(&(template_id.to_string(), device_sensor_id.to_string()))
    }

    pub fn unbind(&mut self, template_id: &str, device_sensor_id: &str) -> Result<RuleBinding> {
        self.bindings
            .remove(&(template_id.to_string(), device_sensor_id.to_string()))
            .ok_or_else(|| AlertError::BindingNotFound {
                template_id: template_id.to_string(),
                device_sensor_id: device_sensor_id.to_string(),
            })
    }

    /// All bindings attached to one device-sensor pair.
    pub fn bindings_for(&self, device_sensor_id: &str) -> Vec<&RuleBinding> {
        let mut out: Vec<&RuleBinding> = self
            .bindings
            .values()
            .filter(|b| b.device_sensor_id == device_sensor_id)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Delete a template.
    ///
    /// System templates are always rejected, force flag or not. A user
    /// template with live bindings requires `force`, which cascades the
    /// unbind; without it the caller gets a conflict listing the bindings.
    pub fn delete_template(&mut self, id: &str, force: bool) -> Result<RuleTemplate> {
        let template = self
            .templates
            .get(id)
            .ok_or_else(|| AlertError::TemplateNotFound { id: id.to_string() })?;

        if template.is_system {
            return Err(Conflict::SystemTemplate { id: id.to_string() }.into());
        }

        let mut in_use: Vec<String> = self
            .bindings
            .values()
            .filter(|b| b.template_id == id)
            .map(|b| b.device_sensor_id.clone())
            .collect();
        in_use.sort();

        if !in_use.is_empty() && !force {
            return Err(Conflict::TemplateInUse {
                id: id.to_string(),
                bindings: in_use,
            }
            .into());
        }

        self.bindings.retain(|_, b| b.template_id != id);
        self.templates
            .remove(id)
            .ok_or_else(|| AlertError::TemplateNotFound { id: id.to_string() })
    }

    /// Merge a binding with its template into the concrete rule the engine
    /// evaluates. Malformed conditions land in the rule as per-slot errors.
    pub fn resolve(&self, binding: &RuleBinding) -> Result<BoundRule> {
        let template =
            self.templates
                .get(&binding.template_id)
                .ok_or_else(|| AlertError::TemplateNotFound {
                    id: binding.template_id.clone(),
                })?;
        let config = &template.config;

        let conditions = config
            .conditions
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let mut spec = spec.clone();
                if let Some(Some(value)) = binding.overrides.condition_values.get(i) {
                    spec.value = *value;
                }
                spec.compile()
            })
            .collect();

        Ok(BoundRule {
            id: binding.id.clone(),
            name: template.name.clone(),
            device_sensor_id: binding.device_sensor_id.clone(),
            severity: binding.overrides.severity.unwrap_or(config.severity),
            message: binding
                .overrides
                .message
                .clone()
                .unwrap_or_else(|| config.message.clone()),
            evaluation_window_secs: binding
                .overrides
                .evaluation_window_secs
                .unwrap_or(config.evaluation_window_secs),
            renotify_secs: config.renotify_secs,
            conditions,
        })
    }
}
