use chrono::{DateTime, Utc};

/// Conflict outcomes that the caller should surface as a confirmation
/// prompt, distinguishable from plain failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Conflict {
    /// System templates can never be deleted or edited, force flag or not.
    #[error("system template '{id}' cannot be deleted")]
    SystemTemplate { id: String },

    /// A user template still has live bindings; deleting it without `force`
    /// would silently drop rules in use.
    #[error("template '{id}' is bound to {n} device sensor(s); pass force to delete", n = .bindings.len())]
    TemplateInUse { id: String, bindings: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error("template not found (id={id})")]
    TemplateNotFound { id: String },

    #[error("no binding of template '{template_id}' to '{device_sensor_id}'")]
    BindingNotFound {
        template_id: String,
        device_sensor_id: String,
    },

    #[error("template '{template_id}' (pattern '{pattern}') does not apply to sensor '{device_sensor_id}'")]
    SensorMismatch {
        template_id: String,
        pattern: String,
        device_sensor_id: String,
    },

    #[error("override index {index} out of range: template has {conditions} condition(s)")]
    OverrideOutOfRange { index: usize, conditions: usize },

    /// Evaluating a reading older than the key's last evaluated timestamp
    /// could reset a dwell timer or double-fire, so it is rejected.
    #[error("reading at {timestamp} for rule '{rule_id}' is older than last evaluated {last_evaluated_at}")]
    OutOfOrder {
        rule_id: String,
        timestamp: DateTime<Utc>,
        last_evaluated_at: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, AlertError>;
