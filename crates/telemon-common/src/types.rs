use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One telemetry sample from a (device, sensor) pair.
///
/// Series are supplied ordered by timestamp ascending. Non-finite values
/// may appear in raw series; statistics filter them before computing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use telemon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Kind of physical sensor a series comes from.
///
/// Carries the physically possible measurement range for the common sensor
/// hardware in the fleet, used to clamp recommended threshold bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// DHT22-class temperature sensor, °C
    Temperature,
    /// Relative humidity, %
    Humidity,
    /// Photoresistor through a 10-bit ADC
    Light,
    /// PIR motion sensor (binary)
    Motion,
    /// HC-SR04 ultrasonic distance, cm
    Distance,
    /// Barometric pressure, hPa
    Pressure,
    Generic,
}

impl SensorKind {
    /// The physically possible `(min, max)` for this sensor kind, or `None`
    /// when no hardware bound applies.
    pub fn physical_bounds(&self) -> Option<(f64, f64)> {
        match self {
            SensorKind::Temperature => Some((-40.0, 80.0)),
            SensorKind::Humidity => Some((0.0, 100.0)),
            SensorKind::Light => Some((0.0, 1023.0)),
            SensorKind::Motion => Some((0.0, 1.0)),
            SensorKind::Distance => Some((2.0, 400.0)),
            SensorKind::Pressure => Some((300.0, 1100.0)),
            SensorKind::Generic => None,
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Light => "light",
            SensorKind::Motion => "motion",
            SensorKind::Distance => "distance",
            SensorKind::Pressure => "pressure",
            SensorKind::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            "light" => Ok(SensorKind::Light),
            "motion" => Ok(SensorKind::Motion),
            "distance" => Ok(SensorKind::Distance),
            "pressure" => Ok(SensorKind::Pressure),
            "generic" => Ok(SensorKind::Generic),
            _ => Err(format!("unknown sensor kind: {s}")),
        }
    }
}

/// The rule engine's verdict for one evaluation cycle.
///
/// `fired = true` announces a new (or re-notified) alert; `fired = false`
/// announces that a previously firing rule has cleared. Decisions are
/// consumed by the external alert-persistence layer; the engine keeps none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDecision {
    pub rule_id: String,
    pub device_sensor_id: String,
    pub fired: bool,
    pub severity: Severity,
    pub message: String,
    /// Value of the reading that produced this decision.
    pub value: f64,
    /// When the current violation streak began; `None` on clear decisions.
    pub first_violation_at: Option<DateTime<Utc>>,
    pub last_evaluated_at: DateTime<Utc>,
}
