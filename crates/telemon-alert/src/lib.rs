//! Alert-rule evaluation for sensor telemetry.
//!
//! Rule templates are bound to (device, sensor) pairs by the
//! [`binder::TemplateBinder`], producing concrete rules the
//! [`engine::AlertEngine`] evaluates against live readings. The engine keeps
//! one dwell state machine per (device sensor, rule) key: a rule only fires
//! after all of its conditions have matched continuously for the configured
//! evaluation window, and it emits exactly one clear decision when the
//! condition stops matching. This debounce discipline keeps a single noisy
//! sample from turning into an alert storm.

pub mod binder;
pub mod condition;
pub mod engine;
pub mod error;
pub mod template;
pub mod window;


pub use error::{AlertError, Conflict, Result};
