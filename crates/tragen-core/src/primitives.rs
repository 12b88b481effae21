//! # Primitives
//!
//! Fixed constants of the traffic engine.
//!
//! Timing defaults live in [`crate::profile::TrafficProfile`]; the values
//! here are structural and do not change between scenarios.

use std::ops::Range;
use std::time::Duration;

/// Relative margin used to derive and re-center notifier bounds.
///
/// Bounds are `value ± BOUND_MARGIN * |value|`.
pub const BOUND_MARGIN: f64 = 0.2;

/// Range of the multiplicative factor a writer applies to a value.
pub const WRITER_FACTOR: Range<f64> = 0.1..10.0;

/// Namespace index of the companion event objects and event types.
pub const NOTIFICATION_NAMESPACE: u16 = 2;

/// Suffix of the companion event object created per monitored variable.
pub const NOTIF_OBJECT_SUFFIX: &str = "_NotifObject";

/// Suffix of the companion event type created per monitored variable.
pub const NOTIF_EVENT_SUFFIX: &str = "_NotifEvent";

/// Namespace index of the standard address-space skeleton.
pub const STANDARD_NAMESPACE: u16 = 0;

/// Browse path from the root node to the base event type.
pub const BASE_EVENT_TYPE_PATH: [&str; 3] = ["Types", "EventTypes", "BaseEventType"];

/// Fixed notifier period.
pub const NOTIFIER_PERIOD: Duration = Duration::from_secs(3);

/// Default subscription publishing interval.
pub const PUBLISHING_INTERVAL: Duration = Duration::from_millis(1000);

/// Name of the companion event object for a variable.
#[must_use]
pub fn notif_object_name(variable: &str) -> String {
    format!("{variable}{NOTIF_OBJECT_SUFFIX}")
}

/// Name of the companion event type for a variable.
#[must_use]
pub fn notif_event_name(variable: &str) -> String {
    format!("{variable}{NOTIF_EVENT_SUFFIX}")
}

/// Bounds centered on `value` with the standard margin.
///
/// Uses the magnitude of `value` so the lower bound never exceeds the
/// upper bound for negative values.
#[must_use]
pub fn centered_bounds(value: f64) -> (f64, f64) {
    let margin = BOUND_MARGIN * value.abs();
    (value - margin, value + margin)
}
