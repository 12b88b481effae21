//! # Traffic Profile
//!
//! Timing and statistical parameters of every actor kind.
//!
//! Durations are stored in milliseconds so profiles read naturally from
//! scenario files. Missing fields take their defaults.

use crate::TragenError;
use crate::primitives::{NOTIFIER_PERIOD, PUBLISHING_INTERVAL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing parameters shared by all actors of one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficProfile {
    /// Fixed period of regular updaters.
    pub update_period_ms: u64,
    /// Mean period of irregular updaters.
    pub irregular_period_ms: u64,
    /// Standard deviation of each updater step, in value units.
    pub val_stddev: f64,
    /// Standard deviation of irregular update periods.
    pub pd_stddev_ms: f64,
    pub notifier_period_ms: u64,
    pub reader_period_ms: u64,
    pub writer_period_ms: u64,
    /// Publishing interval requested for client subscriptions.
    pub publishing_interval_ms: u64,
    /// Seed for reproducible runs. Each actor derives its own stream from it.
    pub seed: Option<u64>,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            update_period_ms: 100,
            irregular_period_ms: 3000,
            val_stddev: 0.15,
            pd_stddev_ms: 600.0,
            notifier_period_ms: NOTIFIER_PERIOD.as_millis() as u64,
            reader_period_ms: 500,
            writer_period_ms: 1000,
            publishing_interval_ms: PUBLISHING_INTERVAL.as_millis() as u64,
            seed: None,
        }
    }
}

impl TrafficProfile {
    /// Reject values no actor can run with.
    pub fn validate(&self) -> Result<(), TragenError> {
        if !self.val_stddev.is_finite() || self.val_stddev < 0.0 {
            return Err(TragenError::Config(format!(
                "val_stddev must be a non-negative number, got {}",
                self.val_stddev
            )));
        }
        if !self.pd_stddev_ms.is_finite() || self.pd_stddev_ms < 0.0 {
            return Err(TragenError::Config(format!(
                "pd_stddev_ms must be a non-negative number, got {}",
                self.pd_stddev_ms
            )));
        }
        if self.publishing_interval_ms == 0 {
            return Err(TragenError::Config(
                "publishing_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms)
    }

    pub fn irregular_period(&self) -> Duration {
        Duration::from_millis(self.irregular_period_ms)
    }

    pub fn notifier_period(&self) -> Duration {
        Duration::from_millis(self.notifier_period_ms)
    }

    pub fn reader_period(&self) -> Duration {
        Duration::from_millis(self.reader_period_ms)
    }

    pub fn writer_period(&self) -> Duration {
        Duration::from_millis(self.writer_period_ms)
    }

    pub fn publishing_interval(&self) -> Duration {
        Duration::from_millis(self.publishing_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let profile = TrafficProfile::default();
        assert_eq!(profile.notifier_period(), NOTIFIER_PERIOD);
        assert_eq!(profile.publishing_interval(), PUBLISHING_INTERVAL);
        profile.validate().expect("defaults are valid");
    }

    #[test]
    fn negative_deviation_rejected() {
        let profile = TrafficProfile {
            val_stddev: -1.0,
            ..TrafficProfile::default()
        };
        assert!(matches!(profile.validate(), Err(TragenError::Config(_))));
    }
}
