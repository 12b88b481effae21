//! Server-side value updater.

use super::sampling::{jittered_period, normal};
use super::{Actor, ActorKind};
use crate::endpoint::UaEndpoint;
use crate::namespace::UpdateMode;
use crate::{NodeHandle, TragenError, Value};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

/// Random walk on one variable.
///
/// Each step reads the value, draws the next one from
/// N(current, `val_stddev`) and writes it back as a double, whatever the
/// numeric type it read. Regular updaters sleep a
/// fixed period; irregular ones resample the period each time from
/// N(period, `pd_stddev_ms`), clamped at zero.
pub struct Updater {
    label: String,
    endpoint: Arc<dyn UaEndpoint>,
    node: NodeHandle,
    mode: UpdateMode,
    period: Duration,
    val_stddev: f64,
    pd_stddev_ms: f64,
    rng: StdRng,
}

impl Updater {
    pub fn new(
        label: impl Into<String>,
        endpoint: Arc<dyn UaEndpoint>,
        node: NodeHandle,
        mode: UpdateMode,
        period: Duration,
        val_stddev: f64,
        pd_stddev_ms: f64,
        rng: StdRng,
    ) -> Self {
        Self {
            label: label.into(),
            endpoint,
            node,
            mode,
            period,
            val_stddev,
            pd_stddev_ms,
            rng,
        }
    }

    /// Perform one update and return the value written.
    pub fn update(&mut self) -> Result<Value, TragenError> {
        let current = self.endpoint.read_value(self.node)?;
        let x = current.as_f64().ok_or_else(|| TragenError::NonNumericValue {
            node: self.label.clone(),
            found: current.type_name(),
        })?;
        let next = Value::Double(normal(&mut self.rng, x, self.val_stddev));
        self.endpoint.write_value(self.node, next.clone())?;
        Ok(next)
    }
}

impl Actor for Updater {
    fn kind(&self) -> ActorKind {
        ActorKind::Updater
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn step(&mut self) -> Result<(), TragenError> {
        self.update().map(|_| ())
    }

    fn next_interval(&mut self) -> Duration {
        match self.mode {
            UpdateMode::Irregular => jittered_period(&mut self.rng, self.period, self.pd_stddev_ms),
            UpdateMode::Regular | UpdateMode::Static => self.period,
        }
    }
}
