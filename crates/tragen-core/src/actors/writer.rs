//! Client-side random writer.

use super::{Actor, ActorKind};
use crate::endpoint::UaEndpoint;
use crate::primitives::WRITER_FACTOR;
use crate::{NodeHandle, NodeKey, TragenError, Value};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

/// Scales one uniformly chosen writable variable per step by a random
/// factor in `[0.1, 10)`.
pub struct Writer {
    label: String,
    endpoint: Arc<dyn UaEndpoint>,
    items: Vec<(NodeKey, NodeHandle)>,
    period: Duration,
    rng: StdRng,
}

impl Writer {
    /// Create a writer. Fails on an empty item list.
    pub fn new(
        endpoint: Arc<dyn UaEndpoint>,
        items: Vec<(NodeKey, NodeHandle)>,
        period: Duration,
        rng: StdRng,
    ) -> Result<Self, TragenError> {
        if items.is_empty() {
            return Err(TragenError::InvalidState(format!(
                "writer for {} has nothing to write",
                endpoint.label()
            )));
        }
        Ok(Self {
            label: format!("{}/writer", endpoint.label()),
            endpoint,
            items,
            period,
            rng,
        })
    }

    /// Rescale one random item; returns the value written.
    pub fn write_one(&mut self) -> Result<Value, TragenError> {
        let index = self.rng.random_range(0..self.items.len());
        let factor = self.rng.random_range(WRITER_FACTOR);
        let (key, node) = &self.items[index];
        let current = self.endpoint.read_value(*node)?;
        let next = current
            .as_f64()
            .and_then(|x| current.with_magnitude(x * factor))
            .ok_or_else(|| TragenError::NonNumericValue {
                node: key.to_string(),
                found: current.type_name(),
            })?;
        self.endpoint.write_value(*node, next.clone())?;
        tracing::trace!(writer = %self.label, %key, %next, "write");
        Ok(next)
    }
}

impl Actor for Writer {
    fn kind(&self) -> ActorKind {
        ActorKind::Writer
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn step(&mut self) -> Result<(), TragenError> {
        self.write_one().map(|_| ())
    }

    fn next_interval(&mut self) -> Duration {
        self.period
    }
}
