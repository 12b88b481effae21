//! Client-side random reader.

use super::{Actor, ActorKind};
use crate::endpoint::UaEndpoint;
use crate::{NodeHandle, NodeKey, TragenError, Value};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

/// Reads one uniformly chosen item per step.
pub struct Reader {
    label: String,
    endpoint: Arc<dyn UaEndpoint>,
    items: Vec<(NodeKey, NodeHandle)>,
    hits: Vec<u64>,
    period: Duration,
    rng: StdRng,
}

impl Reader {
    /// Create a reader. Fails on an empty item list.
    pub fn new(
        endpoint: Arc<dyn UaEndpoint>,
        items: Vec<(NodeKey, NodeHandle)>,
        period: Duration,
        rng: StdRng,
    ) -> Result<Self, TragenError> {
        if items.is_empty() {
            return Err(TragenError::InvalidState(format!(
                "reader for {} has nothing to read",
                endpoint.label()
            )));
        }
        Ok(Self {
            label: format!("{}/reader", endpoint.label()),
            hits: vec![0; items.len()],
            endpoint,
            items,
            period,
            rng,
        })
    }

    /// Read one random item; returns its position in the item list and
    /// the value read.
    pub fn read_one(&mut self) -> Result<(usize, Value), TragenError> {
        let index = self.rng.random_range(0..self.items.len());
        self.hits[index] += 1;
        let value = self.endpoint.read_value(self.items[index].1)?;
        Ok((index, value))
    }

    /// How often each item was picked, in item order.
    pub fn hits(&self) -> &[u64] {
        &self.hits
    }
}

impl Actor for Reader {
    fn kind(&self) -> ActorKind {
        ActorKind::Reader
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn step(&mut self) -> Result<(), TragenError> {
        let (index, value) = self.read_one()?;
        tracing::trace!(reader = %self.label, key = %self.items[index].0, %value, "read");
        Ok(())
    }

    fn next_interval(&mut self) -> Duration {
        self.period
    }
}
