//! Server-side threshold notifier.

use super::{Actor, ActorKind};
use crate::endpoint::UaEndpoint;
use crate::primitives::centered_bounds;
use crate::{GeneratorHandle, NodeHandle, TragenError};
use std::sync::Arc;
use std::time::Duration;

/// Direction of a bound violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    Above,
    Below,
}

/// Watches one variable against a band and fires an event when the value
/// leaves it. After a breach the band is re-centered on the new value.
pub struct Notifier {
    variable: String,
    endpoint: Arc<dyn UaEndpoint>,
    node: NodeHandle,
    generator: GeneratorHandle,
    lower: f64,
    upper: f64,
    period: Duration,
}

impl Notifier {
    /// Create a notifier. A missing bound is derived from the current value
    /// (`value ± 20%`); a given bound is kept as is.
    pub fn new(
        variable: impl Into<String>,
        endpoint: Arc<dyn UaEndpoint>,
        node: NodeHandle,
        generator: GeneratorHandle,
        lower: Option<f64>,
        upper: Option<f64>,
        period: Duration,
    ) -> Result<Self, TragenError> {
        let variable = variable.into();
        let (lower, upper) = match (lower, upper) {
            (Some(lower), Some(upper)) => (lower, upper),
            _ => {
                let current = endpoint.read_value(node)?;
                let x = current.as_f64().ok_or_else(|| TragenError::NonNumericValue {
                    node: variable.clone(),
                    found: current.type_name(),
                })?;
                let (auto_lower, auto_upper) = centered_bounds(x);
                (lower.unwrap_or(auto_lower), upper.unwrap_or(auto_upper))
            }
        };
        Ok(Self {
            variable,
            endpoint,
            node,
            generator,
            lower,
            upper,
            period,
        })
    }

    /// Current band as `(lower, upper)`.
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Read the value once and fire an event if it left the band.
    pub fn check(&mut self) -> Result<Option<Breach>, TragenError> {
        let current = self.endpoint.read_value(self.node)?;
        let x = current.as_f64().ok_or_else(|| TragenError::NonNumericValue {
            node: self.variable.clone(),
            found: current.type_name(),
        })?;
        let breach = if x > self.upper {
            Breach::Above
        } else if x < self.lower {
            Breach::Below
        } else {
            return Ok(None);
        };
        (self.lower, self.upper) = centered_bounds(x);
        let direction = match breach {
            Breach::Above => "Above",
            Breach::Below => "Below",
        };
        let message = format!("[#] Warning {}! {direction} critical value.", self.variable);
        self.endpoint.trigger_event(self.generator, &message)?;
        tracing::debug!(variable = %self.variable, value = x, ?breach, "threshold crossed");
        Ok(Some(breach))
    }
}

impl Actor for Notifier {
    fn kind(&self) -> ActorKind {
        ActorKind::Notifier
    }

    fn label(&self) -> &str {
        &self.variable
    }

    fn step(&mut self) -> Result<(), TragenError> {
        self.check().map(|_| ())
    }

    fn next_interval(&mut self) -> Duration {
        self.period
    }
}
