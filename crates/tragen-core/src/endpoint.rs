//! # UA Endpoint Capability
//!
//! The narrow interface through which the core reaches an address space.
//!
//! The core never speaks a wire protocol. Everything it needs from a server
//! or a client session (node creation, child lookup, value access,
//! subscriptions and events) goes through [`UaEndpoint`]. Implementations
//! decide which calls they support: a client session typically rejects
//! node creation, a server typically rejects subscriptions.
//!
//! Notifications flow the other way through [`NotificationHandler`].
//! Implementations must deliver them asynchronously relative to the caller
//! of `write_value` / `trigger_event`.

use crate::{GeneratorHandle, MonitorHandle, NodeHandle, SubscriptionId, Value};
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// ENDPOINT ERRORS
// =============================================================================

/// Errors reported by an endpoint implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The endpoint is not connected (client) or not listening (server).
    #[error("endpoint is not connected")]
    NotConnected,

    /// The handle was not issued by this endpoint.
    #[error("unknown node handle {0}")]
    UnknownNode(NodeHandle),

    /// No child with the given namespace and browse name.
    #[error("no child {namespace}:{name} under {parent}")]
    NoSuchChild {
        parent: NodeHandle,
        namespace: u16,
        name: String,
    },

    /// A sibling with the same namespace and browse name already exists.
    #[error("{namespace}:{name} already exists under {parent}")]
    AlreadyExists {
        parent: NodeHandle,
        namespace: u16,
        name: String,
    },

    /// The node does not accept writes from this endpoint.
    #[error("node {0} is not writable")]
    NotWritable(NodeHandle),

    /// The node holds no value (folder, object or event type).
    #[error("node {0} has no value")]
    NoValue(NodeHandle),

    /// The subscription id was not issued by this endpoint.
    #[error("unknown subscription {0:?}")]
    UnknownSubscription(SubscriptionId),

    /// The monitored item handle is not part of the subscription.
    #[error("unknown monitored item {0:?}")]
    UnknownMonitor(MonitorHandle),

    /// The generator handle was not issued by this endpoint.
    #[error("unknown event generator {0:?}")]
    UnknownGenerator(GeneratorHandle),

    /// The endpoint does not offer this capability.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// The endpoint could not acquire an OS resource.
    #[error("endpoint I/O failure: {0}")]
    Io(String),
}

// =============================================================================
// ENDPOINT TRAIT
// =============================================================================

/// The UA endpoint capability.
///
/// Handles returned by one endpoint are only valid on that endpoint.
/// All methods take `&self`; implementations are shared between actor
/// threads behind an `Arc` and must synchronize internally.
pub trait UaEndpoint: Send + Sync {
    /// Human-readable label used in logs.
    fn label(&self) -> &str;

    /// Server: start listening. Client: open a session.
    fn connect(&self) -> Result<(), EndpointError>;

    /// Server: stop listening. Client: close the session.
    fn disconnect(&self) -> Result<(), EndpointError>;

    /// Whether `connect` succeeded and `disconnect` has not been called since.
    fn is_connected(&self) -> bool;

    /// The address-space root node.
    fn root_node(&self) -> Result<NodeHandle, EndpointError>;

    /// The standard `Objects` node, parent of all top-level declarations.
    fn objects_node(&self) -> Result<NodeHandle, EndpointError>;

    /// Create a folder under `parent`.
    fn add_folder(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError>;

    /// Create an object under `parent`.
    fn add_object(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError>;

    /// Create a variable under `parent` with an initial value.
    fn add_variable(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
        initial: Value,
    ) -> Result<NodeHandle, EndpointError>;

    /// Create a property under `parent` with an initial value.
    fn add_property(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
        initial: Value,
    ) -> Result<NodeHandle, EndpointError>;

    /// Look up the child of `parent` with the given namespace and browse name.
    fn get_child(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError>;

    /// Read the current value of a variable or property.
    fn read_value(&self, node: NodeHandle) -> Result<Value, EndpointError>;

    /// Write a new value to a variable or property.
    fn write_value(&self, node: NodeHandle, value: Value) -> Result<(), EndpointError>;

    /// Allow clients to write the node.
    fn mark_writable(&self, node: NodeHandle) -> Result<(), EndpointError>;

    /// Open a subscription whose notifications go to `handler`.
    fn create_subscription(
        &self,
        publishing_interval: Duration,
        handler: std::sync::Arc<dyn NotificationHandler>,
    ) -> Result<SubscriptionId, EndpointError>;

    /// Monitor value changes of `node` within `subscription`.
    fn subscribe_data_change(
        &self,
        subscription: SubscriptionId,
        node: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError>;

    /// Monitor events of `event_type` emitted by `source` within `subscription`.
    fn subscribe_events(
        &self,
        subscription: SubscriptionId,
        event_type: NodeHandle,
        source: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError>;

    /// Remove one monitored item.
    fn unsubscribe(
        &self,
        subscription: SubscriptionId,
        monitor: MonitorHandle,
    ) -> Result<(), EndpointError>;

    /// Delete a subscription and any items left in it.
    fn delete_subscription(&self, subscription: SubscriptionId) -> Result<(), EndpointError>;

    /// Declare a custom event type derived from `base`.
    fn create_custom_event_type(
        &self,
        namespace: u16,
        name: &str,
        base: NodeHandle,
    ) -> Result<NodeHandle, EndpointError>;

    /// Bind an event type to a source object.
    fn get_event_generator(
        &self,
        event_type: NodeHandle,
        source: NodeHandle,
    ) -> Result<GeneratorHandle, EndpointError>;

    /// Emit one event from a generator.
    fn trigger_event(&self, generator: GeneratorHandle, message: &str)
    -> Result<(), EndpointError>;
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// A notification received by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A monitored value changed.
    DataChange { node: NodeHandle, value: Value },
    /// A subscribed event fired.
    Event { source: NodeHandle, message: String },
}

/// Receiver of subscription notifications.
///
/// Called from the endpoint's delivery thread, never from an actor loop.
pub trait NotificationHandler: Send + Sync {
    fn data_change(&self, node: NodeHandle, value: &Value);

    fn event(&self, source: NodeHandle, message: &str);
}

/// Handler that logs every notification.
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    label: String,
}

impl LoggingHandler {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl NotificationHandler for LoggingHandler {
    fn data_change(&self, node: NodeHandle, value: &Value) {
        tracing::debug!(client = %self.label, %node, %value, "data change");
    }

    fn event(&self, source: NodeHandle, message: &str) {
        tracing::info!(client = %self.label, %source, "{}", message);
    }
}

/// Handler that keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    received: Mutex<Vec<Notification>>,
}

impl RecordingHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }

    /// Number of event notifications received so far.
    pub fn event_count(&self) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|n| matches!(n, Notification::Event { .. }))
            .count()
    }
}

impl NotificationHandler for RecordingHandler {
    fn data_change(&self, node: NodeHandle, value: &Value) {
        self.received.lock().push(Notification::DataChange {
            node,
            value: value.clone(),
        });
    }

    fn event(&self, source: NodeHandle, message: &str) {
        self.received.lock().push(Notification::Event {
            source,
            message: message.to_string(),
        });
    }
}
