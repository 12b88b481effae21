//! # Threshold Notification Sources
//!
//! Server-side companions of monitored variables.
//!
//! For every monitored variable the server gets, in the notification
//! namespace:
//! - an event object `<variable>_NotifObject` under `Objects`
//! - a custom event type `<variable>_NotifEvent` derived from `BaseEventType`
//! - an event generator binding the two
//!
//! Notifiers trigger the generator; clients subscribe to the pair by name.
//! Companion names are built from the bare variable name, so two monitored
//! variables sharing a name in different branches collide and the second
//! fails to register.

use crate::endpoint::{EndpointError, UaEndpoint};
use crate::namespace::NamespaceGraph;
use crate::primitives::{
    BASE_EVENT_TYPE_PATH, NOTIFICATION_NAMESPACE, STANDARD_NAMESPACE, notif_event_name,
    notif_object_name,
};
use crate::realize::RealizedTree;
use crate::{GeneratorHandle, NodeHandle, NodeKey, TragenError};
use std::collections::BTreeMap;

/// Event plumbing for one monitored variable, as handles on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSource {
    /// The monitored variable itself.
    pub variable: NodeHandle,
    pub object: NodeHandle,
    pub event_type: NodeHandle,
    pub generator: GeneratorHandle,
}

/// Companion event sources keyed by the monitored variable.
#[derive(Debug, Clone, Default)]
pub struct NotificationRegistry {
    sources: BTreeMap<NodeKey, EventSource>,
}

impl NotificationRegistry {
    /// Create the companions of every monitored variable on the server.
    pub fn setup(
        graph: &NamespaceGraph,
        tree: &RealizedTree,
        server: &dyn UaEndpoint,
    ) -> Result<Self, TragenError> {
        let mut registry = Self::default();
        let monitored: Vec<_> = graph.variables().filter(|(_, v)| v.is_monitored()).collect();
        if monitored.is_empty() {
            return Ok(registry);
        }

        let objects = server
            .objects_node()
            .map_err(|e| notification_error("Objects", e))?;
        let base = base_event_type(server).map_err(|e| notification_error("BaseEventType", e))?;

        for (key, var) in monitored {
            let variable = tree.handle_of(&key).ok_or_else(|| TragenError::Realization {
                node: key.to_string(),
                reason: format!("not realized on {}", tree.endpoint()),
            })?;
            let object = server
                .add_object(objects, NOTIFICATION_NAMESPACE, &notif_object_name(&var.name))
                .map_err(|e| notification_error(&key, e))?;
            let event_type = server
                .create_custom_event_type(
                    NOTIFICATION_NAMESPACE,
                    &notif_event_name(&var.name),
                    base,
                )
                .map_err(|e| notification_error(&key, e))?;
            let generator = server
                .get_event_generator(event_type, object)
                .map_err(|e| notification_error(&key, e))?;
            tracing::debug!(%key, "notification source created");
            registry.sources.insert(
                key,
                EventSource {
                    variable,
                    object,
                    event_type,
                    generator,
                },
            );
        }
        tracing::info!(sources = registry.len(), "notification sources ready");
        Ok(registry)
    }

    pub fn get(&self, key: &NodeKey) -> Option<&EventSource> {
        self.sources.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &EventSource)> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Walk `Root -> Types -> EventTypes -> BaseEventType` on any endpoint.
pub fn base_event_type(endpoint: &dyn UaEndpoint) -> Result<NodeHandle, EndpointError> {
    let mut node = endpoint.root_node()?;
    for name in BASE_EVENT_TYPE_PATH {
        node = endpoint.get_child(node, STANDARD_NAMESPACE, name)?;
    }
    Ok(node)
}

fn notification_error(node: impl ToString, err: EndpointError) -> TragenError {
    TragenError::Realization {
        node: node.to_string(),
        reason: format!("notification setup: {err}"),
    }
}
