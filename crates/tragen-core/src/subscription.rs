//! # Subscription Binding
//!
//! Attaches client-side subscriptions to dynamically updated variables.
//!
//! - irregularly updated variables get a data-change subscription on the
//!   variable itself
//! - regularly updated variables get an event subscription on their
//!   companion `<variable>_NotifObject` / `<variable>_NotifEvent` pair
//!
//! Every subscription is recorded in a [`SubscriptionTable`] keyed by the
//! client node handle. A node carries at most one entry: binding it again
//! tears the previous entry down first. An entry leaves the table only once
//! its teardown succeeded, so a failed teardown can be retried later.

use crate::endpoint::{EndpointError, NotificationHandler, UaEndpoint};
use crate::namespace::{DescriptorRef, NamespaceGraph, UpdateMode};
use crate::notifications::base_event_type;
use crate::primitives::{NOTIFICATION_NAMESPACE, notif_event_name, notif_object_name};
use crate::realize::RealizedTree;
use crate::{MonitorHandle, NodeHandle, NodeKey, SubscriptionId, TragenError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// SUBSCRIPTION TABLE
// =============================================================================

/// What a subscription entry listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    DataChange,
    Event,
}

/// One active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub key: NodeKey,
    /// Client handle of the subscribed variable.
    pub node: NodeHandle,
    pub subscription: SubscriptionId,
    /// Monitored item inside the subscription.
    pub monitor: MonitorHandle,
    pub kind: SubscriptionKind,
}

/// Active subscriptions of one client, at most one per node.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTable {
    entries: BTreeMap<NodeHandle, SubscriptionEntry>,
}

impl SubscriptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeHandle) -> Option<&SubscriptionEntry> {
        self.entries.get(&node)
    }

    pub fn entries(&self) -> impl Iterator<Item = &SubscriptionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries of one kind.
    pub fn count(&self, kind: SubscriptionKind) -> usize {
        self.entries.values().filter(|e| e.kind == kind).count()
    }
}

// =============================================================================
// BINDER
// =============================================================================

/// Creates and tears down subscriptions on one client endpoint.
pub struct SubscriptionBinder<'e> {
    endpoint: &'e dyn UaEndpoint,
    handler: Arc<dyn NotificationHandler>,
    publishing_interval: Duration,
}

impl<'e> SubscriptionBinder<'e> {
    pub fn new(
        endpoint: &'e dyn UaEndpoint,
        handler: Arc<dyn NotificationHandler>,
        publishing_interval: Duration,
    ) -> Self {
        Self {
            endpoint,
            handler,
            publishing_interval,
        }
    }

    /// Subscribe every dynamically updated variable of `tree`.
    ///
    /// Stops at the first failure. Entries bound before it stay in `table`;
    /// release them with [`Self::unbind_all`].
    pub fn bind(
        &self,
        tree: &RealizedTree,
        graph: &NamespaceGraph,
        table: &mut SubscriptionTable,
    ) -> Result<usize, TragenError> {
        let mut bound = 0;
        for (entry, handle) in tree.lockstep(graph)? {
            let DescriptorRef::Variable(var) = entry.node else {
                continue;
            };
            match var.flags.update {
                UpdateMode::Static => continue,
                UpdateMode::Irregular => {
                    self.bind_node(table, entry.key, handle, SubscriptionKind::DataChange)?;
                }
                UpdateMode::Regular => {
                    self.bind_node(table, entry.key, handle, SubscriptionKind::Event)?;
                }
            }
            bound += 1;
        }
        tracing::info!(
            client = %self.endpoint.label(),
            data_change = table.count(SubscriptionKind::DataChange),
            events = table.count(SubscriptionKind::Event),
            "subscriptions bound"
        );
        Ok(bound)
    }

    /// Subscribe one node, replacing any entry it already has.
    ///
    /// If the previous entry cannot be torn down it stays in the table and
    /// no new subscription is created.
    pub fn bind_node(
        &self,
        table: &mut SubscriptionTable,
        key: NodeKey,
        node: NodeHandle,
        kind: SubscriptionKind,
    ) -> Result<(), TragenError> {
        if let Some(previous) = table.entries.get(&node) {
            tracing::debug!(key = %previous.key, "replacing subscription");
            self.teardown(previous)?;
            table.entries.remove(&node);
        }

        let ep = self.endpoint;
        let subscription = ep
            .create_subscription(self.publishing_interval, Arc::clone(&self.handler))
            .map_err(|e| subscription_error(&key, e))?;
        let monitor = match kind {
            SubscriptionKind::DataChange => ep.subscribe_data_change(subscription, node),
            SubscriptionKind::Event => self
                .companion(&key.name)
                .and_then(|(event_type, source)| {
                    ep.subscribe_events(subscription, event_type, source)
                }),
        };
        let monitor = match monitor {
            Ok(monitor) => monitor,
            Err(e) => {
                if let Err(cleanup) = ep.delete_subscription(subscription) {
                    tracing::warn!(
                        client = %ep.label(),
                        %key,
                        error = %cleanup,
                        "empty subscription left open"
                    );
                }
                return Err(subscription_error(&key, e));
            }
        };

        tracing::debug!(client = %ep.label(), %key, ?kind, "subscribed");
        table.entries.insert(
            node,
            SubscriptionEntry {
                key,
                node,
                subscription,
                monitor,
                kind,
            },
        );
        Ok(())
    }

    /// Unsubscribe and delete every entry.
    ///
    /// Every entry is attempted. Entries whose teardown failed stay in the
    /// table and the first failure is returned.
    pub fn unbind_all(&self, table: &mut SubscriptionTable) -> Result<(), TragenError> {
        let mut first_error = None;
        let count = table.len();
        table.entries.retain(|_, entry| match self.teardown(entry) {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(client = %self.endpoint.label(), error = %e, "unsubscribe failed");
                first_error.get_or_insert(e);
                true
            }
        });
        tracing::debug!(
            client = %self.endpoint.label(),
            released = count - table.len(),
            kept = table.len(),
            "subscriptions released"
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Remove the monitored item, then its subscription. Either step may
    /// already have happened on an earlier attempt.
    fn teardown(&self, entry: &SubscriptionEntry) -> Result<(), TragenError> {
        let ep = self.endpoint;
        match ep.unsubscribe(entry.subscription, entry.monitor) {
            Ok(())
            | Err(EndpointError::UnknownMonitor(_) | EndpointError::UnknownSubscription(_)) => {}
            Err(e) => return Err(subscription_error(&entry.key, e)),
        }
        match ep.delete_subscription(entry.subscription) {
            Ok(()) | Err(EndpointError::UnknownSubscription(_)) => Ok(()),
            Err(e) => Err(subscription_error(&entry.key, e)),
        }
    }

    /// Client handles of the companion event type and event object.
    fn companion(&self, variable: &str) -> Result<(NodeHandle, NodeHandle), EndpointError> {
        let ep = self.endpoint;
        let objects = ep.objects_node()?;
        let source = ep.get_child(objects, NOTIFICATION_NAMESPACE, &notif_object_name(variable))?;
        let base = base_event_type(ep)?;
        let event_type = ep.get_child(base, NOTIFICATION_NAMESPACE, &notif_event_name(variable))?;
        Ok((event_type, source))
    }
}

fn subscription_error(key: &NodeKey, err: EndpointError) -> TragenError {
    TragenError::Subscription {
        node: key.to_string(),
        reason: err.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
