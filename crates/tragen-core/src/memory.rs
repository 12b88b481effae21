//! # In-Memory Endpoints
//!
//! A process-local address space standing in for a real UA stack.
//!
//! - [`MemoryServer`] owns the address space. It creates nodes, writes any
//!   value, declares event types and triggers events. Its handles are the
//!   native node ids.
//! - [`MemoryClient`] is a session on a server. It resolves nodes with
//!   `get_child`, reads, writes writable nodes and subscribes. It issues its
//!   own handles, numbered independently from the server's, so a server
//!   handle is meaningless to a client and vice versa.
//!
//! Notifications are pushed into a per-session channel while the address
//! space lock is held and handed to the subscription handler by a
//! dedicated delivery thread. Writers and triggers never wait on a handler.

use crate::endpoint::{EndpointError, Notification, NotificationHandler, UaEndpoint};
use crate::primitives::{BASE_EVENT_TYPE_PATH, STANDARD_NAMESPACE};
use crate::{GeneratorHandle, MonitorHandle, NodeHandle, SubscriptionId, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

// =============================================================================
// ADDRESS SPACE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeClass {
    Folder,
    Object,
    Variable,
    Property,
    EventType,
}

#[derive(Debug, Clone)]
struct NativeNode {
    namespace: u16,
    name: String,
    class: NodeClass,
    value: Option<Value>,
    writable: bool,
    children: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchTarget {
    DataChange { node: u64 },
    Events { event_type: u64, source: u64 },
}

/// One monitored item registered by a client session.
#[derive(Debug)]
struct Watch {
    session: u64,
    subscription: SubscriptionId,
    monitor: MonitorHandle,
    target: WatchTarget,
    /// The session's own handle for the watched node or event source.
    client_node: NodeHandle,
    sender: Sender<Delivery>,
}

#[derive(Debug, Clone, Copy)]
struct Generator {
    event_type: u64,
    source: u64,
}

#[derive(Debug)]
struct Delivery {
    subscription: SubscriptionId,
    notification: Notification,
}

#[derive(Debug)]
struct AddressSpace {
    nodes: BTreeMap<u64, NativeNode>,
    next_node: u64,
    root: u64,
    objects: u64,
    generators: BTreeMap<u64, Generator>,
    next_generator: u64,
    watches: Vec<Watch>,
    next_session: u64,
    listening: bool,
}

impl AddressSpace {
    /// Build the standard skeleton:
    /// `Root -> Objects` and `Root -> Types -> EventTypes -> BaseEventType`.
    fn new() -> Self {
        let mut space = Self {
            nodes: BTreeMap::new(),
            next_node: 0,
            root: 0,
            objects: 0,
            generators: BTreeMap::new(),
            next_generator: 0,
            watches: Vec::new(),
            next_session: 0,
            listening: false,
        };
        let root = space.allocate(STANDARD_NAMESPACE, "Root", NodeClass::Folder, None);
        space.root = root;
        let objects = space.attach(root, STANDARD_NAMESPACE, "Objects", NodeClass::Folder);
        space.objects = objects;
        let mut parent = root;
        for (i, name) in BASE_EVENT_TYPE_PATH.iter().enumerate() {
            let class = if i + 1 == BASE_EVENT_TYPE_PATH.len() {
                NodeClass::EventType
            } else {
                NodeClass::Folder
            };
            parent = space.attach(parent, STANDARD_NAMESPACE, name, class);
        }
        space
    }

    fn allocate(
        &mut self,
        namespace: u16,
        name: &str,
        class: NodeClass,
        value: Option<Value>,
    ) -> u64 {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(
            id,
            NativeNode {
                namespace,
                name: name.to_string(),
                class,
                value,
                writable: false,
                children: Vec::new(),
            },
        );
        id
    }

    /// Skeleton-only attach; parents are known to exist.
    fn attach(&mut self, parent: u64, namespace: u16, name: &str, class: NodeClass) -> u64 {
        let id = self.allocate(namespace, name, class, None);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        id
    }

    fn insert(
        &mut self,
        parent: u64,
        namespace: u16,
        name: &str,
        class: NodeClass,
        value: Option<Value>,
    ) -> Result<u64, EndpointError> {
        if self.child(parent, namespace, name).is_ok() {
            return Err(EndpointError::AlreadyExists {
                parent: NodeHandle(parent),
                namespace,
                name: name.to_string(),
            });
        }
        if !self.nodes.contains_key(&parent) {
            return Err(EndpointError::UnknownNode(NodeHandle(parent)));
        }
        let id = self.allocate(namespace, name, class, value);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    fn node(&self, id: u64) -> Result<&NativeNode, EndpointError> {
        self.nodes
            .get(&id)
            .ok_or(EndpointError::UnknownNode(NodeHandle(id)))
    }

    fn child(&self, parent: u64, namespace: u16, name: &str) -> Result<u64, EndpointError> {
        let node = self.node(parent)?;
        node.children
            .iter()
            .copied()
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|c| c.namespace == namespace && c.name == name)
            })
            .ok_or_else(|| EndpointError::NoSuchChild {
                parent: NodeHandle(parent),
                namespace,
                name: name.to_string(),
            })
    }

    fn read(&self, id: u64) -> Result<Value, EndpointError> {
        self.node(id)?
            .value
            .clone()
            .ok_or(EndpointError::NoValue(NodeHandle(id)))
    }

    fn write(&mut self, id: u64, value: Value) -> Result<(), EndpointError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(EndpointError::UnknownNode(NodeHandle(id)))?;
        if !matches!(node.class, NodeClass::Variable | NodeClass::Property) {
            return Err(EndpointError::NoValue(NodeHandle(id)));
        }
        node.value = Some(value.clone());
        for watch in &self.watches {
            if watch.target == (WatchTarget::DataChange { node: id }) {
                // A closed receiver means the session is going away.
                let _ = watch.sender.send(Delivery {
                    subscription: watch.subscription,
                    notification: Notification::DataChange {
                        node: watch.client_node,
                        value: value.clone(),
                    },
                });
            }
        }
        Ok(())
    }

    fn trigger(&self, generator: GeneratorHandle, message: &str) -> Result<(), EndpointError> {
        let generator_state = self
            .generators
            .get(&generator.0)
            .copied()
            .ok_or(EndpointError::UnknownGenerator(generator))?;
        let target = WatchTarget::Events {
            event_type: generator_state.event_type,
            source: generator_state.source,
        };
        for watch in self.watches.iter().filter(|w| w.target == target) {
            let _ = watch.sender.send(Delivery {
                subscription: watch.subscription,
                notification: Notification::Event {
                    source: watch.client_node,
                    message: message.to_string(),
                },
            });
        }
        Ok(())
    }

    fn drop_watches(
        &mut self,
        session: u64,
        subscription: SubscriptionId,
        monitor: Option<MonitorHandle>,
    ) {
        self.watches.retain(|w| {
            !(w.session == session
                && w.subscription == subscription
                && monitor.is_none_or(|m| w.monitor == m))
        });
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// In-process server endpoint.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    label: String,
    uri: String,
    space: Arc<RwLock<AddressSpace>>,
}

impl MemoryServer {
    /// Create a server with the standard skeleton. It does not listen until
    /// [`UaEndpoint::connect`] is called.
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            label: name.into(),
            uri: uri.into(),
            space: Arc::new(RwLock::new(AddressSpace::new())),
        }
    }

    /// Endpoint URI clients connect to.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Create a client session bound to this server (not yet connected).
    pub fn client(&self, label: impl Into<String>) -> MemoryClient {
        MemoryClient {
            label: label.into(),
            space: Arc::clone(&self.space),
            session: Mutex::new(None),
        }
    }

    /// Number of nodes in the address space, skeleton included.
    pub fn node_count(&self) -> usize {
        self.space.read().nodes.len()
    }

    /// Number of monitored items registered by all clients.
    pub fn monitored_item_count(&self) -> usize {
        self.space.read().watches.len()
    }

    fn add(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
        class: NodeClass,
        value: Option<Value>,
    ) -> Result<NodeHandle, EndpointError> {
        self.space
            .write()
            .insert(parent.0, namespace, name, class, value)
            .map(NodeHandle)
    }
}

impl UaEndpoint for MemoryServer {
    fn label(&self) -> &str {
        &self.label
    }

    fn connect(&self) -> Result<(), EndpointError> {
        self.space.write().listening = true;
        tracing::info!(server = %self.label, uri = %self.uri, "server listening");
        Ok(())
    }

    fn disconnect(&self) -> Result<(), EndpointError> {
        let mut space = self.space.write();
        space.listening = false;
        space.watches.clear();
        tracing::info!(server = %self.label, "server stopped");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.space.read().listening
    }

    fn root_node(&self) -> Result<NodeHandle, EndpointError> {
        Ok(NodeHandle(self.space.read().root))
    }

    fn objects_node(&self) -> Result<NodeHandle, EndpointError> {
        Ok(NodeHandle(self.space.read().objects))
    }

    fn add_folder(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError> {
        self.add(parent, namespace, name, NodeClass::Folder, None)
    }

    fn add_object(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError> {
        self.add(parent, namespace, name, NodeClass::Object, None)
    }

    fn add_variable(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
        initial: Value,
    ) -> Result<NodeHandle, EndpointError> {
        self.add(parent, namespace, name, NodeClass::Variable, Some(initial))
    }

    fn add_property(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
        initial: Value,
    ) -> Result<NodeHandle, EndpointError> {
        self.add(parent, namespace, name, NodeClass::Property, Some(initial))
    }

    fn get_child(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError> {
        self.space
            .read()
            .child(parent.0, namespace, name)
            .map(NodeHandle)
    }

    fn read_value(&self, node: NodeHandle) -> Result<Value, EndpointError> {
        self.space.read().read(node.0)
    }

    fn write_value(&self, node: NodeHandle, value: Value) -> Result<(), EndpointError> {
        self.space.write().write(node.0, value)
    }

    fn mark_writable(&self, node: NodeHandle) -> Result<(), EndpointError> {
        let mut space = self.space.write();
        let native = space
            .nodes
            .get_mut(&node.0)
            .ok_or(EndpointError::UnknownNode(node))?;
        native.writable = true;
        Ok(())
    }

    fn create_subscription(
        &self,
        _publishing_interval: Duration,
        _handler: Arc<dyn NotificationHandler>,
    ) -> Result<SubscriptionId, EndpointError> {
        Err(EndpointError::Unsupported("server-side subscriptions"))
    }

    fn subscribe_data_change(
        &self,
        _: SubscriptionId,
        _: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError> {
        Err(EndpointError::Unsupported("server-side subscriptions"))
    }

    fn subscribe_events(
        &self,
        _: SubscriptionId,
        _: NodeHandle,
        _: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError> {
        Err(EndpointError::Unsupported("server-side subscriptions"))
    }

    fn unsubscribe(&self, _: SubscriptionId, _: MonitorHandle) -> Result<(), EndpointError> {
        Err(EndpointError::Unsupported("server-side subscriptions"))
    }

    fn delete_subscription(&self, _: SubscriptionId) -> Result<(), EndpointError> {
        Err(EndpointError::Unsupported("server-side subscriptions"))
    }

    fn create_custom_event_type(
        &self,
        namespace: u16,
        name: &str,
        base: NodeHandle,
    ) -> Result<NodeHandle, EndpointError> {
        self.add(base, namespace, name, NodeClass::EventType, None)
    }

    fn get_event_generator(
        &self,
        event_type: NodeHandle,
        source: NodeHandle,
    ) -> Result<GeneratorHandle, EndpointError> {
        let mut space = self.space.write();
        if space.node(event_type.0)?.class != NodeClass::EventType {
            return Err(EndpointError::UnknownNode(event_type));
        }
        space.node(source.0)?;
        let id = space.next_generator;
        space.next_generator += 1;
        space.generators.insert(
            id,
            Generator {
                event_type: event_type.0,
                source: source.0,
            },
        );
        Ok(GeneratorHandle(id))
    }

    fn trigger_event(
        &self,
        generator: GeneratorHandle,
        message: &str,
    ) -> Result<(), EndpointError> {
        self.space.read().trigger(generator, message)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

struct SubscriptionState {
    handler: Arc<dyn NotificationHandler>,
    monitors: BTreeSet<MonitorHandle>,
}

type SubscriptionMap = Arc<Mutex<BTreeMap<SubscriptionId, SubscriptionState>>>;

/// State of one open session.
struct Session {
    id: u64,
    /// client handle -> native id
    handles: BTreeMap<u64, u64>,
    /// native id -> client handle
    issued: BTreeMap<u64, u64>,
    next_handle: u64,
    next_subscription: u64,
    next_monitor: u64,
    subscriptions: SubscriptionMap,
    sender: Sender<Delivery>,
    dispatcher: JoinHandle<()>,
}

impl Session {
    /// Client handle for a native node, issuing one on first sight.
    fn issue(&mut self, native: u64) -> NodeHandle {
        if let Some(handle) = self.issued.get(&native) {
            return NodeHandle(*handle);
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.handles.insert(handle, native);
        self.issued.insert(native, handle);
        NodeHandle(handle)
    }

    fn native(&self, handle: NodeHandle) -> Result<u64, EndpointError> {
        self.handles
            .get(&handle.0)
            .copied()
            .ok_or(EndpointError::UnknownNode(handle))
    }
}

/// In-process client session on a [`MemoryServer`].
pub struct MemoryClient {
    label: String,
    space: Arc<RwLock<AddressSpace>>,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("label", &self.label)
            .field("connected", &self.session.lock().is_some())
            .finish()
    }
}

impl MemoryClient {
    /// Number of open subscriptions in the current session.
    pub fn subscription_count(&self) -> usize {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.subscriptions.lock().len())
            .unwrap_or(0)
    }

    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session, &RwLock<AddressSpace>) -> Result<T, EndpointError>,
    ) -> Result<T, EndpointError> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(EndpointError::NotConnected)?;
        if !self.space.read().listening {
            return Err(EndpointError::NotConnected);
        }
        f(session, &self.space)
    }

    fn spawn_dispatcher(
        &self,
        subscriptions: SubscriptionMap,
    ) -> Result<(Sender<Delivery>, JoinHandle<()>), EndpointError> {
        let (sender, receiver) = mpsc::channel::<Delivery>();
        let dispatcher = std::thread::Builder::new()
            .name(format!("{}-notify", self.label))
            .spawn(move || {
                for delivery in receiver {
                    let handler = subscriptions
                        .lock()
                        .get(&delivery.subscription)
                        .map(|s| Arc::clone(&s.handler));
                    let Some(handler) = handler else { continue };
                    match delivery.notification {
                        Notification::DataChange { node, value } => {
                            handler.data_change(node, &value)
                        }
                        Notification::Event { source, message } => handler.event(source, &message),
                    }
                }
            })
            .map_err(|e| EndpointError::Io(format!("cannot spawn delivery thread: {e}")))?;
        Ok((sender, dispatcher))
    }
}

impl UaEndpoint for MemoryClient {
    fn label(&self) -> &str {
        &self.label
    }

    fn connect(&self) -> Result<(), EndpointError> {
        let mut guard = self.session.lock();
        if guard.is_some() {
            return Ok(());
        }
        let id = {
            let mut space = self.space.write();
            if !space.listening {
                return Err(EndpointError::NotConnected);
            }
            space.next_session += 1;
            space.next_session
        };
        let subscriptions: SubscriptionMap = Arc::new(Mutex::new(BTreeMap::new()));
        let (sender, dispatcher) = self.spawn_dispatcher(Arc::clone(&subscriptions))?;
        *guard = Some(Session {
            id,
            handles: BTreeMap::new(),
            issued: BTreeMap::new(),
            next_handle: 0,
            next_subscription: 0,
            next_monitor: 0,
            subscriptions,
            sender,
            dispatcher,
        });
        tracing::info!(client = %self.label, session = id, "session opened");
        Ok(())
    }

    fn disconnect(&self) -> Result<(), EndpointError> {
        let Some(session) = self.session.lock().take() else {
            return Ok(());
        };
        self.space.write().watches.retain(|w| w.session != session.id);
        let Session {
            id,
            sender,
            dispatcher,
            ..
        } = session;
        // Dropping the last sender ends the delivery loop.
        drop(sender);
        if dispatcher.join().is_err() {
            tracing::error!(client = %self.label, "notification handler panicked");
        }
        tracing::info!(client = %self.label, session = id, "session closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.lock().is_some() && self.space.read().listening
    }

    fn root_node(&self) -> Result<NodeHandle, EndpointError> {
        self.with_session(|session, space| {
            let root = space.read().root;
            Ok(session.issue(root))
        })
    }

    fn objects_node(&self) -> Result<NodeHandle, EndpointError> {
        self.with_session(|session, space| {
            let objects = space.read().objects;
            Ok(session.issue(objects))
        })
    }

    fn add_folder(&self, _: NodeHandle, _: u16, _: &str) -> Result<NodeHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side node creation"))
    }

    fn add_object(&self, _: NodeHandle, _: u16, _: &str) -> Result<NodeHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side node creation"))
    }

    fn add_variable(
        &self,
        _: NodeHandle,
        _: u16,
        _: &str,
        _: Value,
    ) -> Result<NodeHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side node creation"))
    }

    fn add_property(
        &self,
        _: NodeHandle,
        _: u16,
        _: &str,
        _: Value,
    ) -> Result<NodeHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side node creation"))
    }

    fn get_child(
        &self,
        parent: NodeHandle,
        namespace: u16,
        name: &str,
    ) -> Result<NodeHandle, EndpointError> {
        self.with_session(|session, space| {
            let parent_native = session.native(parent)?;
            let child = space.read().child(parent_native, namespace, name);
            match child {
                Ok(native) => Ok(session.issue(native)),
                Err(EndpointError::NoSuchChild { .. }) => Err(EndpointError::NoSuchChild {
                    parent,
                    namespace,
                    name: name.to_string(),
                }),
                Err(other) => Err(other),
            }
        })
    }

    fn read_value(&self, node: NodeHandle) -> Result<Value, EndpointError> {
        self.with_session(|session, space| {
            let native = session.native(node)?;
            space
                .read()
                .read(native)
                .map_err(|_| EndpointError::NoValue(node))
        })
    }

    fn write_value(&self, node: NodeHandle, value: Value) -> Result<(), EndpointError> {
        self.with_session(|session, space| {
            let native = session.native(node)?;
            let mut space = space.write();
            if !space.node(native)?.writable {
                return Err(EndpointError::NotWritable(node));
            }
            space.write(native, value)
        })
    }

    fn mark_writable(&self, _: NodeHandle) -> Result<(), EndpointError> {
        Err(EndpointError::Unsupported("client-side access control"))
    }

    fn create_subscription(
        &self,
        publishing_interval: Duration,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<SubscriptionId, EndpointError> {
        self.with_session(|session, _| {
            session.next_subscription += 1;
            let id = SubscriptionId(session.next_subscription);
            session.subscriptions.lock().insert(
                id,
                SubscriptionState {
                    handler,
                    monitors: BTreeSet::new(),
                },
            );
            tracing::trace!(?id, ?publishing_interval, "subscription created");
            Ok(id)
        })
    }

    fn subscribe_data_change(
        &self,
        subscription: SubscriptionId,
        node: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError> {
        self.with_session(|session, space| {
            let native = session.native(node)?;
            let target = WatchTarget::DataChange { node: native };
            register_watch(session, space, subscription, target, node)
        })
    }

    fn subscribe_events(
        &self,
        subscription: SubscriptionId,
        event_type: NodeHandle,
        source: NodeHandle,
    ) -> Result<MonitorHandle, EndpointError> {
        self.with_session(|session, space| {
            let target = WatchTarget::Events {
                event_type: session.native(event_type)?,
                source: session.native(source)?,
            };
            register_watch(session, space, subscription, target, source)
        })
    }

    fn unsubscribe(
        &self,
        subscription: SubscriptionId,
        monitor: MonitorHandle,
    ) -> Result<(), EndpointError> {
        self.with_session(|session, space| {
            let mut subscriptions = session.subscriptions.lock();
            let state = subscriptions
                .get_mut(&subscription)
                .ok_or(EndpointError::UnknownSubscription(subscription))?;
            if !state.monitors.remove(&monitor) {
                return Err(EndpointError::UnknownMonitor(monitor));
            }
            space
                .write()
                .drop_watches(session.id, subscription, Some(monitor));
            Ok(())
        })
    }

    fn delete_subscription(&self, subscription: SubscriptionId) -> Result<(), EndpointError> {
        self.with_session(|session, space| {
            session
                .subscriptions
                .lock()
                .remove(&subscription)
                .ok_or(EndpointError::UnknownSubscription(subscription))?;
            space.write().drop_watches(session.id, subscription, None);
            Ok(())
        })
    }

    fn create_custom_event_type(
        &self,
        _: u16,
        _: &str,
        _: NodeHandle,
    ) -> Result<NodeHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side event types"))
    }

    fn get_event_generator(
        &self,
        _: NodeHandle,
        _: NodeHandle,
    ) -> Result<GeneratorHandle, EndpointError> {
        Err(EndpointError::Unsupported("client-side event generators"))
    }

    fn trigger_event(&self, _: GeneratorHandle, _: &str) -> Result<(), EndpointError> {
        Err(EndpointError::Unsupported("client-side event generators"))
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

fn register_watch(
    session: &mut Session,
    space: &RwLock<AddressSpace>,
    subscription: SubscriptionId,
    target: WatchTarget,
    client_node: NodeHandle,
) -> Result<MonitorHandle, EndpointError> {
    let mut subscriptions = session.subscriptions.lock();
    let state = subscriptions
        .get_mut(&subscription)
        .ok_or(EndpointError::UnknownSubscription(subscription))?;
    session.next_monitor += 1;
    let monitor = MonitorHandle(session.next_monitor);
    state.monitors.insert(monitor);
    space.write().watches.push(Watch {
        session: session.id,
        subscription,
        monitor,
        target,
        client_node,
        sender: session.sender.clone(),
    });
    Ok(monitor)
}

// =============================================================================
// TESTS
// =============================================================================
