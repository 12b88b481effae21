//! # Tragen Context
//!
//! Orchestrates one traffic scenario: a frozen graph, one server endpoint,
//! any number of client endpoints and the actors running against them.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──> init ──> start_all ──> stop_all ──> close
//!           │          │
//!           └─ add_client (also while running)
//! ```
//!
//! `init` connects the server, realizes the graph on it, creates the
//! notification sources, then connects, realizes, checks and binds every
//! client and derives all actor rosters. A failure aborts `init` without
//! rollback; build a new context on fresh endpoints to retry.
//!
//! A client that connected but failed to attach is kept aside with
//! whatever subscriptions it got, so `close` still releases and
//! disconnects it.

use crate::TragenError;
use crate::actors::sampling::RngSource;
use crate::actors::{Actor, ActorEngine, ActorReport, client_actors, server_actors};
use crate::endpoint::{LoggingHandler, NotificationHandler, UaEndpoint};
use crate::namespace::NamespaceGraph;
use crate::notifications::NotificationRegistry;
use crate::profile::TrafficProfile;
use crate::realize::{RealizedTree, realize_on_client, realize_on_server};
use crate::subscription::{SubscriptionBinder, SubscriptionTable};
use std::sync::Arc;

/// Lifecycle phase of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, nothing connected yet.
    Declared,
    /// Endpoints realized and bound, actors loaded but idle.
    Initialized,
    /// Actors running.
    Running,
    /// Actors stopped and spent; only `close` remains.
    Stopped,
    /// Endpoints disconnected; the context is spent.
    Closed,
}

/// One connected client and what was built on it.
struct ClientState {
    endpoint: Arc<dyn UaEndpoint>,
    tree: RealizedTree,
    table: SubscriptionTable,
    handler: Arc<dyn NotificationHandler>,
}

/// A traffic-generation context.
pub struct TragenContext {
    graph: NamespaceGraph,
    profile: TrafficProfile,
    server: Arc<dyn UaEndpoint>,
    server_tree: RealizedTree,
    registry: NotificationRegistry,
    declared_clients: Vec<Arc<dyn UaEndpoint>>,
    clients: Vec<ClientState>,
    stranded: Vec<ClientState>,
    engine: ActorEngine,
    rngs: RngSource,
    handler: Option<Arc<dyn NotificationHandler>>,
    phase: Phase,
}

impl std::fmt::Debug for TragenContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TragenContext")
            .field("server", &self.server.label())
            .field("nodes", &self.graph.node_count())
            .field("clients", &self.clients.len())
            .field("engine", &self.engine)
            .field("phase", &self.phase)
            .finish()
    }
}

impl TragenContext {
    /// Create a context. The graph is frozen from here on.
    pub fn new(
        graph: NamespaceGraph,
        server: Arc<dyn UaEndpoint>,
        clients: Vec<Arc<dyn UaEndpoint>>,
        profile: TrafficProfile,
    ) -> Result<Self, TragenError> {
        profile.validate()?;
        Ok(Self {
            graph,
            rngs: RngSource::new(profile.seed),
            profile,
            server,
            server_tree: RealizedTree::default(),
            registry: NotificationRegistry::default(),
            declared_clients: clients,
            clients: Vec::new(),
            stranded: Vec::new(),
            engine: ActorEngine::new(),
            handler: None,
            phase: Phase::Declared,
        })
    }

    /// Deliver every client's notifications to `handler` instead of
    /// logging them.
    #[must_use]
    pub fn with_notification_handler(mut self, handler: Arc<dyn NotificationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    // -------------------------------------------------------------------------
    // LIFECYCLE
    // -------------------------------------------------------------------------

    /// Realize and bind everything, then load all actors.
    pub fn init(&mut self) -> Result<(), TragenError> {
        self.expect_phase(&[Phase::Declared], "init")?;

        self.server.connect()?;
        self.server_tree = realize_on_server(&self.graph, self.server.as_ref())?;
        self.registry =
            NotificationRegistry::setup(&self.graph, &self.server_tree, self.server.as_ref())?;
        let actors = server_actors(
            &self.graph,
            &self.server_tree,
            &self.registry,
            &self.server,
            &self.profile,
            &mut self.rngs,
        )?;
        self.engine.load_all(actors);

        for client in std::mem::take(&mut self.declared_clients) {
            self.attach_client(client)?;
        }
        self.phase = Phase::Initialized;
        tracing::info!(
            server = %self.server.label(),
            nodes = self.graph.node_count(),
            clients = self.clients.len(),
            actors = self.engine.pending(),
            "context initialized"
        );
        Ok(())
    }

    /// Connect one more client. While running, its actors start at once.
    pub fn add_client(&mut self, client: Arc<dyn UaEndpoint>) -> Result<(), TragenError> {
        self.expect_phase(&[Phase::Initialized, Phase::Running], "add_client")?;
        self.attach_client(client)?;
        if self.phase == Phase::Running {
            self.engine.start_all()?;
        }
        Ok(())
    }

    /// Start every loaded actor.
    pub fn start_all(&mut self) -> Result<usize, TragenError> {
        self.expect_phase(&[Phase::Initialized, Phase::Running], "start_all")?;
        let started = self.engine.start_all()?;
        self.phase = Phase::Running;
        Ok(started)
    }

    /// Stop every running actor and wait for all of them.
    ///
    /// Stopped actors are spent: after a run has been stopped the context
    /// can only be closed.
    pub fn stop_all(&mut self) -> Vec<ActorReport> {
        let reports = self.engine.stop_all();
        if self.phase == Phase::Running {
            self.phase = Phase::Stopped;
        }
        reports
    }

    /// Stop all actors, release every subscription, disconnect every
    /// client and stop the server.
    ///
    /// Every step is attempted; the first failure is returned after the
    /// rest has run.
    pub fn close(&mut self) -> Result<Vec<ActorReport>, TragenError> {
        if self.phase == Phase::Closed {
            return Ok(Vec::new());
        }
        let reports = self.stop_all();
        let mut first_error: Option<TragenError> = None;

        for client in self.clients.iter_mut().chain(self.stranded.iter_mut()) {
            if !client.endpoint.is_connected() {
                continue;
            }
            let binder = SubscriptionBinder::new(
                client.endpoint.as_ref(),
                Arc::clone(&client.handler),
                self.profile.publishing_interval(),
            );
            if let Err(e) = binder.unbind_all(&mut client.table) {
                first_error.get_or_insert(e);
            }
            if let Err(e) = client.endpoint.disconnect() {
                tracing::warn!(client = %client.endpoint.label(), error = %e, "disconnect failed");
                first_error.get_or_insert(e.into());
            }
        }
        if self.server.is_connected() {
            if let Err(e) = self.server.disconnect() {
                tracing::warn!(server = %self.server.label(), error = %e, "server stop failed");
                first_error.get_or_insert(e.into());
            }
        }
        self.phase = Phase::Closed;
        tracing::info!(server = %self.server.label(), "context closed");
        first_error.map_or(Ok(reports), Err)
    }

    // -------------------------------------------------------------------------
    // ACCESSORS
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn graph(&self) -> &NamespaceGraph {
        &self.graph
    }

    pub fn profile(&self) -> &TrafficProfile {
        &self.profile
    }

    pub fn server_tree(&self) -> &RealizedTree {
        &self.server_tree
    }

    pub fn registry(&self) -> &NotificationRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ActorEngine {
        &self.engine
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of clients that connected but failed to attach.
    pub fn stranded_count(&self) -> usize {
        self.stranded.len()
    }

    /// Realized tree of the n-th connected client.
    pub fn client_tree(&self, index: usize) -> Option<&RealizedTree> {
        self.clients.get(index).map(|c| &c.tree)
    }

    /// Subscription table of the n-th connected client.
    pub fn subscriptions(&self, index: usize) -> Option<&SubscriptionTable> {
        self.clients.get(index).map(|c| &c.table)
    }

    // -------------------------------------------------------------------------
    // INTERNALS
    // -------------------------------------------------------------------------

    fn attach_client(&mut self, endpoint: Arc<dyn UaEndpoint>) -> Result<(), TragenError> {
        endpoint.connect()?;
        let handler: Arc<dyn NotificationHandler> = match &self.handler {
            Some(shared) => Arc::clone(shared),
            None => Arc::new(LoggingHandler::new(endpoint.label())),
        };
        let mut client = ClientState {
            endpoint,
            tree: RealizedTree::default(),
            table: SubscriptionTable::new(),
            handler,
        };
        match self.build_client(&mut client) {
            Ok(actors) => {
                tracing::info!(
                    client = %client.endpoint.label(),
                    subscriptions = client.table.len(),
                    actors = actors.len(),
                    "client attached"
                );
                self.engine.load_all(actors);
                self.clients.push(client);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    client = %client.endpoint.label(),
                    subscriptions = client.table.len(),
                    error = %e,
                    "client attach failed"
                );
                self.stranded.push(client);
                Err(e)
            }
        }
    }

    fn build_client(
        &mut self,
        client: &mut ClientState,
    ) -> Result<Vec<Box<dyn Actor>>, TragenError> {
        client.tree = realize_on_client(&self.graph, client.endpoint.as_ref())?;
        self.server_tree.correspond(&client.tree)?;
        let binder = SubscriptionBinder::new(
            client.endpoint.as_ref(),
            Arc::clone(&client.handler),
            self.profile.publishing_interval(),
        );
        binder.bind(&client.tree, &self.graph, &mut client.table)?;
        client_actors(
            &self.graph,
            &client.tree,
            &client.endpoint,
            &self.profile,
            &mut self.rngs,
        )
    }

    fn expect_phase(&self, allowed: &[Phase], operation: &str) -> Result<(), TragenError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(TragenError::InvalidState(format!(
                "{operation} is not allowed in phase {:?}",
                self.phase
            )))
        }
    }
}

impl Drop for TragenContext {
    fn drop(&mut self) {
        if self.phase != Phase::Closed {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "context teardown incomplete");
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
