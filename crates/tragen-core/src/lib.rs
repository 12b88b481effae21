//! # tragen-core
//!
//! The namespace model and traffic engine of Tragen - THE LOGIC.
//!
//! Tragen emulates a live automation network: it declares a tree of
//! folders, objects, variables and properties, realizes that tree on one
//! server endpoint and on every client endpoint, then drives continuous
//! read/write/subscribe/notify traffic against it.
//!
//! ## Layers
//!
//! - `namespace`: the declarative graph, built once and then frozen
//! - `endpoint`: the narrow UA endpoint capability the core calls
//! - `memory`: an in-process endpoint pair (server + client sessions)
//! - `realize`: graph -> native handles, per endpoint, in canonical order
//! - `notifications` / `subscription`: server event sources and client subscriptions
//! - `actors`: updaters, notifiers, readers and writers on their own threads
//! - `context`: the orchestrator owning all of the above
//!
//! ## Architectural Constraints
//!
//! - No wire protocol and no async runtime in the core
//! - Handles never cross endpoints; correspondence is by walk order and key
//! - Value races between actors are intentional and never serialized here

// =============================================================================
// MODULES
// =============================================================================

pub mod actors;
pub mod context;
pub mod endpoint;
pub mod memory;
pub mod namespace;
pub mod notifications;
pub mod primitives;
pub mod profile;
pub mod realize;
pub mod subscription;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    GeneratorHandle, MonitorHandle, NodeHandle, NodeKey, NodeKind, SubscriptionId, TragenError,
    Value,
};

// =============================================================================
// RE-EXPORTS: Namespace and Endpoints
// =============================================================================

pub use endpoint::{
    EndpointError, LoggingHandler, Notification, NotificationHandler, RecordingHandler, UaEndpoint,
};
pub use memory::{MemoryClient, MemoryServer};
pub use namespace::{NamespaceGraph, UpdateMode, VariableFlags};

// =============================================================================
// RE-EXPORTS: Realization, Subscriptions, Actors
// =============================================================================

pub use actors::{ActorEngine, ActorKind, ActorReport};
pub use context::{Phase, TragenContext};
pub use notifications::NotificationRegistry;
pub use profile::TrafficProfile;
pub use realize::{RealizedNode, RealizedTree, realize_on_client, realize_on_server};
pub use subscription::{SubscriptionBinder, SubscriptionEntry, SubscriptionKind, SubscriptionTable};
