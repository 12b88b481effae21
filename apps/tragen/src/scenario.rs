//! # Scenario Files
//!
//! A scenario describes one traffic context in TOML: the server endpoint,
//! the traffic profile and the namespace to declare.
//!
//! ```toml
//! [server]
//! endpoint = "opc.tcp://0.0.0.0:4840/tragen0/server0/"
//! clients = 2
//!
//! [traffic]
//! reader_period_ms = 250
//!
//! [[folders]]
//! name = "Line1"
//!
//! [[objects]]
//! name = "Tank1"
//! parent = "Line1"
//!
//! [[variables]]
//! name = "Level"
//! value = 50.0
//! parent = "Tank1"
//! writable = true
//! update = "regular"
//! ```
//!
//! Declarations are replayed in a fixed order: folders, objects, variables,
//! properties. Inside each table array the file order is kept.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tragen_core::{
    MemoryServer, NamespaceGraph, TragenContext, TragenError, TrafficProfile, UaEndpoint,
    UpdateMode, Value, VariableFlags,
};

/// Endpoint URI used when a scenario does not name one.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://0.0.0.0:4840/tragen0/server0/";

/// Server name used when a scenario does not name one.
pub const DEFAULT_SERVER_NAME: &str = "tragen0";

// =============================================================================
// FILE STRUCTURE
// =============================================================================

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub endpoint: String,
    pub name: Option<String>,
    /// Number of clients connected at init.
    pub clients: usize,
    /// Namespace index for declarations that do not set their own.
    pub namespace: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            name: None,
            clients: 1,
            namespace: 1,
        }
    }
}

/// `[[folders]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderDecl {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<u16>,
    #[serde(default)]
    pub parent: Option<String>,
}

/// A name/value pair declared inline with an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDecl {
    pub name: String,
    pub value: Value,
}

/// `[[objects]]` entry, optionally with inline members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectDecl {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<u16>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub variables: Vec<MemberDecl>,
    #[serde(default)]
    pub properties: Vec<MemberDecl>,
}

/// `[[variables]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDecl {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub namespace: Option<u16>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub update: UpdateMode,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub lower_bound: Option<f64>,
    #[serde(default)]
    pub upper_bound: Option<f64>,
}

impl VariableDecl {
    fn flags(&self) -> VariableFlags {
        let mut flags = VariableFlags::new()
            .update(self.update)
            .bounds(self.lower_bound, self.upper_bound);
        if self.writable {
            flags = flags.writable();
        }
        if self.monitored {
            flags = flags.monitored();
        }
        flags
    }
}

/// `[[properties]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDecl {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub namespace: Option<u16>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub writable: bool,
}

/// A parsed scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub server: ServerSection,
    pub traffic: TrafficProfile,
    pub folders: Vec<FolderDecl>,
    pub objects: Vec<ObjectDecl>,
    pub variables: Vec<VariableDecl>,
    pub properties: Vec<PropertyDecl>,
}

// =============================================================================
// LOADING
// =============================================================================

impl Scenario {
    /// Parse a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, TragenError> {
        let scenario: Self = toml::from_str(text)
            .map_err(|e| TragenError::Config(format!("invalid scenario: {}", e)))?;
        scenario.traffic.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, TragenError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TragenError::IoError(format!("Cannot read scenario '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Server name, falling back to the default.
    pub fn server_name(&self) -> &str {
        self.server.name.as_deref().unwrap_or(DEFAULT_SERVER_NAME)
    }

    // -------------------------------------------------------------------------
    // GRAPH
    // -------------------------------------------------------------------------

    /// Replay every declaration into a fresh graph.
    pub fn build_graph(&self) -> Result<NamespaceGraph, TragenError> {
        let ns = |own: Option<u16>| own.unwrap_or(self.server.namespace);
        let mut graph = NamespaceGraph::new();

        for folder in &self.folders {
            graph.add_folder(&folder.name, ns(folder.namespace), folder.parent.as_deref())?;
        }
        for object in &self.objects {
            graph.add_object_with(
                &object.name,
                ns(object.namespace),
                object.parent.as_deref(),
                pairs(&object.variables),
                pairs(&object.properties),
            )?;
        }
        for var in &self.variables {
            graph.add_variable(
                &var.name,
                var.value.clone(),
                ns(var.namespace),
                var.parent.as_deref(),
                var.flags(),
            )?;
        }
        for prop in &self.properties {
            graph.add_property_with(
                &prop.name,
                prop.value.clone(),
                ns(prop.namespace),
                prop.parent.as_deref(),
                prop.writable,
            )?;
        }

        tracing::debug!(nodes = graph.node_count(), "scenario graph built");
        Ok(graph)
    }

    /// Build a context over an in-process server and `clients` sessions
    /// (the scenario's client count when `None`).
    ///
    /// The server handle is returned alongside so callers can inspect it.
    pub fn context(
        &self,
        clients: Option<usize>,
    ) -> Result<(MemoryServer, TragenContext), TragenError> {
        let graph = self.build_graph()?;
        let server = MemoryServer::new(self.server.endpoint.clone(), self.server_name());
        let sessions: Vec<Arc<dyn UaEndpoint>> = (0..clients.unwrap_or(self.server.clients))
            .map(|i| Arc::new(server.client(format!("client{}", i))) as Arc<dyn UaEndpoint>)
            .collect();
        let context = TragenContext::new(
            graph,
            Arc::new(server.clone()),
            sessions,
            self.traffic.clone(),
        )?;
        Ok((server, context))
    }
}

fn pairs(members: &[MemberDecl]) -> Vec<(String, Value)> {
    members
        .iter()
        .map(|m| (m.name.clone(), m.value.clone()))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
