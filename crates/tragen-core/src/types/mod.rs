//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Tragen core:
//! - Node roles and correlation keys (`NodeKind`, `NodeKey`)
//! - Node values (`Value`)
//! - Opaque endpoint handles (`NodeHandle`, `SubscriptionId`, `MonitorHandle`, `GeneratorHandle`)
//! - Error types (`TragenError`)
//!
//! Handles are only meaningful on the endpoint that issued them. A handle
//! obtained from the server is never valid on a client and vice versa.

use crate::endpoint::EndpointError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE ROLES
// =============================================================================

/// Structural role of a node in the namespace hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Container that may hold folders, objects, variables and properties.
    Folder,
    /// Container that may hold variables and properties only.
    Object,
    /// Value holder of any type.
    Variable,
    /// Text-only value holder.
    Property,
}

impl NodeKind {
    /// Marker used by the diagnostic tree dump.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Folder => "[ ]",
            Self::Object => "[+]",
            Self::Variable | Self::Property => "[*]",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Folder => "folder",
            Self::Object => "object",
            Self::Variable => "variable",
            Self::Property => "property",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CORRELATION KEY
// =============================================================================

/// Endpoint-independent identity of one logical node.
///
/// Two realizations of the same graph describe "the same" node when their
/// keys are equal. The key is derived from the declaration, never from a
/// handle, so it can be compared across endpoints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    /// Structural role.
    pub kind: NodeKind,
    /// Namespace index the node is declared in.
    pub namespace: u16,
    /// Browse name, unique among all siblings.
    pub name: String,
    /// Names of the enclosing containers, outermost first.
    pub parent_path: Vec<String>,
}

impl NodeKey {
    /// Create a new key.
    #[must_use]
    pub fn new(
        kind: NodeKind,
        namespace: u16,
        name: impl Into<String>,
        parent_path: Vec<String>,
    ) -> Self {
        Self {
            kind,
            namespace,
            name: name.into(),
            parent_path,
        }
    }

    /// Slash-separated path including the node's own name.
    #[must_use]
    pub fn path(&self) -> String {
        let mut segments = self.parent_path.clone();
        segments.push(self.name.clone());
        segments.join("/")
    }

    /// Nesting depth (0 for nodes attached at the graph root).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent_path.len()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.namespace, self.path())
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// Value held by a variable or property.
///
/// Deserialized untagged so scenario files can write plain literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Double(f64),
    /// Text value. The only type a property may hold.
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Whether the value is text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
        }
    }

    /// Replace the magnitude of a numeric value, keeping its type.
    ///
    /// Integers are rounded to the nearest whole number. Returns `None` for
    /// non-numeric values.
    #[must_use]
    pub fn with_magnitude(&self, magnitude: f64) -> Option<Self> {
        match self {
            Self::Int(_) => Some(Self::Int(magnitude.round() as i64)),
            Self::Double(_) => Some(Self::Double(magnitude)),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// =============================================================================
// ENDPOINT HANDLES
// =============================================================================

/// Opaque handle to a native node, issued by one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

/// Opaque handle to a subscription, issued by one client endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Opaque handle to one monitored item inside a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonitorHandle(pub u64);

/// Opaque handle to an event generator (event type bound to a source object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n#{}", self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tragen core.
///
/// Graph construction errors are fatal to the single add call that raised
/// them and leave the graph unchanged. Realization errors abort the whole
/// pass for one endpoint. Actor-loop failures never surface here; they are
/// logged and the actor carries on.
#[derive(Debug, Error)]
pub enum TragenError {
    /// A sibling with the same name and role already exists.
    #[error("duplicate {kind} '{name}' under '{parent}'")]
    DuplicateName {
        kind: NodeKind,
        name: String,
        parent: String,
    },

    /// A sibling of another role already uses the name.
    #[error("{kind} '{name}' clashes with the {existing} of that name under '{parent}'")]
    NameClash {
        kind: NodeKind,
        existing: NodeKind,
        name: String,
        parent: String,
    },

    /// A bare-name parent lookup matched more than one container.
    #[error("'{name}' matches {matches} containers; refer to it by a unique name")]
    AmbiguousPath { name: String, matches: usize },

    /// A bare-name parent lookup matched nothing.
    #[error("no container named '{0}'")]
    UnresolvedPath(String),

    /// A value of the wrong type was supplied (properties hold text only).
    #[error("{kind} '{name}' cannot hold a value of type {found}")]
    InvalidValueType {
        kind: NodeKind,
        name: String,
        found: &'static str,
    },

    /// The endpoint rejected a create or lookup during realization.
    #[error("realization failed at {node}: {reason}")]
    Realization { node: String, reason: String },

    /// A subscription could not be created or torn down.
    #[error("subscription failed for {node}: {reason}")]
    Subscription { node: String, reason: String },

    /// An endpoint call failed outside realization or binding.
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Arithmetic was requested on a value that has no numeric view.
    #[error("value of {node} is not numeric ({found})")]
    NonNumericValue { node: String, found: &'static str },

    /// An operation was called in the wrong lifecycle phase.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A scenario or profile could not be interpreted.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
