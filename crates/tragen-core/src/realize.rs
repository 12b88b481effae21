//! # Endpoint Realization
//!
//! Instantiates a [`NamespaceGraph`] against one endpoint and records the
//! native handle of every node in a [`RealizedTree`].
//!
//! ## Walk order
//!
//! At every level: folders (each followed by its subtree), then objects
//! (each followed by its members), then variables, then properties. This is
//! the order of [`NamespaceGraph::entries`], so a preorder walk of any
//! realized tree lines up one-to-one with the graph and with every other
//! realization of it. Server and client trees are correlated only through
//! that order and the [`NodeKey`] of each node; handles never cross
//! endpoints.
//!
//! ## Failure
//!
//! The first rejected call aborts the pass with [`TragenError::Realization`].
//! Nodes created before the failure stay on the endpoint; callers re-run on
//! a fresh endpoint.

use crate::endpoint::{EndpointError, UaEndpoint};
use crate::namespace::{Entry, Leaves, Level, NamespaceGraph};
use crate::{NodeHandle, NodeKey, NodeKind, TragenError, Value};

// =============================================================================
// REALIZED TREE
// =============================================================================

/// One descriptor paired with its handle on one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedNode {
    pub key: NodeKey,
    pub handle: NodeHandle,
    pub children: Vec<RealizedNode>,
}

/// The realization of a whole graph on one endpoint.
///
/// Read-only once built. Handles are invalidated when the endpoint
/// disconnects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealizedTree {
    endpoint: String,
    roots: Vec<RealizedNode>,
    len: usize,
}

impl RealizedTree {
    /// Label of the endpoint the tree was realized on.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Nodes attached directly under the endpoint's `Objects` node.
    pub fn roots(&self) -> &[RealizedNode] {
        &self.roots
    }

    /// Number of realized nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every node in canonical preorder.
    pub fn iter(&self) -> impl Iterator<Item = &RealizedNode> {
        let mut out = Vec::with_capacity(self.len);
        for root in &self.roots {
            preorder(root, &mut out);
        }
        out.into_iter()
    }

    /// Keys in canonical preorder; equal for any two realizations of one graph.
    pub fn shape(&self) -> Vec<NodeKey> {
        self.iter().map(|n| n.key.clone()).collect()
    }

    /// Handle of the node with the given key.
    pub fn handle_of(&self, key: &NodeKey) -> Option<NodeHandle> {
        self.iter().find(|n| &n.key == key).map(|n| n.handle)
    }

    /// Check that `other` realizes the same nodes in the same order.
    ///
    /// A shape check on keys only: two trees realized from one graph always
    /// pass, a tree realized from another graph does not. Whether a handle
    /// reaches the right native node is settled earlier, by resolve-mode
    /// realization looking every node up by browse name. The first key that
    /// differs is reported as a realization error naming this tree's node.
    pub fn correspond(&self, other: &RealizedTree) -> Result<(), TragenError> {
        let mut ours = self.iter();
        let mut theirs = other.iter();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return Ok(()),
                (Some(a), Some(b)) if a.key == b.key => {}
                (Some(a), Some(b)) => {
                    return Err(TragenError::Realization {
                        node: a.key.to_string(),
                        reason: format!("{} realized {} in its place", other.endpoint, b.key),
                    });
                }
                (Some(a), None) => {
                    return Err(TragenError::Realization {
                        node: a.key.to_string(),
                        reason: format!("missing on {}", other.endpoint),
                    });
                }
                (None, Some(b)) => {
                    return Err(TragenError::Realization {
                        node: b.key.to_string(),
                        reason: format!("unexpected on {}", other.endpoint),
                    });
                }
            }
        }
    }

    /// Pair every graph entry with this tree's handle for it.
    ///
    /// Fails if the tree was not realized from `graph`.
    pub fn lockstep<'g>(
        &self,
        graph: &'g NamespaceGraph,
    ) -> Result<Vec<(Entry<'g>, NodeHandle)>, TragenError> {
        let entries = graph.entries();
        if entries.len() != self.len {
            return Err(TragenError::InvalidState(format!(
                "tree on {} has {} nodes, graph has {}",
                self.endpoint,
                self.len,
                entries.len()
            )));
        }
        entries
            .into_iter()
            .zip(self.iter())
            .map(|(entry, node)| {
                if entry.key == node.key {
                    Ok((entry, node.handle))
                } else {
                    Err(TragenError::InvalidState(format!(
                        "tree on {} realized {} where the graph declares {}",
                        self.endpoint, node.key, entry.key
                    )))
                }
            })
            .collect()
    }
}

fn preorder<'a>(node: &'a RealizedNode, out: &mut Vec<&'a RealizedNode>) {
    out.push(node);
    for child in &node.children {
        preorder(child, out);
    }
}

// =============================================================================
// REALIZER
// =============================================================================

/// How the realizer obtains each native node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealizeMode {
    /// Create every node (server side) and mark writable nodes.
    Create,
    /// Look up every node by namespace and name (client side).
    Resolve,
}

/// Walks a graph against one endpoint.
pub struct EndpointRealizer<'e> {
    endpoint: &'e dyn UaEndpoint,
    mode: RealizeMode,
}

impl<'e> EndpointRealizer<'e> {
    pub fn new(endpoint: &'e dyn UaEndpoint, mode: RealizeMode) -> Self {
        Self { endpoint, mode }
    }

    /// Realize the whole graph under the endpoint's `Objects` node.
    pub fn realize(&self, graph: &NamespaceGraph) -> Result<RealizedTree, TragenError> {
        let objects = self
            .endpoint
            .objects_node()
            .map_err(|e| realization_error("Objects", e))?;
        let mut path = Vec::new();
        let mut len = 0;
        let roots = self.realize_level(graph.root(), objects, &mut path, &mut len)?;
        tracing::info!(
            endpoint = %self.endpoint.label(),
            mode = ?self.mode,
            nodes = len,
            "namespace realized"
        );
        Ok(RealizedTree {
            endpoint: self.endpoint.label().to_string(),
            roots,
            len,
        })
    }

    fn realize_level(
        &self,
        level: &Level,
        parent: NodeHandle,
        path: &mut Vec<String>,
        len: &mut usize,
    ) -> Result<Vec<RealizedNode>, TragenError> {
        let mut out = Vec::new();
        for folder in level.folders() {
            let key = NodeKey::new(NodeKind::Folder, folder.namespace, &folder.name, path.clone());
            let handle = self.node(parent, &key, None)?;
            *len += 1;
            path.push(folder.name.clone());
            let children = self.realize_level(folder.content(), handle, path, len)?;
            path.pop();
            out.push(RealizedNode {
                key,
                handle,
                children,
            });
        }
        for object in level.objects() {
            let key = NodeKey::new(NodeKind::Object, object.namespace, &object.name, path.clone());
            let handle = self.node(parent, &key, None)?;
            *len += 1;
            path.push(object.name.clone());
            let children = self.realize_leaves(object.leaves(), handle, path, len)?;
            path.pop();
            out.push(RealizedNode {
                key,
                handle,
                children,
            });
        }
        out.extend(self.realize_leaves(level.leaves(), parent, path, len)?);
        Ok(out)
    }

    fn realize_leaves(
        &self,
        leaves: &Leaves,
        parent: NodeHandle,
        path: &[String],
        len: &mut usize,
    ) -> Result<Vec<RealizedNode>, TragenError> {
        let mut out = Vec::new();
        for var in leaves.variables() {
            let key = NodeKey::new(NodeKind::Variable, var.namespace, &var.name, path.to_vec());
            let handle = self.node(parent, &key, Some(var.value.clone()))?;
            if var.flags.writable {
                self.mark_writable(handle, &key)?;
            }
            *len += 1;
            out.push(RealizedNode {
                key,
                handle,
                children: Vec::new(),
            });
        }
        for prop in leaves.properties() {
            let key = NodeKey::new(NodeKind::Property, prop.namespace, &prop.name, path.to_vec());
            let handle = self.node(parent, &key, Some(Value::Text(prop.value.clone())))?;
            if prop.writable {
                self.mark_writable(handle, &key)?;
            }
            *len += 1;
            out.push(RealizedNode {
                key,
                handle,
                children: Vec::new(),
            });
        }
        Ok(out)
    }

    fn node(
        &self,
        parent: NodeHandle,
        key: &NodeKey,
        initial: Option<Value>,
    ) -> Result<NodeHandle, TragenError> {
        let ep = self.endpoint;
        let result = match self.mode {
            RealizeMode::Resolve => ep.get_child(parent, key.namespace, &key.name),
            RealizeMode::Create => match (key.kind, initial) {
                (NodeKind::Folder, _) => ep.add_folder(parent, key.namespace, &key.name),
                (NodeKind::Object, _) => ep.add_object(parent, key.namespace, &key.name),
                (NodeKind::Variable, Some(v)) => {
                    ep.add_variable(parent, key.namespace, &key.name, v)
                }
                (NodeKind::Property, Some(v)) => {
                    ep.add_property(parent, key.namespace, &key.name, v)
                }
                (_, None) => Err(EndpointError::NoValue(parent)),
            },
        };
        let handle = result.map_err(|e| realization_error(key, e))?;
        tracing::debug!(endpoint = %ep.label(), %key, %handle, "node realized");
        Ok(handle)
    }

    fn mark_writable(&self, handle: NodeHandle, key: &NodeKey) -> Result<(), TragenError> {
        if self.mode == RealizeMode::Create {
            self.endpoint
                .mark_writable(handle)
                .map_err(|e| realization_error(key, e))?;
        }
        Ok(())
    }
}

/// Create every node of `graph` on a server endpoint.
pub fn realize_on_server(
    graph: &NamespaceGraph,
    server: &dyn UaEndpoint,
) -> Result<RealizedTree, TragenError> {
    EndpointRealizer::new(server, RealizeMode::Create).realize(graph)
}

/// Resolve every node of `graph` on a connected client endpoint.
pub fn realize_on_client(
    graph: &NamespaceGraph,
    client: &dyn UaEndpoint,
) -> Result<RealizedTree, TragenError> {
    EndpointRealizer::new(client, RealizeMode::Resolve).realize(graph)
}

fn realization_error(node: impl ToString, err: EndpointError) -> TragenError {
    TragenError::Realization {
        node: node.to_string(),
        reason: err.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryServer;
    use crate::namespace::{UpdateMode, VariableFlags};

    fn plant() -> NamespaceGraph {
        let mut graph = NamespaceGraph::new();
        graph.add_folder("Line1", 1, None).expect("folder");
        graph.add_object("Tank1", 1, Some("Line1")).expect("object");
        graph
            .add_variable(
                "Level",
                50.0,
                1,
                Some("Tank1"),
                VariableFlags::new().writable().update(UpdateMode::Regular),
            )
            .expect("variable");
        graph
            .add_property("Serial", "TK-0001", 1, Some("Tank1"))
            .expect("property");
        graph
            .add_variable("Ambient", 21i64, 1, None, VariableFlags::new())
            .expect("variable");
        graph
    }

    #[test]
    fn server_and_client_trees_share_shape() {
        let graph = plant();
        let server = MemoryServer::new("opc.tcp://localhost:4840/test", "srv");
        server.connect().expect("listen");
        let server_tree = realize_on_server(&graph, &server).expect("server");

        let client = server.client("c0");
        client.connect().expect("connect");
        let client_tree = realize_on_client(&graph, &client).expect("client");

        assert_eq!(server_tree.len(), graph.node_count());
        assert_eq!(server_tree.shape(), client_tree.shape());
        server_tree.correspond(&client_tree).expect("correspond");

        let keys: Vec<NodeKey> = graph.entries().into_iter().map(|e| e.key).collect();
        assert_eq!(server_tree.shape(), keys);
    }

    #[test]
    fn writable_flag_reaches_the_server() {
        let graph = plant();
        let server = MemoryServer::new("opc.tcp://localhost:4840/test", "srv");
        server.connect().expect("listen");
        realize_on_server(&graph, &server).expect("server");

        let client = server.client("c0");
        client.connect().expect("connect");
        let tree = realize_on_client(&graph, &client).expect("client");
        let pairs = tree.lockstep(&graph).expect("lockstep");

        let level = pairs
            .iter()
            .find(|(e, _)| e.key.name == "Level")
            .map(|(_, h)| *h)
            .expect("level");
        let ambient = pairs
            .iter()
            .find(|(e, _)| e.key.name == "Ambient")
            .map(|(_, h)| *h)
            .expect("ambient");
        client.write_value(level, Value::Double(1.0)).expect("writable");
        assert!(client.write_value(ambient, Value::Int(1)).is_err());
    }

    #[test]
    fn second_server_realization_is_rejected() {
        let graph = plant();
        let server = MemoryServer::new("opc.tcp://localhost:4840/test", "srv");
        server.connect().expect("listen");
        realize_on_server(&graph, &server).expect("first");
        let err = realize_on_server(&graph, &server);
        assert!(matches!(err, Err(TragenError::Realization { .. })));
    }

    #[test]
    fn client_of_unpopulated_server_fails() {
        let graph = plant();
        let server = MemoryServer::new("opc.tcp://localhost:4840/test", "srv");
        server.connect().expect("listen");
        let client = server.client("c0");
        client.connect().expect("connect");
        let err = realize_on_client(&graph, &client);
        assert!(matches!(
            err,
            Err(TragenError::Realization { node, .. }) if node == "folder 1:Line1"
        ));
    }

    #[test]
    fn correspondence_reports_first_difference() {
        let graph = plant();
        let mut other = plant();
        other.add_folder("Line2", 1, None).expect("folder");

        let a = MemoryServer::new("opc.tcp://a", "a");
        let b = MemoryServer::new("opc.tcp://b", "b");
        let tree_a = realize_on_server(&graph, &a).expect("a");
        let tree_b = realize_on_server(&other, &b).expect("b");
        assert!(tree_a.correspond(&tree_b).is_err());
        assert!(tree_b.lockstep(&graph).is_err());
    }

    #[test]
    fn empty_graph_realizes_to_empty_tree() {
        let server = MemoryServer::new("opc.tcp://localhost:4840/test", "srv");
        let tree = realize_on_server(&NamespaceGraph::new(), &server).expect("empty");
        assert!(tree.is_empty());
        assert_eq!(tree.endpoint(), "srv");
    }
}
