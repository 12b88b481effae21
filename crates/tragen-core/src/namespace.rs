//! # Namespace Graph
//!
//! The declarative tree of folders, objects, variables and properties that
//! every endpoint realizes.
//!
//! Each level holds four ordered collections: `folders`, `objects`,
//! `variables` and `properties`. Objects hold only variables and
//! properties. Declaration order is preserved and is the canonical walk
//! order used by realization, subscription binding and roster derivation.
//!
//! ## Parent resolution
//!
//! Parents are named by bare name, searched across the whole tree:
//! - folders and objects attach under a folder
//! - variables and properties attach under a folder or an object
//!
//! Zero matches is [`TragenError::UnresolvedPath`], more than one is
//! [`TragenError::AmbiguousPath`]. There is no full-path addressing; a name
//! reused in two branches can no longer be used as a parent.
//!
//! ## Freeze discipline
//!
//! The graph is mutated only through the `add_*` methods, from one thread.
//! Once handed to a [`crate::TragenContext`] it is owned immutably and
//! never mutated again.

use crate::{NodeKey, NodeKind, TragenError, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// How a variable's value evolves on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// No updater; the value only changes through client writes.
    #[default]
    Static,
    /// Updated at a fixed period.
    Regular,
    /// Updated at a randomly resampled period.
    Irregular,
}

/// Declaration flags for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VariableFlags {
    /// Clients may write the value.
    pub writable: bool,
    /// Server-side update behavior.
    pub update: UpdateMode,
    /// A notifier watches the value against its bounds.
    pub monitored: bool,
    /// Explicit lower threshold; derived from the value when unset.
    pub lower_bound: Option<f64>,
    /// Explicit upper threshold; derived from the value when unset.
    pub upper_bound: Option<f64>,
}

impl VariableFlags {
    /// Static, read-only, unmonitored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    #[must_use]
    pub fn update(mut self, mode: UpdateMode) -> Self {
        self.update = mode;
        self
    }

    #[must_use]
    pub fn monitored(mut self) -> Self {
        self.monitored = true;
        self
    }

    #[must_use]
    pub fn bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: String,
    pub namespace: u16,
    pub value: Value,
    pub flags: VariableFlags,
}

impl VariableDescriptor {
    /// Whether a server-side updater exists for this variable.
    #[must_use]
    pub fn has_updater(&self) -> bool {
        self.flags.update != UpdateMode::Static
    }

    /// Whether a server-side notifier watches this variable.
    ///
    /// Regularly updated variables are always monitored: their clients
    /// subscribe to threshold events rather than to data changes.
    #[must_use]
    pub fn is_monitored(&self) -> bool {
        self.flags.monitored || self.flags.update == UpdateMode::Regular
    }
}

/// A declared property. Properties only hold text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub namespace: u16,
    pub value: String,
    pub writable: bool,
}

/// Variables and properties of one container, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Leaves {
    variables: Vec<VariableDescriptor>,
    properties: Vec<PropertyDescriptor>,
}

impl Leaves {
    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    fn taken_by(&self, name: &str) -> Option<NodeKind> {
        if self.variables.iter().any(|v| v.name == name) {
            Some(NodeKind::Variable)
        } else if self.properties.iter().any(|p| p.name == name) {
            Some(NodeKind::Property)
        } else {
            None
        }
    }
}

/// One level of the tree: the graph root or the inside of a folder.
#[derive(Debug, Clone, Default)]
pub struct Level {
    folders: Vec<Folder>,
    objects: Vec<Object>,
    leaves: Leaves,
}

impl Level {
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn leaves(&self) -> &Leaves {
        &self.leaves
    }

    fn taken_by(&self, name: &str) -> Option<NodeKind> {
        if self.folders.iter().any(|f| f.name == name) {
            Some(NodeKind::Folder)
        } else if self.objects.iter().any(|o| o.name == name) {
            Some(NodeKind::Object)
        } else {
            self.leaves.taken_by(name)
        }
    }
}

/// A declared folder and its subtree.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub namespace: u16,
    content: Level,
}

impl Folder {
    pub fn content(&self) -> &Level {
        &self.content
    }
}

/// A declared object and its members.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub namespace: u16,
    leaves: Leaves,
}

impl Object {
    pub fn leaves(&self) -> &Leaves {
        &self.leaves
    }
}

/// Borrowed view of any descriptor.
#[derive(Debug, Clone, Copy)]
pub enum DescriptorRef<'a> {
    Folder(&'a Folder),
    Object(&'a Object),
    Variable(&'a VariableDescriptor),
    Property(&'a PropertyDescriptor),
}

/// One node of the canonical walk: its correlation key and its descriptor.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    pub key: NodeKey,
    pub node: DescriptorRef<'a>,
}

// =============================================================================
// CONTAINER ADDRESSING
// =============================================================================

/// One step from a level into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Folder(usize),
    Object(usize),
}

/// A container found by bare-name lookup.
#[derive(Debug, Clone)]
struct ContainerMatch {
    steps: Vec<Step>,
    path: Vec<String>,
}

/// Borrowed view of a container.
enum ContainerRef<'a> {
    Level(&'a Level),
    Object(&'a Object),
}

// =============================================================================
// NAMESPACE GRAPH
// =============================================================================

/// The declarative namespace tree.
#[derive(Debug, Clone, Default)]
pub struct NamespaceGraph {
    root: Level,
    node_count: usize,
}

impl NamespaceGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph with an optional folder, an optional object inside it,
    /// and a set of variables and properties attached to the innermost of
    /// the two (or to the root), all in one namespace.
    pub fn seeded(
        namespace: u16,
        folder: Option<&str>,
        object: Option<&str>,
        variables: Vec<(String, Value)>,
        properties: Vec<(String, Value)>,
    ) -> Result<Self, TragenError> {
        let mut graph = Self::new();
        if let Some(folder) = folder {
            graph.add_folder(folder, namespace, None)?;
        }
        if let Some(object) = object {
            graph.add_object(object, namespace, folder)?;
        }
        let parent = object.or(folder);
        for (name, value) in variables {
            graph.add_variable(&name, value, namespace, parent, VariableFlags::new())?;
        }
        for (name, value) in properties {
            graph.add_property(&name, value, namespace, parent)?;
        }
        Ok(graph)
    }

    /// The root level.
    pub fn root(&self) -> &Level {
        &self.root
    }

    /// Total number of declared nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Whether nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }

    // -------------------------------------------------------------------------
    // CONSTRUCTION
    // -------------------------------------------------------------------------

    /// Declare a folder at the root or under the folder named `parent`.
    pub fn add_folder(
        &mut self,
        name: &str,
        namespace: u16,
        parent: Option<&str>,
    ) -> Result<NodeKey, TragenError> {
        let target = self.resolve_parent(parent, false)?;
        let path = target.as_ref().map(|m| m.path.clone()).unwrap_or_default();
        let steps = target.map(|m| m.steps).unwrap_or_default();
        self.check_free(&steps, NodeKind::Folder, name, &path)?;
        let level = self
            .level_mut(&steps)
            .ok_or_else(|| TragenError::UnresolvedPath(parent.unwrap_or_default().to_string()))?;

        level.folders.push(Folder {
            name: name.to_string(),
            namespace,
            content: Level::default(),
        });
        self.node_count += 1;
        Ok(NodeKey::new(NodeKind::Folder, namespace, name, path))
    }

    /// Declare an empty object at the root or under the folder named `parent`.
    pub fn add_object(
        &mut self,
        name: &str,
        namespace: u16,
        parent: Option<&str>,
    ) -> Result<NodeKey, TragenError> {
        self.add_object_with(name, namespace, parent, Vec::new(), Vec::new())
    }

    /// Declare an object together with its initial variables and properties.
    ///
    /// All members are validated before anything is attached, so a failure
    /// leaves the graph unchanged.
    pub fn add_object_with(
        &mut self,
        name: &str,
        namespace: u16,
        parent: Option<&str>,
        variables: Vec<(String, Value)>,
        properties: Vec<(String, Value)>,
    ) -> Result<NodeKey, TragenError> {
        let mut path = Vec::new();
        let mut member_path = vec![name.to_string()];
        let mut leaves = Leaves::default();

        for (var_name, value) in variables {
            if leaves.taken_by(&var_name).is_some() {
                return Err(duplicate(NodeKind::Variable, &var_name, &member_path));
            }
            leaves.variables.push(VariableDescriptor {
                name: var_name,
                namespace,
                value,
                flags: VariableFlags::new(),
            });
        }
        for (prop_name, value) in properties {
            let text = property_text(&prop_name, value)?;
            match leaves.taken_by(&prop_name) {
                None => {}
                Some(NodeKind::Property) => {
                    return Err(duplicate(NodeKind::Property, &prop_name, &member_path));
                }
                Some(existing) => {
                    return Err(clash(NodeKind::Property, existing, &prop_name, &member_path));
                }
            }
            leaves.properties.push(PropertyDescriptor {
                name: prop_name,
                namespace,
                value: text,
                writable: false,
            });
        }

        let target = self.resolve_parent(parent, false)?;
        if let Some(found) = &target {
            path.clone_from(&found.path);
            member_path = path.clone();
            member_path.push(name.to_string());
        }
        let steps = target.map(|m| m.steps).unwrap_or_default();
        self.check_free(&steps, NodeKind::Object, name, &path)?;
        let level = self
            .level_mut(&steps)
            .ok_or_else(|| TragenError::UnresolvedPath(parent.unwrap_or_default().to_string()))?;

        let members = leaves.variables.len() + leaves.properties.len();
        level.objects.push(Object {
            name: name.to_string(),
            namespace,
            leaves,
        });
        self.node_count += 1 + members;
        tracing::trace!(object = %member_path.join("/"), members, "object declared");
        Ok(NodeKey::new(NodeKind::Object, namespace, name, path))
    }

    /// Declare a variable at the root or under the folder or object named `parent`.
    pub fn add_variable(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        namespace: u16,
        parent: Option<&str>,
        flags: VariableFlags,
    ) -> Result<NodeKey, TragenError> {
        let value = value.into();
        let target = self.resolve_parent(parent, true)?;
        let path = target.as_ref().map(|m| m.path.clone()).unwrap_or_default();
        let steps = target.map(|m| m.steps).unwrap_or_default();
        self.check_free(&steps, NodeKind::Variable, name, &path)?;
        let leaves = self
            .leaves_mut(&steps)
            .ok_or_else(|| TragenError::UnresolvedPath(parent.unwrap_or_default().to_string()))?;

        leaves.variables.push(VariableDescriptor {
            name: name.to_string(),
            namespace,
            value,
            flags,
        });
        self.node_count += 1;
        Ok(NodeKey::new(NodeKind::Variable, namespace, name, path))
    }

    /// Declare a text property at the root or under the folder or object named `parent`.
    ///
    /// A non-text value fails before any lookup takes place.
    pub fn add_property(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        namespace: u16,
        parent: Option<&str>,
    ) -> Result<NodeKey, TragenError> {
        self.add_property_with(name, value, namespace, parent, false)
    }

    /// Declare a text property, optionally writable.
    pub fn add_property_with(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        namespace: u16,
        parent: Option<&str>,
        writable: bool,
    ) -> Result<NodeKey, TragenError> {
        let text = property_text(name, value.into())?;
        let target = self.resolve_parent(parent, true)?;
        let path = target.as_ref().map(|m| m.path.clone()).unwrap_or_default();
        let steps = target.map(|m| m.steps).unwrap_or_default();
        self.check_free(&steps, NodeKind::Property, name, &path)?;
        let leaves = self
            .leaves_mut(&steps)
            .ok_or_else(|| TragenError::UnresolvedPath(parent.unwrap_or_default().to_string()))?;

        leaves.properties.push(PropertyDescriptor {
            name: name.to_string(),
            namespace,
            value: text,
            writable,
        });
        self.node_count += 1;
        Ok(NodeKey::new(NodeKind::Property, namespace, name, path))
    }

    // -------------------------------------------------------------------------
    // LOOKUP
    // -------------------------------------------------------------------------

    /// Find every node of `kind` named `name`.
    ///
    /// With `scope`, the search is restricted to the subtree of the folder or
    /// object of that name, which must itself resolve uniquely.
    pub fn find_by_name(
        &self,
        name: &str,
        kind: NodeKind,
        scope: Option<&str>,
    ) -> Result<Vec<NodeKey>, TragenError> {
        let mut found = Vec::new();
        match self.resolve_parent(scope, true)? {
            None => {
                let mut path = Vec::new();
                collect_level(&self.root, &mut path, &mut found);
            }
            Some(scope) => {
                let mut path = scope.path.clone();
                match self.container(&scope.steps) {
                    Some(ContainerRef::Level(level)) => collect_level(level, &mut path, &mut found),
                    Some(ContainerRef::Object(object)) => {
                        collect_leaves(&object.leaves, &path, &mut found);
                    }
                    None => return Err(TragenError::UnresolvedPath(scope.path.join("/"))),
                }
            }
        }
        Ok(found
            .into_iter()
            .filter(|entry| entry.key.kind == kind && entry.key.name == name)
            .map(|entry| entry.key)
            .collect())
    }

    /// Every node in canonical order: at each level folders (each followed by
    /// its subtree), then objects (each followed by its members), then
    /// variables, then properties.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut out = Vec::with_capacity(self.node_count);
        let mut path = Vec::new();
        collect_level(&self.root, &mut path, &mut out);
        out
    }

    /// Declared variables in canonical order, with their keys.
    pub fn variables(&self) -> impl Iterator<Item = (NodeKey, &VariableDescriptor)> {
        self.entries().into_iter().filter_map(|entry| match entry.node {
            DescriptorRef::Variable(var) => Some((entry.key, var)),
            _ => None,
        })
    }

    /// Indented dump of the tree for diagnostics.
    #[must_use]
    pub fn show(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            let depth = entry.key.depth();
            if depth > 0 {
                out.push_str(&" |  ".repeat(depth - 1));
                out.push_str(" |__");
            }
            let marker = entry.key.kind.marker();
            let line = match entry.node {
                DescriptorRef::Folder(f) => format!("{marker} {} (ns={})", f.name, f.namespace),
                DescriptorRef::Object(o) => format!("{marker} {} (ns={})", o.name, o.namespace),
                DescriptorRef::Variable(v) => format!(
                    "{marker} Variable: ({}, {}) (ns={})",
                    v.name, v.value, v.namespace
                ),
                DescriptorRef::Property(p) => format!(
                    "{marker} Property: ({}, {:?}) (ns={})",
                    p.name, p.value, p.namespace
                ),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    // -------------------------------------------------------------------------
    // INTERNALS
    // -------------------------------------------------------------------------

    /// Resolve a bare parent name to exactly one container.
    fn resolve_parent(
        &self,
        parent: Option<&str>,
        include_objects: bool,
    ) -> Result<Option<ContainerMatch>, TragenError> {
        let Some(name) = parent else {
            return Ok(None);
        };
        let mut matches = Vec::new();
        find_containers(
            &self.root,
            name,
            include_objects,
            &mut Vec::new(),
            &mut Vec::new(),
            &mut matches,
        );
        match matches.len() {
            0 => Err(TragenError::UnresolvedPath(name.to_string())),
            1 => Ok(matches.pop()),
            n => Err(TragenError::AmbiguousPath {
                name: name.to_string(),
                matches: n,
            }),
        }
    }

    fn container(&self, steps: &[Step]) -> Option<ContainerRef<'_>> {
        let mut level = &self.root;
        for step in steps {
            match *step {
                Step::Folder(i) => level = &level.folders.get(i)?.content,
                Step::Object(i) => return level.objects.get(i).map(ContainerRef::Object),
            }
        }
        Some(ContainerRef::Level(level))
    }

    /// Fail if any sibling at the attachment point already uses `name`.
    ///
    /// Endpoints look children up by browse name alone, so a folder and an
    /// object of the same name under one parent could not be told apart.
    fn check_free(
        &self,
        steps: &[Step],
        kind: NodeKind,
        name: &str,
        path: &[String],
    ) -> Result<(), TragenError> {
        match self.taken_by(steps, name) {
            None => Ok(()),
            Some(existing) if existing == kind => Err(duplicate(kind, name, path)),
            Some(existing) => Err(clash(kind, existing, name, path)),
        }
    }

    fn taken_by(&self, steps: &[Step], name: &str) -> Option<NodeKind> {
        let mut level = &self.root;
        for step in steps {
            match *step {
                Step::Folder(i) => level = &level.folders.get(i)?.content,
                Step::Object(i) => return level.objects.get(i)?.leaves.taken_by(name),
            }
        }
        level.taken_by(name)
    }

    fn level_mut(&mut self, steps: &[Step]) -> Option<&mut Level> {
        let mut level = &mut self.root;
        for step in steps {
            match *step {
                Step::Folder(i) => level = &mut level.folders.get_mut(i)?.content,
                Step::Object(_) => return None,
            }
        }
        Some(level)
    }

    fn leaves_mut(&mut self, steps: &[Step]) -> Option<&mut Leaves> {
        let mut level = &mut self.root;
        for step in steps {
            match *step {
                Step::Folder(i) => level = &mut level.folders.get_mut(i)?.content,
                Step::Object(i) => return level.objects.get_mut(i).map(|o| &mut o.leaves),
            }
        }
        Some(&mut level.leaves)
    }
}

// =============================================================================
// WALK HELPERS
// =============================================================================

fn find_containers(
    level: &Level,
    name: &str,
    include_objects: bool,
    steps: &mut Vec<Step>,
    path: &mut Vec<String>,
    out: &mut Vec<ContainerMatch>,
) {
    for (i, folder) in level.folders.iter().enumerate() {
        steps.push(Step::Folder(i));
        path.push(folder.name.clone());
        if folder.name == name {
            out.push(ContainerMatch {
                steps: steps.clone(),
                path: path.clone(),
            });
        }
        find_containers(&folder.content, name, include_objects, steps, path, out);
        path.pop();
        steps.pop();
    }
    if include_objects {
        for (i, object) in level.objects.iter().enumerate() {
            if object.name == name {
                let mut found_steps = steps.clone();
                found_steps.push(Step::Object(i));
                let mut found_path = path.clone();
                found_path.push(object.name.clone());
                out.push(ContainerMatch {
                    steps: found_steps,
                    path: found_path,
                });
            }
        }
    }
}

fn collect_level<'a>(level: &'a Level, path: &mut Vec<String>, out: &mut Vec<Entry<'a>>) {
    for folder in &level.folders {
        out.push(Entry {
            key: NodeKey::new(NodeKind::Folder, folder.namespace, &folder.name, path.clone()),
            node: DescriptorRef::Folder(folder),
        });
        path.push(folder.name.clone());
        collect_level(&folder.content, path, out);
        path.pop();
    }
    for object in &level.objects {
        out.push(Entry {
            key: NodeKey::new(NodeKind::Object, object.namespace, &object.name, path.clone()),
            node: DescriptorRef::Object(object),
        });
        path.push(object.name.clone());
        collect_leaves(&object.leaves, path, out);
        path.pop();
    }
    collect_leaves(&level.leaves, path, out);
}

fn collect_leaves<'a>(leaves: &'a Leaves, path: &[String], out: &mut Vec<Entry<'a>>) {
    for var in &leaves.variables {
        out.push(Entry {
            key: NodeKey::new(NodeKind::Variable, var.namespace, &var.name, path.to_vec()),
            node: DescriptorRef::Variable(var),
        });
    }
    for prop in &leaves.properties {
        out.push(Entry {
            key: NodeKey::new(NodeKind::Property, prop.namespace, &prop.name, path.to_vec()),
            node: DescriptorRef::Property(prop),
        });
    }
}

fn property_text(name: &str, value: Value) -> Result<String, TragenError> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(TragenError::InvalidValueType {
            kind: NodeKind::Property,
            name: name.to_string(),
            found: other.type_name(),
        }),
    }
}

fn parent_label(parent: &[String]) -> String {
    if parent.is_empty() {
        "/".to_string()
    } else {
        parent.join("/")
    }
}

fn duplicate(kind: NodeKind, name: &str, parent: &[String]) -> TragenError {
    TragenError::DuplicateName {
        kind,
        name: name.to_string(),
        parent: parent_label(parent),
    }
}

fn clash(kind: NodeKind, existing: NodeKind, name: &str, parent: &[String]) -> TragenError {
    TragenError::NameClash {
        kind,
        existing,
        name: name.to_string(),
        parent: parent_label(parent),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tank_line() -> NamespaceGraph {
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
    }

    #[test]
    fn keys_carry_parent_path() {
        let mut graph = tank_line();
        let key = graph
            .add_variable("Temp", 20.0, 1, Some("Tank1"), VariableFlags::new())
            .expect("variable");
        assert_eq!(key.parent_path, vec!["Line1", "Tank1"]);
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn canonical_order_is_folders_objects_leaves() {
        let mut graph = tank_line();
        graph
            .add_variable("Ambient", 21.0, 1, None, VariableFlags::new())
            .expect("variable");
        graph.add_object("Pump", 1, None).expect("object");
        graph.add_folder("Line2", 1, None).expect("folder");

        let names: Vec<String> = graph.entries().iter().map(|e| e.key.path()).collect();
        assert_eq!(
            names,
            vec![
                "Line1",
                "Line1/Tank1",
                "Line1/Tank1/Level",
                "Line1/Tank1/Serial",
                "Line2",
                "Pump",
                "Ambient",
            ]
        );
    }

    #[test]
    fn duplicate_sibling_rejected_and_graph_unchanged() {
        let mut graph = tank_line();
        let before = graph.node_count();
        let err = graph.add_object("Tank1", 1, Some("Line1"));
        assert!(matches!(err, Err(TragenError::DuplicateName { .. })));
        assert_eq!(graph.node_count(), before);
    }

    #[test]
    fn same_name_different_role_is_rejected() {
        let mut graph = NamespaceGraph::new();
        graph.add_folder("Unit", 1, None).expect("folder");
        assert!(matches!(
            graph.add_object("Unit", 1, None),
            Err(TragenError::NameClash {
                kind: NodeKind::Object,
                existing: NodeKind::Folder,
                ..
            })
        ));
        assert!(matches!(
            graph.add_variable("Unit", 1.0, 1, None, VariableFlags::new()),
            Err(TragenError::NameClash { .. })
        ));
        graph.add_object("Pump", 1, Some("Unit")).expect("object");
        graph
            .add_variable("Speed", 1.0, 1, Some("Pump"), VariableFlags::new())
            .expect("variable");
        assert!(matches!(
            graph.add_property("Speed", "rpm", 1, Some("Pump")),
            Err(TragenError::NameClash {
                existing: NodeKind::Variable,
                ..
            })
        ));
        let err = graph.add_object_with(
            "Valve",
            1,
            None,
            vec![("Open".to_string(), Value::Bool(false))],
            vec![("Open".to_string(), Value::from("yes"))],
        );
        assert!(matches!(err, Err(TragenError::NameClash { .. })));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn same_name_in_different_parents_is_allowed() {
        let mut graph = NamespaceGraph::new();
        graph.add_folder("A", 1, None).expect("a");
        graph.add_object("Unit", 1, Some("A")).expect("a/unit");
        graph
            .add_variable("Unit", 1.0, 1, None, VariableFlags::new())
            .expect("root variable");
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn ambiguous_parent_rejected() {
        let mut graph = NamespaceGraph::new();
        graph.add_folder("A", 1, None).expect("a");
        graph.add_folder("B", 1, None).expect("b");
        graph.add_folder("Sensors", 1, Some("A")).expect("a/sensors");
        graph.add_folder("Sensors", 1, Some("B")).expect("b/sensors");

        let err = graph.add_variable("T", 1.0, 1, Some("Sensors"), VariableFlags::new());
        assert!(matches!(
            err,
            Err(TragenError::AmbiguousPath { matches: 2, .. })
        ));
    }

    #[test]
    fn unresolved_parent_rejected() {
        let mut graph = NamespaceGraph::new();
        let err = graph.add_object("Tank", 1, Some("Nowhere"));
        assert!(matches!(err, Err(TragenError::UnresolvedPath(name)) if name == "Nowhere"));
    }

    #[test]
    fn objects_are_not_folder_parents() {
        let mut graph = NamespaceGraph::new();
        graph.add_object("Tank", 1, None).expect("object");
        let err = graph.add_folder("Inner", 1, Some("Tank"));
        assert!(matches!(err, Err(TragenError::UnresolvedPath(_))));
    }

    #[test]
    fn non_text_property_rejected_before_lookup() {
        let mut graph = NamespaceGraph::new();
        let err = graph.add_property("Serial", 42i64, 1, Some("Nowhere"));
        assert!(matches!(
            err,
            Err(TragenError::InvalidValueType { found: "int", .. })
        ));
        assert!(graph.is_empty());
    }

    #[test]
    fn object_with_members_is_atomic() {
        let mut graph = NamespaceGraph::new();
        let err = graph.add_object_with(
            "Valve",
            1,
            None,
            vec![("Open".to_string(), Value::Bool(true))],
            vec![("Model".to_string(), Value::Double(1.0))],
        );
        assert!(err.is_err());
        assert!(graph.is_empty());

        graph
            .add_object_with(
                "Valve",
                1,
                None,
                vec![("Open".to_string(), Value::Bool(true))],
                vec![("Model".to_string(), Value::from("V-200"))],
            )
            .expect("object");
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn find_by_name_reports_every_match() {
        let mut graph = NamespaceGraph::new();
        graph.add_folder("A", 1, None).expect("a");
        graph.add_folder("B", 1, None).expect("b");
        graph
            .add_variable("T", 1.0, 1, Some("A"), VariableFlags::new())
            .expect("a/t");
        graph
            .add_variable("T", 2.0, 1, Some("B"), VariableFlags::new())
            .expect("b/t");

        let all = graph
            .find_by_name("T", NodeKind::Variable, None)
            .expect("find");
        assert_eq!(all.len(), 2);

        let scoped = graph
            .find_by_name("T", NodeKind::Variable, Some("B"))
            .expect("find");
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].path(), "B/T");

        let none = graph
            .find_by_name("T", NodeKind::Property, None)
            .expect("find");
        assert!(none.is_empty());
    }

    #[test]
    fn seeded_graph_nests_members() {
        let graph = NamespaceGraph::seeded(
            3,
            Some("Plant"),
            Some("Boiler"),
            vec![("Pressure".to_string(), Value::Double(2.5))],
            vec![("Vendor".to_string(), Value::from("ACME"))],
        )
        .expect("seeded");
        let paths: Vec<String> = graph.entries().iter().map(|e| e.key.path()).collect();
        assert_eq!(
            paths,
            vec![
                "Plant",
                "Plant/Boiler",
                "Plant/Boiler/Pressure",
                "Plant/Boiler/Vendor"
            ]
        );
        assert!(graph.entries().iter().all(|e| e.key.namespace == 3));
    }

    #[test]
    fn show_uses_role_markers() {
        let dump = tank_line().show();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "[ ] Line1 (ns=1)");
        assert_eq!(lines[1], " |__[+] Tank1 (ns=1)");
        assert_eq!(lines[2], " |   |__[*] Variable: (Level, 50) (ns=1)");
        assert!(lines[3].contains("[*] Property: (Serial, \"TK-0001\")"));
    }

    #[test]
    fn regular_updates_imply_monitoring() {
        let graph = tank_line();
        let (_, level) = graph.variables().next().expect("variable");
        assert!(level.has_updater());
        assert!(level.is_monitored());
    }
}
