//! The shape tree aggregate: ordered storage plus the operations that keep its
//! invariants (placement rules, unique names, index/depth bookkeeping).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::events::{NodeRenamed, RenameListener};
use crate::domain::host::{Shape, ShapeSource};
use crate::domain::names::NameRegistry;
use crate::domain::navigator::TreeNavigator;
use crate::domain::node::{Node, NodeSource, NodeType, WeightParams};
use crate::domain::rules::NodeTypeRules;
use crate::domain::store::OrderedNodeStore;
use crate::domain::weight::{WeightPlan, WeightPropagationPlanner};

pub const DEFAULT_PROPERTY_PREFIX: &str = "shape_tree";

/// A request to add one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRequest {
    pub node_type: NodeType,
    /// Base name for groups, exact shape name for shape kinds.
    pub name: String,
    /// Parent node name; `None` or empty inserts at the root.
    pub parent: Option<String>,
    /// Backing data path for delegating kinds.
    pub data_path: Option<String>,
}

impl NodeRequest {
    pub fn group(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            node_type: NodeType::Group,
            name: name.into(),
            parent: parent.map(str::to_string),
            data_path: None,
        }
    }

    pub fn shapekey(shape: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            node_type: NodeType::Shapekey,
            name: shape.into(),
            parent: parent.map(str::to_string),
            data_path: None,
        }
    }

    pub fn linked(
        node_type: NodeType,
        name: impl Into<String>,
        data_path: impl Into<String>,
        parent: Option<&str>,
    ) -> Self {
        Self {
            node_type,
            name: name.into(),
            parent: parent.map(str::to_string),
            data_path: Some(data_path.into()),
        }
    }

    fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }
}

/// Result of a successful insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inserted {
    pub index: usize,
    pub name: String,
    /// Weight expression to install, `None` when parameters do not resolve.
    pub plan: Option<WeightPlan>,
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    pub index: usize,
    pub reparented: bool,
    /// Regenerated weight expression; only produced when the parent changed.
    pub plan: Option<WeightPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Why a node no longer points at live host data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Orphaned {
    /// The host has no shape with the node's name.
    MissingShape(String),
    /// The node's data path is empty or resolves to nothing.
    UnresolvedData(String),
}

impl fmt::Display for Orphaned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orphaned::MissingShape(name) => write!(f, "backing shape \"{name}\" is missing"),
            Orphaned::UnresolvedData(path) if path.is_empty() => f.write_str("data path is empty"),
            Orphaned::UnresolvedData(path) => write!(f, "data path {path} does not resolve"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(from = "StoredTree")]
pub struct ShapeTree {
    #[serde(default)]
    active_index: usize,
    #[serde(default)]
    next_uid: u64,
    #[serde(default = "default_prefix")]
    property_prefix: String,
    #[serde(default)]
    nodes: OrderedNodeStore,
    #[serde(skip)]
    listeners: Vec<Box<dyn RenameListener>>,
}

fn default_prefix() -> String {
    DEFAULT_PROPERTY_PREFIX.to_string()
}

/// Persisted form. The uid counter is raised above every stored uid so
/// property names are never handed out twice.
#[derive(Deserialize)]
struct StoredTree {
    #[serde(default)]
    active_index: usize,
    #[serde(default)]
    next_uid: u64,
    #[serde(default = "default_prefix")]
    property_prefix: String,
    #[serde(default)]
    nodes: OrderedNodeStore,
}

impl From<StoredTree> for ShapeTree {
    fn from(stored: StoredTree) -> Self {
        let floor = stored.nodes.iter().map(|n| n.uid() + 1).max().unwrap_or(0);
        if stored.next_uid < floor {
            warn!(stored = stored.next_uid, floor, "uid counter behind stored nodes, raising it");
        }
        Self {
            active_index: stored.active_index,
            next_uid: stored.next_uid.max(floor),
            property_prefix: stored.property_prefix,
            nodes: stored.nodes,
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for ShapeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeTree")
            .field("nodes", &self.nodes)
            .field("active_index", &self.active_index)
            .field("next_uid", &self.next_uid)
            .field("property_prefix", &self.property_prefix)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ShapeTree {
    fn default() -> Self {
        Self::new(DEFAULT_PROPERTY_PREFIX)
    }
}

impl ShapeTree {
    pub fn new(property_prefix: &str) -> Self {
        Self {
            nodes: OrderedNodeStore::new(),
            active_index: 0,
            next_uid: 0,
            property_prefix: property_prefix.to_string(),
            listeners: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &OrderedNodeStore {
        &self.nodes
    }

    pub fn navigator(&self) -> TreeNavigator<'_> {
        self.nodes.navigator()
    }

    pub fn len(&self) -> usize {
        self.nodes.count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.find(name)
    }

    pub fn property_prefix(&self) -> &str {
        &self.property_prefix
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> Option<&Node> {
        self.nodes.get(self.active_index)
    }

    pub fn set_active(&mut self, index: usize) {
        self.active_index = index;
    }

    pub fn names<'a>(&'a self, source: &'a dyn ShapeSource) -> NameRegistry<'a> {
        NameRegistry::new(&self.nodes, source)
    }

    pub fn subscribe(&mut self, listener: Box<dyn RenameListener>) {
        self.listeners.push(listener);
    }

    fn require(&self, name: &str) -> DomainResult<usize> {
        self.nodes
            .position(name)
            .ok_or_else(|| DomainError::NodeNotFound(name.to_string()))
    }

    /// Looks up an optional parent by name; an empty name means the root.
    pub fn resolve_parent(&self, name: Option<&str>) -> DomainResult<Option<usize>> {
        match name.filter(|n| !n.is_empty()) {
            None => Ok(None),
            Some(n) => self
                .nodes
                .position(n)
                .map(Some)
                .ok_or_else(|| DomainError::ParentNotFound(n.to_string())),
        }
    }

    // ---------------------------------------------------------------
    // Node state derived from the host
    // ---------------------------------------------------------------

    /// Influence/weight parameters of a node: its own for groups and shape keys,
    /// resolved through `data_path` for the other kinds.
    pub fn params(&self, source: &dyn ShapeSource, index: usize) -> Option<WeightParams> {
        match self.nodes.get(index)?.source() {
            NodeSource::Local(params) => Some(params.clone()),
            NodeSource::Linked { data_path } => source.resolve(data_path),
        }
    }

    pub fn influence_property_name(&self, source: &dyn ShapeSource, index: usize) -> Option<String> {
        self.params(source, index).map(|p| p.influence)
    }

    pub fn weight_property_name(&self, source: &dyn ShapeSource, index: usize) -> Option<String> {
        self.params(source, index).map(|p| p.weight)
    }

    /// Groups are always valid; shape nodes need their shape on the host and
    /// linked nodes need a resolving data path.
    pub fn is_valid(&self, source: &dyn ShapeSource, index: usize) -> bool {
        self.nodes.get(index).is_some() && self.orphaned(source, index).is_none()
    }

    /// The first dangling reference of the node at `index`, if any.
    pub fn orphaned(&self, source: &dyn ShapeSource, index: usize) -> Option<Orphaned> {
        let node = self.nodes.get(index)?;
        if node.is_shape() && !source.has_shape(node.name()) {
            return Some(Orphaned::MissingShape(node.name().to_string()));
        }
        match node.source() {
            NodeSource::Linked { data_path } if source.resolve(data_path).is_none() => {
                Some(Orphaned::UnresolvedData(data_path.clone()))
            }
            _ => None,
        }
    }

    pub fn shape<'s>(&self, source: &'s dyn ShapeSource, index: usize) -> Option<&'s Shape> {
        let node = self.nodes.get(index)?;
        if node.is_shape() {
            source.shape(node.name())
        } else {
            None
        }
    }

    /// Weight expression inputs for the node at `index` under its current parent.
    /// `None` when the node's own parameters do not resolve. An unresolved
    /// parent falls back to the root expression.
    pub fn weight_plan(&self, source: &dyn ShapeSource, index: usize) -> Option<WeightPlan> {
        let params = self.params(source, index)?;
        let parent = self.navigator().parent(index).and_then(|parent| {
            let resolved = self.params(source, parent.index());
            if resolved.is_none() {
                warn!(parent = parent.name(), "parent parameters unresolved, using root weight");
            }
            resolved
        });
        Some(WeightPropagationPlanner::plan(&params, parent.as_ref()))
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Validates `request` without touching the tree. Returns the parent
    /// position and the name the node would receive.
    pub fn check_insert(
        &self,
        source: &dyn ShapeSource,
        request: &NodeRequest,
    ) -> DomainResult<(Option<usize>, String)> {
        let parent = self.resolve_parent(request.parent_name())?;
        let parent_type = parent.and_then(|p| self.nodes.get(p)).map(|n| n.node_type());
        NodeTypeRules::check(parent_type, request.node_type, source.capabilities())?;

        let name = if request.node_type.is_shape() {
            if self.nodes.position(&request.name).is_some() {
                return Err(DomainError::NameInUse(request.name.clone()));
            }
            request.name.clone()
        } else {
            self.names(source).unique(&request.name)
        };
        Ok((parent, name))
    }

    /// Inserts a node after its parent's existing descendants, or at the end
    /// for root-level nodes. Rejections leave the tree unchanged.
    #[instrument(level = "debug", skip(self, source))]
    pub fn insert(&mut self, source: &dyn ShapeSource, request: NodeRequest) -> DomainResult<Inserted> {
        let (parent, name) = self.check_insert(source, &request)?;

        let uid = self.next_uid;
        self.next_uid += 1;
        let node_source = if request.node_type.is_self_describing() {
            NodeSource::Local(WeightParams::for_uid(&self.property_prefix, uid))
        } else {
            NodeSource::Linked {
                data_path: request.data_path.unwrap_or_default(),
            }
        };

        let position = self.nodes.insertion_point(parent);
        let depth = parent
            .and_then(|p| self.nodes.get(p))
            .map_or(0, |p| p.depth() + 1);

        let last = self.nodes.push(Node::new(name.clone(), request.node_type, uid, node_source));
        self.nodes.move_node(last, position);
        self.nodes.set_depth(position, depth);
        self.active_index = position;
        debug!(name = %name, position, depth, "inserted node");

        Ok(Inserted {
            index: position,
            plan: self.weight_plan(source, position),
            name,
        })
    }

    /// Renames a node, resolving collisions with the combined namespace, and
    /// notifies subscribers.
    #[instrument(level = "debug", skip(self, source))]
    pub fn rename(&mut self, source: &dyn ShapeSource, name: &str, value: &str) -> DomainResult<NodeRenamed> {
        let index = self.require(name)?;
        let resolved = self.names(source).unique(value);
        let node = self
            .nodes
            .get_mut(index)
            .ok_or_else(|| DomainError::NodeNotFound(name.to_string()))?;
        let previous_value = std::mem::replace(&mut node.name, resolved.clone());
        let event = NodeRenamed {
            index,
            uid: node.uid(),
            node_type: node.node_type(),
            value: resolved,
            previous_value,
            requested: value.to_string(),
        };
        debug!(from = %event.previous_value, to = %event.value, "renamed node");
        for listener in &mut self.listeners {
            listener.node_renamed(&event);
        }
        Ok(event)
    }

    /// Moves a node with its subtree under `new_parent` (after the parent's
    /// existing descendants) or to the end of the root level.
    #[instrument(level = "debug", skip(self, source))]
    pub fn move_to(
        &mut self,
        source: &dyn ShapeSource,
        name: &str,
        new_parent: Option<&str>,
    ) -> DomainResult<Moved> {
        let index = self.require(name)?;
        let parent = self.resolve_parent(new_parent)?;
        let nav = self.navigator();
        let node = &self.nodes.as_slice()[index];

        if let Some(p) = parent {
            if p == index || nav.is_ancestor_of(index, p) {
                return Err(DomainError::InvalidMove {
                    node: name.to_string(),
                    reason: "a node cannot be moved under itself".to_string(),
                });
            }
        }
        let parent_type = parent.map(|p| self.nodes.as_slice()[p].node_type());
        if !NodeTypeRules::allows_child(parent_type, node.node_type()) {
            return Err(DomainError::InvalidPlacement {
                parent: parent_type,
                child: node.node_type(),
            });
        }

        let old_parent = nav.parent(index).map(|p| p.uid());
        let new_parent_uid = parent.map(|p| self.nodes.as_slice()[p].uid());
        let reparented = old_parent != new_parent_uid;

        let end = nav.subtree_end(index);
        let len = end - index;
        let new_depth = parent.map_or(0, |p| self.nodes.as_slice()[p].depth() + 1);
        let delta = new_depth as isize - node.depth() as isize;
        let target_end = self.nodes.insertion_point(parent);
        let to = if target_end <= index { target_end } else { target_end - len };

        self.nodes.move_range(index..end, to, delta);
        self.active_index = to;
        debug!(name, from = index, to, delta, reparented, "moved subtree");

        let plan = if reparented {
            self.weight_plan(source, to)
        } else {
            None
        };
        Ok(Moved {
            index: to,
            reparented,
            plan,
        })
    }

    /// Swaps a node's subtree with its previous or next sibling's subtree.
    /// Parents are unchanged, so no weight plan is regenerated.
    #[instrument(level = "debug", skip(self))]
    pub fn reorder(&mut self, name: &str, direction: Direction) -> DomainResult<usize> {
        let index = self.require(name)?;
        let nav = self.navigator();
        let end = nav.subtree_end(index);
        let len = end - index;
        let to = match direction {
            Direction::Up => nav.previous_sibling(index).map(|s| s.index()),
            Direction::Down => nav
                .next_sibling(index)
                .map(|s| nav.subtree_end(s.index()) - len),
        };
        let Some(to) = to else {
            return Err(DomainError::InvalidMove {
                node: name.to_string(),
                reason: match direction {
                    Direction::Up => "no previous sibling".to_string(),
                    Direction::Down => "no next sibling".to_string(),
                },
            });
        };
        self.nodes.move_range(index..end, to, 0);
        self.active_index = to;
        Ok(to)
    }
}
