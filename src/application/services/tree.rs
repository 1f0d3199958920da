//! Shape tree service
//!
//! Runs tree mutations against a host and keeps the host side (properties,
//! drivers, shape names) in step with the tree.

use tracing::{debug, instrument, warn};

use crate::application::drivers::{self, ValueDriverOutcome};
use crate::application::ApplicationResult;
use crate::domain::{
    shape_value_path, Direction, DomainError, Inserted, Moved, Node, NodeRenamed, NodeRequest,
    NodeType, Orphaned, RenameListener, Shape, ShapeHost, ShapeTree, WeightParams, WeightPlan,
};

/// Base names for nodes created without an explicit name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    pub group_name: String,
    pub shape_name: String,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            group_name: "Group".to_string(),
            shape_name: "Key".to_string(),
        }
    }
}

/// Result of adding a shape key node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedShape {
    pub inserted: Inserted,
    /// The host shape was created for this node.
    pub created_shape: bool,
    pub value_driver: ValueDriverOutcome,
}

/// Everything the query surface knows about one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub index: usize,
    pub depth: usize,
    pub name: String,
    pub node_type: NodeType,
    pub parent: Option<String>,
    /// Nearest first.
    pub ancestors: Vec<String>,
    pub children: Vec<String>,
    pub siblings: Vec<String>,
    /// The node followed by all of its descendants.
    pub subtree: Vec<String>,
    pub valid: bool,
    /// Cause of invalidity, `None` for valid nodes.
    pub orphaned: Option<Orphaned>,
    pub data_path: Option<String>,
    pub params: Option<WeightParams>,
    pub shape: Option<Shape>,
}

/// Shape tree operations bound to a host.
pub struct ShapeTreeService<H: ShapeHost> {
    host: H,
    tree: ShapeTree,
    naming: NamingOptions,
}

impl<H: ShapeHost> ShapeTreeService<H> {
    pub fn new(host: H, tree: ShapeTree, naming: NamingOptions) -> Self {
        Self { host, tree, naming }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tree(&self) -> &ShapeTree {
        &self.tree
    }

    pub fn into_parts(self) -> (H, ShapeTree) {
        (self.host, self.tree)
    }

    pub fn subscribe(&mut self, listener: Box<dyn RenameListener>) {
        self.tree.subscribe(listener);
    }

    fn require_group_parent(&self, parent: Option<&str>) -> ApplicationResult<()> {
        let Some(position) = self.tree.resolve_parent(parent)? else {
            return Ok(());
        };
        match self.tree.get(position) {
            Some(node) if node.node_type() == NodeType::Group => Ok(()),
            Some(node) => Err(DomainError::ParentNotGroup(node.name().to_string()).into()),
            None => Err(DomainError::ParentNotFound(parent.unwrap_or_default().to_string()).into()),
        }
    }

    fn install_node(&mut self, index: usize, plan: Option<&WeightPlan>) {
        if let Some(params) = self.tree.get(index).and_then(Node::local_params).cloned() {
            drivers::ensure_properties(&mut self.host, &params);
        }
        match plan {
            Some(plan) => drivers::install_weight(&mut self.host, plan),
            None => debug!(index, "no weight plan, node parameters unresolved"),
        }
    }

    fn install_value(&mut self, index: usize) -> Option<ValueDriverOutcome> {
        let node = self.tree.get(index)?;
        let params = self.tree.params(&self.host, index)?;
        let shape = node.name().to_string();
        Some(drivers::install_value(&mut self.host, &shape, &params))
    }

    /// Adds a group node named after the configured base name.
    #[instrument(level = "debug", skip(self))]
    pub fn add_group(&mut self, parent: Option<&str>) -> ApplicationResult<Inserted> {
        self.require_group_parent(parent)?;
        let request = NodeRequest::group(self.naming.group_name.clone(), parent);
        let inserted = self.tree.insert(&self.host, request)?;
        self.install_node(inserted.index, inserted.plan.as_ref());
        Ok(inserted)
    }

    /// Adds a shape key node for `shape`, or for a newly created shape when
    /// `shape` is `None`.
    #[instrument(level = "debug", skip(self))]
    pub fn add_shapekey(&mut self, parent: Option<&str>, shape: Option<&str>) -> ApplicationResult<AddedShape> {
        self.require_group_parent(parent)?;
        let (name, created_shape) = match shape {
            Some(shape) if self.host.has_shape(shape) => (shape.to_string(), false),
            Some(shape) => return Err(DomainError::ShapeNotFound(shape.to_string()).into()),
            None => (self.tree.names(&self.host).unique(&self.naming.shape_name), true),
        };

        let request = NodeRequest::shapekey(name.clone(), parent);
        self.tree.check_insert(&self.host, &request)?;
        if created_shape {
            self.host.add_shape(&name);
        }

        let inserted = self.tree.insert(&self.host, request)?;
        self.install_node(inserted.index, inserted.plan.as_ref());
        let value_driver = match self.install_value(inserted.index) {
            Some(outcome) => outcome,
            None => return Err(DomainError::NodeNotFound(name).into()),
        };
        Ok(AddedShape {
            inserted,
            created_shape,
            value_driver,
        })
    }

    /// Adds a node of any kind. Delegating kinds point at `request.data_path`
    /// and may be orphaned from the start.
    #[instrument(level = "debug", skip(self))]
    pub fn insert(&mut self, request: NodeRequest) -> ApplicationResult<Inserted> {
        let node_type = request.node_type;
        if node_type == NodeType::Shapekey && !self.host.has_shape(&request.name) {
            return Err(DomainError::ShapeNotFound(request.name).into());
        }
        let inserted = self.tree.insert(&self.host, request)?;
        self.install_node(inserted.index, inserted.plan.as_ref());
        if node_type == NodeType::Shapekey {
            self.install_value(inserted.index);
        }
        Ok(inserted)
    }

    /// Renames a node. Shape nodes take their host shape and its value driver
    /// along.
    #[instrument(level = "debug", skip(self))]
    pub fn rename(&mut self, name: &str, value: &str) -> ApplicationResult<NodeRenamed> {
        let event = self.tree.rename(&self.host, name, value)?;
        if event.node_type.is_shape()
            && event.changed()
            && drivers::sync_shape_rename(&mut self.host, &event.previous_value, &event.value)
        {
            debug!(from = %event.previous_value, to = %event.value, "renamed host shape");
        }
        Ok(event)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, name: &str, parent: Option<&str>) -> ApplicationResult<Moved> {
        let moved = self.tree.move_to(&self.host, name, parent)?;
        match &moved.plan {
            Some(plan) => drivers::install_weight(&mut self.host, plan),
            None if moved.reparented => {
                warn!(name, "node parameters unresolved, weight driver not regenerated")
            }
            None => {}
        }
        Ok(moved)
    }

    pub fn reorder(&mut self, name: &str, direction: Direction) -> ApplicationResult<usize> {
        Ok(self.tree.reorder(name, direction)?)
    }

    /// Deletes a shape on the host side only. Nodes naming it stay in the
    /// tree and become invalid.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_shape(&mut self, name: &str) -> ApplicationResult<Shape> {
        let shape = self
            .host
            .remove_shape(name)
            .ok_or_else(|| DomainError::ShapeNotFound(name.to_string()))?;
        self.host.remove_driver(&shape_value_path(name));
        Ok(shape)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn is_valid(&self, name: &str) -> ApplicationResult<bool> {
        let node = self.node(name)?;
        Ok(self.tree.is_valid(&self.host, node.index()))
    }

    /// Nodes whose backing shape or data object is gone.
    pub fn orphans(&self) -> Vec<&Node> {
        self.tree
            .nodes()
            .iter()
            .filter(|n| !self.tree.is_valid(&self.host, n.index()))
            .collect()
    }

    pub fn node(&self, name: &str) -> ApplicationResult<&Node> {
        self.tree
            .find(name)
            .ok_or_else(|| DomainError::NodeNotFound(name.to_string()).into())
    }

    pub fn report(&self, name: &str) -> ApplicationResult<NodeReport> {
        let node = self.node(name)?;
        let index = node.index();
        let nav = self.tree.navigator();
        let names = |nodes: Vec<&Node>| -> Vec<String> {
            nodes.into_iter().map(|n| n.name().to_string()).collect()
        };

        let parent = nav.parent(index);
        let siblings: Vec<&Node> = match parent {
            Some(p) => nav.children(p.index()),
            None => nav.roots(),
        };
        Ok(NodeReport {
            index,
            depth: node.depth(),
            name: node.name().to_string(),
            node_type: node.node_type(),
            parent: parent.map(|p| p.name().to_string()),
            ancestors: names(nav.ancestors(index)),
            children: names(nav.children(index)),
            siblings: names(siblings.into_iter().filter(|s| s.index() != index).collect()),
            subtree: nav.subtree(index).iter().map(|n| n.name().to_string()).collect(),
            valid: self.tree.is_valid(&self.host, index),
            orphaned: self.tree.orphaned(&self.host, index),
            data_path: node.data_path().map(str::to_string),
            params: self.tree.params(&self.host, index),
            shape: self.tree.shape(&self.host, index).cloned(),
        })
    }
}
