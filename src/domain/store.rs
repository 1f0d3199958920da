//! Flat, depth-annotated node storage.
//!
//! The sequence is a pre-order flattening of the tree: hierarchy is implied by
//! position and depth alone, and every node's `index` mirrors its position.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::navigator::TreeNavigator;
use crate::domain::node::Node;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct OrderedNodeStore {
    nodes: Vec<Node>,
}

impl OrderedNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a persisted sequence, checking the structural invariants.
    pub fn from_nodes(nodes: Vec<Node>) -> DomainResult<Self> {
        let mut names = HashSet::new();
        let mut previous_depth: Option<usize> = None;
        for (position, node) in nodes.iter().enumerate() {
            let corrupt = |message: String| DomainError::CorruptTree {
                index: position,
                message,
            };
            if node.index != position {
                return Err(corrupt(format!("stored index {}", node.index)));
            }
            let max_depth = previous_depth.map_or(0, |d| d + 1);
            if node.depth > max_depth {
                return Err(corrupt(format!(
                    "depth {} exceeds maximum {max_depth}",
                    node.depth
                )));
            }
            if !names.insert(node.name.as_str()) {
                return Err(corrupt(format!("duplicate name \"{}\"", node.name)));
            }
            previous_depth = Some(node.depth);
        }
        Ok(Self { nodes })
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    /// Position of the node called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        self.position(name).map(|i| &self.nodes[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn navigator(&self) -> TreeNavigator<'_> {
        TreeNavigator::new(&self.nodes)
    }

    /// Position a new child of `parent` should take: right after the parent's
    /// last descendant. Root-level inserts go to the end.
    ///
    /// # Panics
    /// If `parent` is not a position in the store.
    pub fn insertion_point(&self, parent: Option<usize>) -> usize {
        match parent {
            Some(p) => {
                assert!(p < self.nodes.len(), "parent position {p} is not in the store");
                self.navigator().subtree_end(p)
            }
            None => self.nodes.len(),
        }
    }

    /// Appends `node` at the end of the sequence and returns its position.
    pub(crate) fn push(&mut self, mut node: Node) -> usize {
        let index = self.nodes.len();
        node.index = index;
        self.nodes.push(node);
        index
    }

    /// Inserts `node` at `position`, shifting everything after it by one.
    ///
    /// # Panics
    /// If `position > count()`.
    #[instrument(level = "trace", skip(self, node), fields(name = %node.name))]
    pub(crate) fn insert_at(&mut self, position: usize, node: Node) {
        self.nodes.insert(position, node);
        self.renumber(position..self.nodes.len());
    }

    /// Relocates the node at `from` to `to`, renumbering every node in between.
    ///
    /// # Panics
    /// If either position is out of range.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn move_node(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let node = self.nodes.remove(from);
        self.nodes.insert(to, node);
        self.renumber(from.min(to)..from.max(to) + 1);
    }

    /// Relocates a contiguous block of nodes and shifts their depths.
    ///
    /// `to` is a position in the sequence with the block already removed.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn move_range(&mut self, range: Range<usize>, to: usize, depth_delta: isize) {
        let start = range.start;
        let mut block: Vec<Node> = self.nodes.drain(range).collect();
        for node in &mut block {
            node.depth = node.depth.saturating_add_signed(depth_delta);
        }
        let len = block.len();
        self.nodes.splice(to..to, block);
        let first = start.min(to);
        let last = (start.max(to) + len).min(self.nodes.len());
        self.renumber(first..last);
    }

    pub(crate) fn set_depth(&mut self, index: usize, depth: usize) {
        self.nodes[index].depth = depth;
    }

    fn renumber(&mut self, range: Range<usize>) {
        trace!(?range, "renumbering");
        for i in range {
            self.nodes[i].index = i;
        }
    }
}

impl TryFrom<Vec<Node>> for OrderedNodeStore {
    type Error = DomainError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<OrderedNodeStore> for Vec<Node> {
    fn from(store: OrderedNodeStore) -> Self {
        store.nodes
    }
}
