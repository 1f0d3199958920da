//! Read-only hierarchy queries over the flat node sequence.
//!
//! All queries are bounded scans from the node's position: parent and sibling
//! lookups walk until the depth drops below the node's own, subtree queries
//! stop at the first node that is not deeper.

use crate::domain::node::Node;

#[derive(Debug, Clone, Copy)]
pub struct TreeNavigator<'a> {
    nodes: &'a [Node],
}

impl<'a> TreeNavigator<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        Self { nodes }
    }

    pub fn get(&self, index: usize) -> Option<&'a Node> {
        self.nodes.get(index)
    }

    /// Nearest preceding node one level up. `None` for root nodes.
    pub fn parent(&self, index: usize) -> Option<&'a Node> {
        let depth = self.nodes.get(index)?.depth.checked_sub(1)?;
        self.nodes[..index].iter().rev().find(|n| n.depth == depth)
    }

    /// Immediate children, in order.
    pub fn children(&self, index: usize) -> Vec<&'a Node> {
        let Some(node) = self.nodes.get(index) else {
            return Vec::new();
        };
        let depth = node.depth + 1;
        self.nodes[index + 1..]
            .iter()
            .take_while(|n| n.depth >= depth)
            .filter(|n| n.depth == depth)
            .collect()
    }

    pub fn first_child(&self, index: usize) -> Option<&'a Node> {
        let node = self.nodes.get(index)?;
        self.nodes
            .get(index + 1)
            .filter(|next| next.depth == node.depth + 1)
    }

    pub fn last_child(&self, index: usize) -> Option<&'a Node> {
        self.children(index).pop()
    }

    pub fn next_sibling(&self, index: usize) -> Option<&'a Node> {
        let depth = self.nodes.get(index)?.depth;
        self.nodes[index + 1..]
            .iter()
            .take_while(|n| n.depth >= depth)
            .find(|n| n.depth == depth)
    }

    pub fn previous_sibling(&self, index: usize) -> Option<&'a Node> {
        let depth = self.nodes.get(index)?.depth;
        self.nodes[..index]
            .iter()
            .rev()
            .take_while(|n| n.depth >= depth)
            .find(|n| n.depth == depth)
    }

    /// Exclusive end position of the subtree rooted at `index`.
    pub fn subtree_end(&self, index: usize) -> usize {
        let depth = self.nodes[index].depth;
        self.nodes[index + 1..]
            .iter()
            .position(|n| n.depth <= depth)
            .map_or(self.nodes.len(), |offset| index + 1 + offset)
    }

    /// The node itself followed by all of its descendants.
    pub fn subtree(&self, index: usize) -> &'a [Node] {
        if index >= self.nodes.len() {
            return &[];
        }
        &self.nodes[index..self.subtree_end(index)]
    }

    pub fn last_descendant(&self, index: usize) -> Option<&'a Node> {
        match self.subtree(index) {
            [_, .., last] => Some(last),
            _ => None,
        }
    }

    /// Ancestor chain, nearest first.
    pub fn ancestors(&self, index: usize) -> Vec<&'a Node> {
        let mut chain = Vec::new();
        let mut current = self.parent(index);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node.index);
        }
        chain
    }

    pub fn roots(&self) -> Vec<&'a Node> {
        self.nodes.iter().filter(|n| n.depth == 0).collect()
    }

    pub fn is_parent_of(&self, a: usize, b: usize) -> bool {
        self.parent(b).is_some_and(|p| p.index == a)
    }

    pub fn is_child_of(&self, a: usize, b: usize) -> bool {
        self.is_parent_of(b, a)
    }

    pub fn is_ancestor_of(&self, a: usize, b: usize) -> bool {
        a < b && a < self.nodes.len() && b < self.subtree_end(a)
    }

    pub fn is_descendant_of(&self, a: usize, b: usize) -> bool {
        self.is_ancestor_of(b, a)
    }

    /// Distinct nodes sharing a parent (or both at the root).
    pub fn is_sibling_of(&self, a: usize, b: usize) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        self.parent(a).map(|p| p.index) == self.parent(b).map(|p| p.index)
    }
}
