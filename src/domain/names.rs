//! Unique naming across tree nodes and host shapes.

use tracing::trace;

use crate::domain::host::ShapeSource;
use crate::domain::store::OrderedNodeStore;

/// Width of the numeric suffix appended on collision (`Group.001`).
pub const SUFFIX_WIDTH: usize = 3;

/// The combined namespace of a tree: its node names plus the host's shape names.
pub struct NameRegistry<'a> {
    nodes: &'a OrderedNodeStore,
    shapes: &'a dyn ShapeSource,
}

impl<'a> NameRegistry<'a> {
    pub fn new(nodes: &'a OrderedNodeStore, shapes: &'a dyn ShapeSource) -> Self {
        Self { nodes, shapes }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.position(name).is_some() || self.shapes.has_shape(name)
    }

    /// Returns `name` if free, otherwise `name.NNN` with the lowest free NNN.
    pub fn unique(&self, name: &str) -> String {
        unique_name(name, |candidate| self.contains(candidate))
    }
}

/// Suffixing scheme shared by every namespace check.
pub fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut value = name.to_string();
    let mut counter = 0usize;
    while taken(&value) {
        counter += 1;
        value = format!("{name}.{counter:0width$}", width = SUFFIX_WIDTH);
    }
    if counter > 0 {
        trace!(name, resolved = %value, "name collision resolved");
    }
    value
}
