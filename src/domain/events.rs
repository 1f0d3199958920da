//! Notifications emitted by tree mutations.

use crate::domain::node::NodeType;

/// A node was renamed. `value` is the name actually stored after uniqueness
/// resolution; `requested` is what the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRenamed {
    pub index: usize,
    pub uid: u64,
    pub node_type: NodeType,
    pub value: String,
    pub previous_value: String,
    pub requested: String,
}

impl NodeRenamed {
    pub fn changed(&self) -> bool {
        self.value != self.previous_value
    }
}

/// Subscriber to rename notifications.
pub trait RenameListener {
    fn node_renamed(&mut self, event: &NodeRenamed);
}

impl<F> RenameListener for F
where
    F: FnMut(&NodeRenamed),
{
    fn node_renamed(&mut self, event: &NodeRenamed) {
        self(event)
    }
}
