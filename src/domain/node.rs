//! Tree node model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The five kinds of shape tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Group,
    Xyz,
    Shapekey,
    Combination,
    Inbetween,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Group,
        NodeType::Xyz,
        NodeType::Shapekey,
        NodeType::Combination,
        NodeType::Inbetween,
    ];

    /// Identifier used in persisted documents and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Group => "GROUP",
            NodeType::Xyz => "XYZ",
            NodeType::Shapekey => "SHAPEKEY",
            NodeType::Combination => "COMBINATION",
            NodeType::Inbetween => "INBETWEEN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Group => "Group",
            NodeType::Xyz => "XYZ Group",
            NodeType::Shapekey => "Shape Key",
            NodeType::Combination => "Combination",
            NodeType::Inbetween => "In-Between",
        }
    }

    /// Shape nodes wrap a shape on the host key.
    pub fn is_shape(&self) -> bool {
        !matches!(self, NodeType::Group)
    }

    /// Groups and shape keys own their parameters; the rest delegate through `data_path`.
    pub fn is_self_describing(&self) -> bool {
        matches!(self, NodeType::Group | NodeType::Shapekey)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown node type: {s}"))
    }
}

/// Optional host features some node kinds depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SplitAxis,
    Combination,
    InBetween,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::SplitAxis,
        Capability::Combination,
        Capability::InBetween,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SplitAxis => "split_axis",
            Capability::Combination => "combination",
            Capability::InBetween => "in_between",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Capability::SplitAxis => "split axis interpolation",
            Capability::Combination => "combination shape",
            Capability::InBetween => "in-between shape",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// Names of the numeric parameters that carry a node's influence and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightParams {
    pub influence: String,
    pub weight: String,
}

impl WeightParams {
    pub fn for_uid(prefix: &str, uid: u64) -> Self {
        Self {
            influence: format!("{prefix}_{uid}_influence"),
            weight: format!("{prefix}_{uid}_weight"),
        }
    }

    /// Host data path of the influence parameter.
    pub fn influence_path(&self) -> String {
        property_path(&self.influence)
    }

    /// Host data path of the weight parameter.
    pub fn weight_path(&self) -> String {
        property_path(&self.weight)
    }
}

/// Data path of a custom property stored on the key.
pub fn property_path(name: &str) -> String {
    format!("[\"{name}\"]")
}

/// Where a node's influence and weight parameters live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSource {
    /// Parameters created alongside the node.
    Local(WeightParams),
    /// Parameters owned by a host object reachable through `data_path`.
    Linked { data_path: String },
}

/// One entry of the flat ordered tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) node_type: NodeType,
    pub(crate) depth: usize,
    pub(crate) index: usize,
    pub(crate) uid: u64,
    #[serde(default = "default_expanded")]
    pub show_expanded: bool,
    pub(crate) source: NodeSource,
}

fn default_expanded() -> bool {
    true
}

impl Node {
    /// Creates a detached node; depth and index are assigned on insertion.
    pub(crate) fn new(name: String, node_type: NodeType, uid: u64, source: NodeSource) -> Self {
        Self {
            name,
            node_type,
            depth: 0,
            index: 0,
            uid,
            show_expanded: true,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn source(&self) -> &NodeSource {
        &self.source
    }

    pub fn is_shape(&self) -> bool {
        self.node_type.is_shape()
    }

    /// Host path of the backing data object, for delegating kinds.
    pub fn data_path(&self) -> Option<&str> {
        match &self.source {
            NodeSource::Linked { data_path } => Some(data_path),
            NodeSource::Local(_) => None,
        }
    }

    /// Parameters owned by the node itself, if it is self-describing.
    pub fn local_params(&self) -> Option<&WeightParams> {
        match &self.source {
            NodeSource::Local(params) => Some(params),
            NodeSource::Linked { .. } => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_parse_is_case_insensitive() {
        assert_eq!("group".parse::<NodeType>().unwrap(), NodeType::Group);
        assert_eq!("INBETWEEN".parse::<NodeType>().unwrap(), NodeType::Inbetween);
        assert!("bone".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_weight_params_paths() {
        let params = WeightParams::for_uid("shape_tree", 4);
        assert_eq!(params.influence, "shape_tree_4_influence");
        assert_eq!(params.weight_path(), "[\"shape_tree_4_weight\"]");
    }

    #[test]
    fn test_only_group_is_not_a_shape() {
        let shapes: Vec<_> = NodeType::ALL.iter().filter(|t| t.is_shape()).collect();
        assert_eq!(shapes.len(), 4);
        assert!(!NodeType::Group.is_shape());
    }
}
