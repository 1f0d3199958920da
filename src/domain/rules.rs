//! Placement rules: which node kinds may hold which, and which host
//! capabilities each kind depends on.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Capability, NodeType};

/// Optional features offered by the host's shape key data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostCapabilities(BTreeSet<Capability>);

impl HostCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn remove(&mut self, capability: Capability) {
        self.0.remove(&capability);
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for HostCapabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Static compatibility table for node placement.
pub struct NodeTypeRules;

impl NodeTypeRules {
    /// Kinds permitted as direct children of `parent`.
    pub fn allowed_children(parent: NodeType) -> &'static [NodeType] {
        match parent {
            NodeType::Group => &[
                NodeType::Group,
                NodeType::Xyz,
                NodeType::Shapekey,
                NodeType::Combination,
            ],
            NodeType::Xyz => &[],
            NodeType::Shapekey | NodeType::Combination => &[NodeType::Inbetween],
            NodeType::Inbetween => &[NodeType::Inbetween],
        }
    }

    /// Root-level placement follows the group table; in-betweens need a shape above them.
    pub fn allows_child(parent: Option<NodeType>, child: NodeType) -> bool {
        let parent = parent.unwrap_or(NodeType::Group);
        Self::allowed_children(parent).contains(&child)
    }

    /// Host capability a kind depends on, if any.
    pub fn required_capability(node_type: NodeType) -> Option<Capability> {
        match node_type {
            NodeType::Group | NodeType::Shapekey => None,
            NodeType::Xyz => Some(Capability::SplitAxis),
            NodeType::Combination => Some(Capability::Combination),
            NodeType::Inbetween => Some(Capability::InBetween),
        }
    }

    pub fn is_usable(node_type: NodeType, capabilities: &HostCapabilities) -> bool {
        Self::required_capability(node_type).map_or(true, |c| capabilities.supports(c))
    }

    /// Checks a prospective placement. Runs before any mutation.
    pub fn check(
        parent: Option<NodeType>,
        child: NodeType,
        capabilities: &HostCapabilities,
    ) -> DomainResult<()> {
        if let Some(capability) = Self::required_capability(child) {
            if !capabilities.supports(capability) {
                return Err(DomainError::UnsupportedCapability {
                    node_type: child,
                    capability,
                });
            }
        }
        if !Self::allows_child(parent, child) {
            return Err(DomainError::InvalidPlacement { parent, child });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NodeType::Group, NodeType::Group, true)]
    #[case(NodeType::Group, NodeType::Xyz, true)]
    #[case(NodeType::Group, NodeType::Inbetween, false)]
    #[case(NodeType::Xyz, NodeType::Shapekey, false)]
    #[case(NodeType::Shapekey, NodeType::Inbetween, true)]
    #[case(NodeType::Shapekey, NodeType::Xyz, false)]
    #[case(NodeType::Combination, NodeType::Inbetween, true)]
    #[case(NodeType::Inbetween, NodeType::Inbetween, true)]
    fn test_child_table(#[case] parent: NodeType, #[case] child: NodeType, #[case] ok: bool) {
        assert_eq!(NodeTypeRules::allows_child(Some(parent), child), ok);
    }

    #[test]
    fn test_root_rejects_inbetween() {
        assert!(NodeTypeRules::allows_child(None, NodeType::Shapekey));
        assert!(!NodeTypeRules::allows_child(None, NodeType::Inbetween));
    }

    #[test]
    fn test_check_reports_missing_capability_first() {
        let err = NodeTypeRules::check(
            Some(NodeType::Shapekey),
            NodeType::Xyz,
            &HostCapabilities::none(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnsupportedCapability {
                node_type: NodeType::Xyz,
                capability: Capability::SplitAxis
            }
        );
    }

    #[test]
    fn test_group_and_shapekey_always_usable() {
        let none = HostCapabilities::none();
        assert!(NodeTypeRules::is_usable(NodeType::Group, &none));
        assert!(NodeTypeRules::is_usable(NodeType::Shapekey, &none));
        assert!(!NodeTypeRules::is_usable(NodeType::Combination, &none));
        assert!(NodeTypeRules::is_usable(
            NodeType::Combination,
            &HostCapabilities::all()
        ));
    }
}
