//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::{Capability, NodeType};

/// Broad classification of a domain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced node or shape does not exist.
    NotFound,
    /// The requested placement is rejected by type or capability rules.
    InvalidPlacement,
    /// A persisted sequence violates the tree invariants.
    Corrupt,
}

/// Domain errors represent rejected tree operations.
///
/// Every variant is raised before the tree is touched, so a returned error
/// always means the tree is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("parent \"{0}\" not found")]
    ParentNotFound(String),

    #[error("parent \"{0}\" must be a group node")]
    ParentNotGroup(String),

    #[error("shape \"{0}\" not found")]
    ShapeNotFound(String),

    #[error("node \"{0}\" not found")]
    NodeNotFound(String),

    #[error("{child} node cannot be placed {}", placement(.parent))]
    InvalidPlacement {
        parent: Option<NodeType>,
        child: NodeType,
    },

    #[error("{node_type} nodes need {capability} support, which the shape key does not provide")]
    UnsupportedCapability {
        node_type: NodeType,
        capability: Capability,
    },

    #[error("name \"{0}\" is already used by a node")]
    NameInUse(String),

    #[error("cannot move \"{node}\": {reason}")]
    InvalidMove { node: String, reason: String },

    #[error("corrupt tree at index {index}: {message}")]
    CorruptTree { index: usize, message: String },
}

fn placement(parent: &Option<NodeType>) -> String {
    match parent {
        Some(t) => format!("under a {t} node"),
        None => "at the root".to_string(),
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ParentNotFound(_)
            | DomainError::ShapeNotFound(_)
            | DomainError::NodeNotFound(_) => ErrorKind::NotFound,
            DomainError::ParentNotGroup(_)
            | DomainError::InvalidPlacement { .. }
            | DomainError::UnsupportedCapability { .. }
            | DomainError::NameInUse(_)
            | DomainError::InvalidMove { .. } => ErrorKind::InvalidPlacement,
            DomainError::CorruptTree { .. } => ErrorKind::Corrupt,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
