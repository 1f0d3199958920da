//! Domain layer: the shape tree model and its algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).
//! The host key is reached only through the traits in [`host`].

pub mod driver;
pub mod error;
pub mod events;
pub mod host;
pub mod names;
pub mod navigator;
pub mod node;
pub mod rules;
pub mod store;
pub mod tree;
pub mod weight;

pub use driver::{Driver, DriverTarget, DriverVariable, IdType};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use events::{NodeRenamed, RenameListener};
pub use host::{Shape, ShapeHost, ShapeSource};
pub use names::NameRegistry;
pub use navigator::TreeNavigator;
pub use node::{Capability, Node, NodeSource, NodeType, WeightParams};
pub use rules::{HostCapabilities, NodeTypeRules};
pub use store::OrderedNodeStore;
pub use tree::{Direction, Inserted, Moved, NodeRequest, Orphaned, ShapeTree};
pub use weight::{shape_value_path, ValuePlan, WeightPlan, WeightPropagationPlanner};
