//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services are generic over the host trait, not trait objects themselves.

mod tree;

pub use tree::{AddedShape, NamingOptions, NodeReport, ShapeTreeService};
