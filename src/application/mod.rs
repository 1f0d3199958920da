//! Application layer: services and use cases
//!
//! This layer orchestrates the domain tree against a host and installs the
//! drivers the weight planner asks for.

pub mod drivers;
pub mod error;
pub mod services;

pub use drivers::ValueDriverOutcome;
pub use error::{ApplicationError, ApplicationResult};
