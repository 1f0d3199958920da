//! Infrastructure layer: reference host, persistence, and DI container
//!
//! This layer implements the host and I/O boundary traits and wires up services.

pub mod di;
pub mod document;
pub mod error;
pub mod key;
pub mod traits;

pub use document::{Document, DocumentStore};
pub use error::{InfraError, InfraResult};
pub use key::KeyDocument;
