//! Host boundary traits.
//!
//! The tree never owns the shape data it annotates. These traits describe the
//! slice of the host's key the domain reads from and the application writes to,
//! allowing the domain to be tested against an in-memory key.

use serde::{Deserialize, Serialize};

use crate::domain::driver::Driver;
use crate::domain::node::WeightParams;
use crate::domain::rules::HostCapabilities;

/// A deformation target on the host key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    #[serde(default)]
    pub value: f64,
}

/// Read-only view of the host key.
pub trait ShapeSource {
    /// Identifier of the key datablock, used as driver target id.
    fn key_name(&self) -> &str;

    fn capabilities(&self) -> &HostCapabilities;

    fn shape(&self, name: &str) -> Option<&Shape>;

    fn has_shape(&self, name: &str) -> bool {
        self.shape(name).is_some()
    }

    /// Resolves a data path to the parameters of a host-owned object.
    /// Unresolvable paths yield `None`, never an error.
    fn resolve(&self, data_path: &str) -> Option<WeightParams>;
}

/// Mutable access to the host key, used by application services.
pub trait ShapeHost: ShapeSource {
    /// Adds a shape with exactly `name`. Callers make the name unique first.
    fn add_shape(&mut self, name: &str) -> &Shape;

    fn remove_shape(&mut self, name: &str) -> Option<Shape>;

    fn rename_shape(&mut self, from: &str, to: &str) -> bool;

    /// Creates a numeric custom property if it does not exist yet.
    fn ensure_property(&mut self, name: &str);

    fn driver(&self, data_path: &str) -> Option<&Driver>;

    fn driver_mut(&mut self, data_path: &str) -> Option<&mut Driver>;

    /// Installs `driver`, replacing any driver on the same path.
    fn set_driver(&mut self, driver: Driver);

    fn remove_driver(&mut self, data_path: &str) -> Option<Driver>;
}
