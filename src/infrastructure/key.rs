//! In-memory shape key: the reference host used by the CLI and tests.
//!
//! Stores shapes, numeric custom properties, drivers, and host-owned data
//! objects addressed by data path. It also evaluates the product-only
//! expressions the planner emits, standing in for the host's driver engine.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{
    shape_value_path, Driver, HostCapabilities, Shape, ShapeHost, ShapeSource, WeightParams,
};

/// Default value of newly created properties.
pub const PROPERTY_DEFAULT: f64 = 1.0;

/// Driver chains deeper than this are treated as cycles.
const MAX_EVAL_DEPTH: usize = 64;

fn property_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\["([^"]+)"\]$"#).expect("valid regex"))
}

fn shape_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^key_blocks\["([^"]+)"\]\.value$"#).expect("valid regex"))
}

/// Shape name addressed by a `key_blocks["<name>"].value` path.
pub fn shape_of_value_path(path: &str) -> Option<&str> {
    shape_value_regex()
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDocument {
    pub name: String,
    #[serde(default)]
    pub capabilities: HostCapabilities,
    #[serde(default)]
    shapes: Vec<Shape>,
    #[serde(default)]
    properties: BTreeMap<String, f64>,
    #[serde(default)]
    drivers: Vec<Driver>,
    /// Host-owned data objects that delegating nodes point at.
    #[serde(default)]
    components: BTreeMap<String, WeightParams>,
}

impl KeyDocument {
    pub fn new(name: &str, capabilities: HostCapabilities) -> Self {
        Self {
            name: name.to_string(),
            capabilities,
            shapes: Vec::new(),
            properties: BTreeMap::new(),
            drivers: Vec::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn properties(&self) -> &BTreeMap<String, f64> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub fn set_property(&mut self, name: &str, value: f64) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn set_shape_value(&mut self, name: &str, value: f64) -> bool {
        match self.shapes.iter_mut().find(|s| s.name == name) {
            Some(shape) => {
                shape.value = value;
                true
            }
            None => false,
        }
    }

    /// Registers a host-owned data object under `data_path`, creating its
    /// properties.
    pub fn add_component(&mut self, data_path: &str, params: WeightParams) {
        self.ensure_property(&params.influence);
        self.ensure_property(&params.weight);
        self.components.insert(data_path.to_string(), params);
    }

    pub fn remove_component(&mut self, data_path: &str) -> Option<WeightParams> {
        self.components.remove(data_path)
    }

    /// Current value of a property, following any driver attached to it.
    pub fn evaluate_property(&self, name: &str) -> Option<f64> {
        self.evaluate_path(&crate::domain::node::property_path(name), 0)
    }

    /// Current value of a shape, following any driver attached to it.
    pub fn evaluate_shape(&self, name: &str) -> Option<f64> {
        self.evaluate_path(&shape_value_path(name), 0)
    }

    fn evaluate_path(&self, path: &str, depth: usize) -> Option<f64> {
        if depth > MAX_EVAL_DEPTH {
            debug!(path, "driver chain too deep");
            return None;
        }
        if let Some(driver) = self.driver(path) {
            return self.evaluate_driver(driver, depth + 1);
        }
        if let Some(caps) = property_path_regex().captures(path) {
            return self.property(&caps[1]);
        }
        shape_of_value_path(path)
            .and_then(|shape| self.shape(shape))
            .map(|s| s.value)
    }

    /// Evaluates expressions of the form `a*b*...` over driver variables.
    fn evaluate_driver(&self, driver: &Driver, depth: usize) -> Option<f64> {
        let mut product = 1.0;
        for token in driver.expression.split('*').map(str::trim) {
            let variable = driver.variables.iter().find(|v| v.name == token);
            let Some(variable) = variable else {
                trace!(token, expression = %driver.expression, "unsupported expression term");
                return None;
            };
            product *= self.evaluate_path(&variable.target.data_path, depth)?;
        }
        Some(product)
    }
}

impl ShapeSource for KeyDocument {
    fn key_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    fn resolve(&self, data_path: &str) -> Option<WeightParams> {
        self.components.get(data_path).cloned()
    }
}

impl ShapeHost for KeyDocument {
    fn add_shape(&mut self, name: &str) -> &Shape {
        debug!(name, "adding shape");
        self.shapes.push(Shape {
            name: name.to_string(),
            value: 0.0,
        });
        let last = self.shapes.len() - 1;
        &self.shapes[last]
    }

    fn remove_shape(&mut self, name: &str) -> Option<Shape> {
        let position = self.shapes.iter().position(|s| s.name == name)?;
        Some(self.shapes.remove(position))
    }

    fn rename_shape(&mut self, from: &str, to: &str) -> bool {
        match self.shapes.iter_mut().find(|s| s.name == from) {
            Some(shape) => {
                shape.name = to.to_string();
                true
            }
            None => false,
        }
    }

    fn ensure_property(&mut self, name: &str) {
        self.properties
            .entry(name.to_string())
            .or_insert(PROPERTY_DEFAULT);
    }

    fn driver(&self, data_path: &str) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.data_path == data_path)
    }

    fn driver_mut(&mut self, data_path: &str) -> Option<&mut Driver> {
        self.drivers.iter_mut().find(|d| d.data_path == data_path)
    }

    fn set_driver(&mut self, driver: Driver) {
        match self.driver_mut(&driver.data_path) {
            Some(existing) => *existing = driver,
            None => self.drivers.push(driver),
        }
    }

    fn remove_driver(&mut self, data_path: &str) -> Option<Driver> {
        let position = self.drivers.iter().position(|d| d.data_path == data_path)?;
        Some(self.drivers.remove(position))
    }
}
