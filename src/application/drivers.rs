//! Installing planner output on the host as drivers.

use tracing::{debug, warn};

use crate::domain::node::property_path;
use crate::domain::{shape_value_path, ShapeHost, WeightParams, WeightPlan, WeightPropagationPlanner};

/// What happened to a shape's value driver when a shape key node was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDriverOutcome {
    /// A new `w` driver now mirrors the node weight onto the shape value.
    Installed,
    /// A pre-existing driver was moved onto the node's influence property.
    Retargeted,
    /// A pose/cone driver owns the shape value and was left alone.
    FrameworkOwned,
}

/// Creates a node's own influence and weight properties.
pub fn ensure_properties<H: ShapeHost + ?Sized>(host: &mut H, params: &WeightParams) {
    host.ensure_property(&params.influence);
    host.ensure_property(&params.weight);
}

pub fn install_weight<H: ShapeHost + ?Sized>(host: &mut H, plan: &WeightPlan) {
    let driver = plan.to_driver(host.key_name());
    debug!(path = %driver.data_path, expression = %driver.expression, "installing weight driver");
    host.set_driver(driver);
}

/// Connects a shape's value to a node. A foreign driver already on the shape
/// value keeps its inputs but drives the node's influence instead.
pub fn install_value<H: ShapeHost + ?Sized>(
    host: &mut H,
    shape: &str,
    params: &WeightParams,
) -> ValueDriverOutcome {
    let value_path = shape_value_path(shape);
    let key = host.key_name().to_string();

    let framework_owned = host
        .driver(&value_path)
        .map(|existing| existing.is_framework_owned(&key));
    match framework_owned {
        Some(true) => {
            warn!(shape, "shape value is driven by a pose driver, leaving it untouched");
            ValueDriverOutcome::FrameworkOwned
        }
        Some(false) => {
            if let Some(mut driver) = host.remove_driver(&value_path) {
                driver.data_path = property_path(&params.influence);
                debug!(shape, path = %driver.data_path, "retargeting existing driver");
                host.set_driver(driver);
            }
            ValueDriverOutcome::Retargeted
        }
        None => {
            let driver = WeightPropagationPlanner::plan_value(shape, params).to_driver(&key);
            debug!(shape, "installing value driver");
            host.set_driver(driver);
            ValueDriverOutcome::Installed
        }
    }
}

/// Renames the host shape behind a node and moves its value driver along.
/// Returns false when the host has no shape called `from`.
pub fn sync_shape_rename<H: ShapeHost + ?Sized>(host: &mut H, from: &str, to: &str) -> bool {
    if !host.rename_shape(from, to) {
        return false;
    }
    if let Some(mut driver) = host.remove_driver(&shape_value_path(from)) {
        driver.data_path = shape_value_path(to);
        host.set_driver(driver);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Driver, DriverVariable, HostCapabilities, ShapeSource};
    use crate::infrastructure::KeyDocument;

    fn key_with(shape: &str) -> KeyDocument {
        let mut key = KeyDocument::new("Key", HostCapabilities::all());
        key.add_shape(shape);
        key
    }

    fn foreign_driver(shape: &str, variable: &str) -> Driver {
        Driver {
            data_path: shape_value_path(shape),
            expression: variable.to_string(),
            variables: vec![DriverVariable::key_property(
                variable,
                "Key",
                "reference_key.value".to_string(),
            )],
        }
    }

    #[test]
    fn test_install_value_creates_driver() {
        let mut key = key_with("Brow");
        let params = WeightParams::for_uid("st", 0);
        assert_eq!(install_value(&mut key, "Brow", &params), ValueDriverOutcome::Installed);
        let driver = key.driver("key_blocks[\"Brow\"].value").unwrap();
        assert_eq!(driver.expression, "w");
    }

    #[test]
    fn test_install_value_retargets_foreign_driver() {
        let mut key = key_with("Brow");
        key.set_driver(foreign_driver("Brow", "var"));
        let params = WeightParams::for_uid("st", 4);

        assert_eq!(install_value(&mut key, "Brow", &params), ValueDriverOutcome::Retargeted);
        assert!(key.driver("key_blocks[\"Brow\"].value").is_none());
        let moved = key.driver("[\"st_4_influence\"]").unwrap();
        assert_eq!(moved.expression, "var");
    }

    #[test]
    fn test_install_value_leaves_framework_driver() {
        let mut key = key_with("Brow");
        let driver = foreign_driver("Brow", "pose_driven_0");
        key.set_driver(driver.clone());

        let outcome = install_value(&mut key, "Brow", &WeightParams::for_uid("st", 1));
        assert_eq!(outcome, ValueDriverOutcome::FrameworkOwned);
        assert_eq!(key.driver("key_blocks[\"Brow\"].value"), Some(&driver));
    }

    #[test]
    fn test_sync_shape_rename_moves_value_driver() {
        let mut key = key_with("Brow");
        install_value(&mut key, "Brow", &WeightParams::for_uid("st", 0));

        assert!(sync_shape_rename(&mut key, "Brow", "BrowUp"));
        assert!(key.has_shape("BrowUp"));
        assert!(key.driver("key_blocks[\"BrowUp\"].value").is_some());
        assert!(key.driver("key_blocks[\"Brow\"].value").is_none());
        assert!(!sync_shape_rename(&mut key, "Brow", "Other"));
    }
}
