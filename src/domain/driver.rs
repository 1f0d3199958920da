//! Driver records: the expressions handed to the host's evaluation engine.

use serde::{Deserialize, Serialize};

/// Variable name prefixes used by the pose-driven shape key framework.
pub const FRAMEWORK_VARIABLE_PREFIXES: [&str; 2] = ["pose_driven_", "cone_based"];

/// Data path the framework's drivers read on the key.
pub const FRAMEWORK_TARGET_PATH: &str = "reference_key.value";

/// Kind of datablock a driver variable reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdType {
    Key,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverTarget {
    pub id_type: IdType,
    pub id: String,
    pub data_path: String,
}

/// A single-property driver variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverVariable {
    pub name: String,
    pub target: DriverTarget,
}

impl DriverVariable {
    /// Variable reading a property on the key identified by `key`.
    pub fn key_property(name: &str, key: &str, data_path: String) -> Self {
        Self {
            name: name.to_string(),
            target: DriverTarget {
                id_type: IdType::Key,
                id: key.to_string(),
                data_path,
            },
        }
    }
}

/// A scripted driver attached to `data_path` on the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Path of the driven property.
    pub data_path: String,
    pub expression: String,
    #[serde(default)]
    pub variables: Vec<DriverVariable>,
}

impl Driver {
    /// True when the driver belongs to the pose-driven framework and must not be
    /// rewired. Detection looks only at the first variable.
    pub fn is_framework_owned(&self, key: &str) -> bool {
        let Some(variable) = self.variables.first() else {
            return false;
        };
        if !FRAMEWORK_VARIABLE_PREFIXES
            .iter()
            .any(|prefix| variable.name.starts_with(prefix))
        {
            return false;
        }
        let target = &variable.target;
        target.id_type == IdType::Key && target.id == key && target.data_path == FRAMEWORK_TARGET_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_with(variable: &str, id: &str, path: &str) -> Driver {
        Driver {
            data_path: "key_blocks[\"Smile\"].value".into(),
            expression: variable.into(),
            variables: vec![DriverVariable::key_property(variable, id, path.into())],
        }
    }

    #[test]
    fn test_framework_driver_detected() {
        let driver = driver_with("pose_driven_0", "Key", FRAMEWORK_TARGET_PATH);
        assert!(driver.is_framework_owned("Key"));
        let driver = driver_with("cone_based_1", "Key", FRAMEWORK_TARGET_PATH);
        assert!(driver.is_framework_owned("Key"));
    }

    #[test]
    fn test_foreign_drivers_not_framework_owned() {
        assert!(!driver_with("var", "Key", FRAMEWORK_TARGET_PATH).is_framework_owned("Key"));
        assert!(!driver_with("pose_driven_0", "Other", FRAMEWORK_TARGET_PATH).is_framework_owned("Key"));
        assert!(!driver_with("pose_driven_0", "Key", "eval_time").is_framework_owned("Key"));

        let empty = Driver {
            data_path: "x".into(),
            expression: "1.0".into(),
            variables: vec![],
        };
        assert!(!empty.is_framework_owned("Key"));
    }
}
