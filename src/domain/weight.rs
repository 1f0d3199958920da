//! Weight propagation planning.
//!
//! A node's effective weight is its own influence multiplied by its parent's
//! effective weight. The planner decides which parameters feed that product;
//! evaluating it is left to the host.

use serde::{Deserialize, Serialize};

use crate::domain::driver::{Driver, DriverVariable};
use crate::domain::node::{property_path, WeightParams};

/// Variable bound to the node's own influence.
pub const INFLUENCE_VARIABLE: &str = "i";
/// Variable bound to the parent's weight, or to the node's weight in value plans.
pub const WEIGHT_VARIABLE: &str = "w";

/// Inputs of a node's weight expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightPlan {
    /// Weight parameter receiving the product.
    pub weight: String,
    /// The node's influence parameter.
    pub influence: String,
    /// The parent's weight parameter, absent for root nodes.
    pub parent_weight: Option<String>,
}

impl WeightPlan {
    /// Scripted form of the product: `i` at the root, `w*i` below a parent.
    pub fn expression(&self) -> String {
        match self.parent_weight {
            Some(_) => format!("{WEIGHT_VARIABLE}*{INFLUENCE_VARIABLE}"),
            None => INFLUENCE_VARIABLE.to_string(),
        }
    }

    /// Driver installing this plan on the key identified by `key`.
    pub fn to_driver(&self, key: &str) -> Driver {
        let mut variables = vec![DriverVariable::key_property(
            INFLUENCE_VARIABLE,
            key,
            property_path(&self.influence),
        )];
        if let Some(parent_weight) = &self.parent_weight {
            variables.push(DriverVariable::key_property(
                WEIGHT_VARIABLE,
                key,
                property_path(parent_weight),
            ));
        }
        Driver {
            data_path: property_path(&self.weight),
            expression: self.expression(),
            variables,
        }
    }
}

/// Inputs of a shape's value expression: the value simply mirrors the node's weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePlan {
    pub shape: String,
    pub weight: String,
}

impl ValuePlan {
    pub fn data_path(&self) -> String {
        shape_value_path(&self.shape)
    }

    pub fn to_driver(&self, key: &str) -> Driver {
        Driver {
            data_path: self.data_path(),
            expression: WEIGHT_VARIABLE.to_string(),
            variables: vec![DriverVariable::key_property(
                WEIGHT_VARIABLE,
                key,
                property_path(&self.weight),
            )],
        }
    }
}

/// Data path of a shape's scalar value on the key.
pub fn shape_value_path(shape: &str) -> String {
    format!("key_blocks[\"{shape}\"].value")
}

pub struct WeightPropagationPlanner;

impl WeightPropagationPlanner {
    /// Plans the weight expression of a node from its resolved parameters and
    /// those of its parent.
    pub fn plan(node: &WeightParams, parent: Option<&WeightParams>) -> WeightPlan {
        WeightPlan {
            weight: node.weight.clone(),
            influence: node.influence.clone(),
            parent_weight: parent.map(|p| p.weight.clone()),
        }
    }

    /// Plans the value expression of a shape driven by `node`'s weight.
    pub fn plan_value(shape: &str, node: &WeightParams) -> ValuePlan {
        ValuePlan {
            shape: shape.to_string(),
            weight: node.weight.clone(),
        }
    }

    /// Reference evaluation of the multiplicative rule over an ancestor chain
    /// given nearest-first, as the host engine would compute it.
    pub fn effective_weight(influence: f64, ancestor_influences: &[f64]) -> f64 {
        ancestor_influences.iter().fold(influence, |acc, i| acc * i)
    }
}
