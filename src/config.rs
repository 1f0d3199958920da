//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/shapetree/shapetree.toml`
//! 3. Local config: `<project_dir>/.shapetree.toml`
//! 4. Environment variables: `SHAPETREE_*` prefix

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{Capability, HostCapabilities};

/// Default document file name, relative to the project directory.
pub const DEFAULT_DOCUMENT: &str = "shapetree.toml";

/// Raw settings for intermediate parsing (arrays are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub document: Option<PathBuf>,
    pub group_name: Option<String>,
    pub shape_name: Option<String>,
    pub property_prefix: Option<String>,
    pub capabilities: Option<Vec<String>>,
}

/// Unified configuration for shapetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Document path; relative paths resolve against the project directory
    pub document: PathBuf,
    /// Base name of new group nodes
    pub group_name: String,
    /// Base name of newly created shapes
    pub shape_name: String,
    /// Prefix of generated influence/weight property names
    pub property_prefix: String,
    /// Host capabilities given to newly initialised documents
    pub capabilities: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            document: PathBuf::from(DEFAULT_DOCUMENT),
            group_name: "Group".into(),
            shape_name: "Key".into(),
            property_prefix: crate::domain::tree::DEFAULT_PROPERTY_PREFIX.into(),
            capabilities: Capability::ALL.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

/// Get the XDG config directory for shapetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shapetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("shapetree.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".shapetree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is kept as is.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: BTreeSet<String> = base.iter().cloned().collect();

        for item in overlay {
            if let Some(negated) = item.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(item.clone());
            }
        }

        result.into_iter().collect()
    }

    /// Parsed capability list. Unknown names were rejected at load time.
    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
            .iter()
            .filter_map(|c| c.parse::<Capability>().ok())
            .collect()
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        for name in &self.capabilities {
            name.parse::<Capability>()
                .map_err(|_| ApplicationError::Config {
                    message: format!("unknown capability: {name}"),
                })?;
        }
        for (field, value) in [
            ("group_name", &self.group_name),
            ("shape_name", &self.shape_name),
            ("property_prefix", &self.property_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(ApplicationError::Config {
                    message: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.document.to_string_lossy().as_ref());
        self.document = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            document: overlay.document.clone().unwrap_or_else(|| self.document.clone()),
            group_name: overlay.group_name.clone().unwrap_or_else(|| self.group_name.clone()),
            shape_name: overlay.shape_name.clone().unwrap_or_else(|| self.shape_name.clone()),
            property_prefix: overlay
                .property_prefix
                .clone()
                .unwrap_or_else(|| self.property_prefix.clone()),
            capabilities: overlay
                .capabilities
                .as_ref()
                .map(|o| Self::merge_array(&self.capabilities, o))
                .unwrap_or_else(|| self.capabilities.clone()),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            capabilities: global
                .capabilities
                .clone()
                .unwrap_or_else(|| self.capabilities.clone()),
            ..self.merge_with(&RawSettings {
                capabilities: None,
                ..global.clone()
            })
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), project_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config path.
    pub fn load_from(global: Option<&Path>, project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply SHAPETREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("SHAPETREE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("capabilities")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("document") {
            settings.document = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("group_name") {
            settings.group_name = val;
        }
        if let Ok(val) = config.get_string("shape_name") {
            settings.shape_name = val;
        }
        if let Ok(val) = config.get_string("property_prefix") {
            settings.property_prefix = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("capabilities") {
            settings.capabilities = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# shapetree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/shapetree/shapetree.toml  (defines your baseline)
#   Local:  <project>/.shapetree.toml           (project-specific additions)
#   Env:    SHAPETREE_* environment variables    (explicit overrides)
#
# Local config UNIONS capabilities with global; "!name" removes one:
#   capabilities = ["!in_between"]

# Document holding the key and its tree
# document = "shapetree.toml"

# Base names for new nodes and shapes
# group_name = "Group"
# shape_name = "Key"

# Prefix of generated influence/weight properties
# property_prefix = "shape_tree"

# Capabilities of newly initialised keys
# capabilities = ["split_axis", "combination", "in_between"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
