//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION with negation support (project removes or adds capabilities)
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: global config paths point into temp directories so the user's real
//! configuration never leaks into these tests.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use shapetree::application::ApplicationError;
use shapetree::config::Settings;
use shapetree::domain::{Capability, HostCapabilities};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn given_no_config_files_when_load_then_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let settings =
        Settings::load_from(Some(&temp.path().join("absent.toml")), Some(temp.path())).unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.capabilities(), HostCapabilities::all());
}

#[test]
fn given_local_config_with_negation_when_load_then_removes_capability() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".shapetree.toml"),
        r#"
group_name = "Set"
capabilities = ["!in_between"]
"#,
    )
    .unwrap();

    let settings = Settings::load_from(None, Some(temp.path())).unwrap();

    assert_eq!(settings.group_name, "Set");
    assert_eq!(settings.shape_name, "Key");
    assert_eq!(settings.capabilities, strings(&["combination", "split_axis"]));
    assert!(!settings.capabilities().supports(Capability::InBetween));
}

#[test]
fn given_global_and_local_config_when_load_then_global_replaces_and_local_unions() {
    let temp = TempDir::new().unwrap();
    let global = temp.path().join("global.toml");
    fs::write(
        &global,
        r#"
shape_name = "Basis"
property_prefix = "rig"
capabilities = ["combination"]
"#,
    )
    .unwrap();
    let project = temp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join(".shapetree.toml"), r#"capabilities = ["split_axis"]"#).unwrap();

    let settings = Settings::load_from(Some(&global), Some(&project)).unwrap();

    assert_eq!(settings.shape_name, "Basis");
    assert_eq!(settings.property_prefix, "rig");
    assert_eq!(settings.capabilities, strings(&["combination", "split_axis"]));
}

#[test]
fn given_document_with_home_variable_when_load_then_expanded() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".shapetree.toml"),
        r#"document = "$HOME/rig/face.toml""#,
    )
    .unwrap();

    let settings = Settings::load_from(None, Some(temp.path())).unwrap();

    let home = std::env::var("HOME").expect("HOME should be set");
    assert_eq!(settings.document, PathBuf::from(home).join("rig/face.toml"));
}

#[test]
fn given_unknown_capability_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".shapetree.toml"),
        r#"capabilities = ["teleport"]"#,
    )
    .unwrap();

    let err = Settings::load_from(None, Some(temp.path())).unwrap_err();
    assert!(matches!(err, ApplicationError::Config { ref message } if message.contains("teleport")));
}

#[test]
fn given_malformed_config_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".shapetree.toml"), "group_name = [").unwrap();

    let err = Settings::load_from(None, Some(temp.path())).unwrap_err();
    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_settings_when_rendered_then_toml_round_trips() {
    let settings = Settings::default();
    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, settings);
    assert!(Settings::template().contains("capabilities"));
}
