//! Tests for DocumentStore and the service container round trip

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use shapetree::application::services::{NamingOptions, ShapeTreeService};
use shapetree::config::Settings;
use shapetree::domain::{HostCapabilities, ShapeHost, ShapeSource, ShapeTree};
use shapetree::infrastructure::di::ServiceContainer;
use shapetree::infrastructure::traits::RealFileSystem;
use shapetree::infrastructure::{Document, DocumentStore, InfraError, KeyDocument};

const CORRUPT_DEPTH: &str = r#"
[key]
name = "Key"
shapes = [{ name = "Brow", value = 0.0 }]

[tree]
active_index = 0
next_uid = 2

[[tree.nodes]]
name = "Group"
type = "GROUP"
depth = 0
index = 0
uid = 0

[tree.nodes.source]
kind = "local"
influence = "shape_tree_0_influence"
weight = "shape_tree_0_weight"

[[tree.nodes]]
name = "Brow"
type = "SHAPEKEY"
depth = 2
index = 1
uid = 1

[tree.nodes.source]
kind = "local"
influence = "shape_tree_1_influence"
weight = "shape_tree_1_weight"
"#;

const STALE_UID_COUNTER: &str = r#"
[key]
name = "Key"

[tree]
active_index = 0

[[tree.nodes]]
name = "Group"
type = "GROUP"
depth = 0
index = 0
uid = 0

[tree.nodes.source]
kind = "local"
influence = "shape_tree_0_influence"
weight = "shape_tree_0_weight"
"#;

fn store(dir: &Path) -> DocumentStore {
    DocumentStore::new(Arc::new(RealFileSystem), dir.join("shapetree.toml"))
}

fn container() -> ServiceContainer {
    ServiceContainer::new(Settings::default())
}

#[test]
fn given_no_document_when_loading_then_reports_missing() {
    let temp = TempDir::new().unwrap();
    let err = store(temp.path()).load().unwrap_err();
    assert!(matches!(err, InfraError::DocumentMissing(_)));
}

#[test]
fn given_existing_document_when_creating_without_force_then_refuses() {
    let temp = TempDir::new().unwrap();
    let store = store(temp.path());
    let document = Document::new(
        KeyDocument::new("Key", HostCapabilities::all()),
        ShapeTree::default(),
    );
    store.create(&document, false).unwrap();

    let err = store.create(&document, false).unwrap_err();
    assert!(matches!(err, InfraError::DocumentExists(_)));
    store.create(&document, true).unwrap();
}

#[test]
fn given_saved_tree_when_reopened_then_tree_and_drivers_survive() {
    let temp = TempDir::new().unwrap();
    let container = container();
    container
        .document_store(temp.path())
        .create(&container.new_document("Face", None), false)
        .unwrap();

    let mut service = container.open(temp.path()).unwrap();
    service.add_group(None).unwrap();
    service.add_shapekey(Some("Group"), None).unwrap();
    service.add_group(Some("Group")).unwrap();
    container.close(temp.path(), service).unwrap();

    let service = container.open(temp.path()).unwrap();
    let names: Vec<(&str, usize)> = service
        .tree()
        .nodes()
        .iter()
        .map(|n| (n.name(), n.depth()))
        .collect();
    assert_eq!(names, vec![("Group", 0), ("Key", 1), ("Group.001", 1)]);
    assert_eq!(service.tree().active_index(), 2);
    assert!(service.host().has_shape("Key"));
    assert_eq!(service.host().drivers().len(), 4);
    assert_eq!(service.host().key_name(), "Face");
}

#[test]
fn given_uid_counter_when_reopened_then_new_nodes_get_fresh_parameters() {
    let temp = TempDir::new().unwrap();
    let container = container();
    container
        .document_store(temp.path())
        .create(&container.new_document("Key", None), false)
        .unwrap();

    let mut service = container.open(temp.path()).unwrap();
    service.add_group(None).unwrap();
    container.close(temp.path(), service).unwrap();

    let mut service = container.open(temp.path()).unwrap();
    let second = service.add_group(None).unwrap();
    let first = service.tree().params(service.host(), 0).unwrap();
    let second = service.tree().params(service.host(), second.index).unwrap();
    assert_ne!(first, second);
}

#[test]
fn given_depth_gap_in_document_when_loading_then_rejected_as_corrupt() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shapetree.toml");
    std::fs::write(&path, CORRUPT_DEPTH).unwrap();

    let err = store(temp.path()).load().unwrap_err();
    match err {
        InfraError::Document { message, .. } => {
            assert!(message.contains("corrupt tree at index 1"), "{message}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn given_corrupt_document_when_loading_then_file_left_untouched() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("shapetree.toml");
    std::fs::write(&path, "not = [valid").unwrap();

    assert!(store(temp.path()).load().is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "not = [valid");
}

#[test]
fn given_host_side_shape_removed_when_saved_then_node_reloads_invalid() {
    let temp = TempDir::new().unwrap();
    let container = container();
    container
        .document_store(temp.path())
        .create(&container.new_document("Key", None), false)
        .unwrap();

    let mut service = container.open(temp.path()).unwrap();
    service.add_shapekey(None, None).unwrap();
    service.remove_shape("Key").unwrap();
    container.close(temp.path(), service).unwrap();

    let service = container.open(temp.path()).unwrap();
    assert_eq!(service.tree().len(), 1);
    assert!(!service.is_valid("Key").unwrap());
    let (mut key, _) = service.into_parts();
    key.add_shape("Key");
    assert!(key.has_shape("Key"));
}

#[test]
fn given_missing_uid_counter_when_loading_then_new_nodes_get_fresh_parameters() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("shapetree.toml"), STALE_UID_COUNTER).unwrap();

    let document = store(temp.path()).load().unwrap();
    let mut service = ShapeTreeService::new(document.key, document.tree, NamingOptions::default());
    let added = service.add_group(None).unwrap();

    let first = service.tree().params(service.host(), 0).unwrap();
    let second = service.tree().params(service.host(), added.index).unwrap();
    assert_eq!(first.influence, "shape_tree_0_influence");
    assert_eq!(second.influence, "shape_tree_1_influence");
}
