//! Tests for ShapeTreeService against the in-memory key

use rstest::{fixture, rstest};

use shapetree::application::services::{NamingOptions, ShapeTreeService};
use shapetree::application::{ApplicationError, ValueDriverOutcome};
use shapetree::domain::{
    shape_value_path, Direction, DomainError, Driver, DriverVariable, HostCapabilities,
    NodeRequest, NodeType, Orphaned, ShapeHost, ShapeSource, ShapeTree, WeightParams,
    WeightPropagationPlanner,
};
use shapetree::infrastructure::KeyDocument;
use shapetree::util::testing;

type Service = ShapeTreeService<KeyDocument>;

#[fixture]
fn service() -> Service {
    testing::init_test_setup();
    ShapeTreeService::new(
        KeyDocument::new("Key", HostCapabilities::all()),
        ShapeTree::default(),
        NamingOptions::default(),
    )
}

fn set_influence(svc: &Service, key: &mut KeyDocument, node: &str, value: f64) {
    let index = svc.node(node).unwrap().index();
    let params = svc.tree().params(svc.host(), index).unwrap();
    key.set_property(&params.influence, value);
}

fn weight(key: &KeyDocument, tree: &ShapeTree, node: &str) -> f64 {
    let index = tree.find(node).unwrap().index();
    let params = tree.params(key, index).unwrap();
    key.evaluate_property(&params.weight).unwrap()
}

// ============================================================
// add-group / add-shapekey
// ============================================================

#[rstest]
fn given_default_naming_when_adding_groups_then_names_are_suffixed(mut service: Service) {
    let names: Vec<String> = (0..3)
        .map(|_| service.add_group(None).unwrap().name)
        .collect();
    assert_eq!(names, ["Group", "Group.001", "Group.002"]);
}

#[rstest]
fn given_missing_parent_when_adding_group_then_not_found(mut service: Service) {
    let err = service.add_group(Some("Nope")).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ParentNotFound(ref p)) if p == "Nope"
    ));
    assert!(service.tree().is_empty());
    assert!(service.host().drivers().is_empty());
}

#[rstest]
fn given_existing_shape_when_adding_shapekey_then_node_takes_its_name() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_shape("Smile");
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());

    let added = service.add_shapekey(None, Some("Smile")).unwrap();

    assert!(!added.created_shape);
    assert_eq!(added.inserted.name, "Smile");
    assert_eq!(service.host().shapes().len(), 1);
}

#[rstest]
fn given_shape_already_in_tree_when_adding_again_then_rejected(mut service: Service) {
    service.add_shapekey(None, None).unwrap();
    let err = service.add_shapekey(None, Some("Key")).unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NameInUse(_))
    ));
    assert_eq!(service.tree().len(), 1);
}

#[rstest]
fn given_new_shapes_when_adding_then_shape_names_avoid_tree_names(mut service: Service) {
    service.add_shapekey(None, None).unwrap();
    let second = service.add_shapekey(None, None).unwrap();
    assert_eq!(second.inserted.name, "Key.001");
    assert!(service.host().has_shape("Key.001"));
}

#[rstest]
fn given_foreign_value_driver_when_adding_shapekey_then_driver_retargeted() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_shape("Smile");
    key.set_driver(Driver {
        data_path: shape_value_path("Smile"),
        expression: "var".into(),
        variables: vec![DriverVariable::key_property("var", "Key", "eval_time".into())],
    });
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());

    let added = service.add_shapekey(None, Some("Smile")).unwrap();

    assert_eq!(added.value_driver, ValueDriverOutcome::Retargeted);
    let params = service.tree().params(service.host(), 0).unwrap();
    let retargeted = service.host().driver(&params.influence_path()).unwrap();
    assert_eq!(retargeted.expression, "var");
    assert!(service.host().driver(&shape_value_path("Smile")).is_none());
}

#[rstest]
fn given_pose_driver_when_adding_shapekey_then_driver_kept() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_shape("Smile");
    let pose = Driver {
        data_path: shape_value_path("Smile"),
        expression: "pose_driven_0".into(),
        variables: vec![DriverVariable::key_property(
            "pose_driven_0",
            "Key",
            "reference_key.value".into(),
        )],
    };
    key.set_driver(pose.clone());
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());

    let added = service.add_shapekey(None, Some("Smile")).unwrap();

    assert_eq!(added.value_driver, ValueDriverOutcome::FrameworkOwned);
    assert_eq!(service.host().driver(&shape_value_path("Smile")), Some(&pose));
}

// ============================================================
// Weight propagation
// ============================================================

#[rstest]
fn given_nested_influences_when_evaluating_then_weight_is_chain_product(mut service: Service) {
    service.add_group(None).unwrap();
    service.add_group(Some("Group")).unwrap();
    service.add_shapekey(Some("Group.001"), None).unwrap();

    let mut key = service.host().clone();
    set_influence(&service, &mut key, "Group", 0.5);
    set_influence(&service, &mut key, "Group.001", 0.8);
    set_influence(&service, &mut key, "Key", 0.5);
    let tree = service.tree();

    let expected = WeightPropagationPlanner::effective_weight(0.5, &[0.8, 0.5]);
    assert!((weight(&key, tree, "Key") - expected).abs() < 1e-12);
    assert!((key.evaluate_shape("Key").unwrap() - expected).abs() < 1e-12);

    key.set_property(&WeightParams::for_uid("shape_tree", 0).influence, 1.0);
    assert!((weight(&key, tree, "Key") - 0.4).abs() < 1e-12);
}

#[rstest]
fn given_reparented_group_when_moving_then_weight_driver_follows_new_parent(mut service: Service) {
    service.add_group(None).unwrap();
    service.add_group(None).unwrap();
    service.add_shapekey(Some("Group"), None).unwrap();

    let moved = service.move_node("Key", Some("Group.001")).unwrap();

    assert!(moved.reparented);
    let key_params = service.tree().params(service.host(), moved.index).unwrap();
    let parent = service.tree().find("Group.001").unwrap().index();
    let parent_params = service.tree().params(service.host(), parent).unwrap();
    let driver = service.host().driver(&key_params.weight_path()).unwrap();
    assert_eq!(driver.expression, "w*i");
    assert_eq!(driver.variables[1].target.data_path, parent_params.weight_path());
}

#[rstest]
fn given_shapekey_parent_when_moving_group_under_it_then_rejected(mut service: Service) {
    service.add_group(None).unwrap();
    service.add_shapekey(None, None).unwrap();
    let before = service.tree().nodes().clone();

    let err = service.move_node("Group", Some("Key")).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidPlacement { .. })
    ));
    assert_eq!(service.tree().nodes(), &before);
}

#[rstest]
fn given_unresolved_new_parent_when_moving_then_driver_drops_old_parent() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_component("combinations[\"A\"]", WeightParams::for_uid("ca", 0));
    key.add_component("inbetweens[\"Half\"]", WeightParams::for_uid("ih", 0));
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());
    service
        .insert(NodeRequest::linked(NodeType::Combination, "A", "combinations[\"A\"]", None))
        .unwrap();
    service
        .insert(NodeRequest::linked(
            NodeType::Inbetween,
            "Half",
            "inbetweens[\"Half\"]",
            Some("A"),
        ))
        .unwrap();
    service
        .insert(NodeRequest::linked(NodeType::Combination, "B", "combinations[\"B\"]", None))
        .unwrap();

    let moved = service.move_node("Half", Some("B")).unwrap();

    assert!(moved.reparented);
    assert_eq!(moved.plan.as_ref().map(|p| p.expression()), Some("i".to_string()));
    let half = WeightParams::for_uid("ih", 0);
    let driver = service.host().driver(&half.weight_path()).unwrap();
    assert_eq!(driver.expression, "i");
    let weight_of_a = WeightParams::for_uid("ca", 0).weight_path();
    assert!(driver
        .variables
        .iter()
        .all(|v| v.target.data_path != weight_of_a));
}

#[rstest]
fn given_siblings_when_reordering_then_drivers_untouched(mut service: Service) {
    service.add_group(None).unwrap();
    service.add_group(None).unwrap();
    let drivers = service.host().drivers().to_vec();

    assert_eq!(service.reorder("Group.001", Direction::Up).unwrap(), 0);
    assert_eq!(service.host().drivers(), drivers.as_slice());
}

// ============================================================
// Renaming and orphans
// ============================================================

#[rstest]
fn given_group_when_renamed_to_shape_name_then_suffixed_and_shapes_untouched(mut service: Service) {
    service.add_shapekey(None, None).unwrap();
    service.add_group(None).unwrap();

    let event = service.rename("Group", "Key").unwrap();

    assert_eq!(event.value, "Key.001");
    assert_eq!(event.requested, "Key");
    assert!(service.host().has_shape("Key"));
    assert!(!service.host().has_shape("Key.001"));
}

#[rstest]
fn given_linked_node_when_component_exists_then_resolves_through_data_path() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_shape("Smile");
    key.add_component("combinations[\"Smile\"]", WeightParams::for_uid("combo", 7));
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());
    service.add_group(None).unwrap();

    let inserted = service
        .insert(NodeRequest::linked(
            NodeType::Combination,
            "Smile",
            "combinations[\"Smile\"]",
            Some("Group"),
        ))
        .unwrap();

    let report = service.report("Smile").unwrap();
    assert!(report.valid);
    assert_eq!(report.params, Some(WeightParams::for_uid("combo", 7)));
    assert_eq!(report.parent.as_deref(), Some("Group"));
    assert_eq!(inserted.plan.unwrap().expression(), "w*i");
    assert!(service.orphans().is_empty());
}

#[rstest]
fn given_linked_node_with_unregistered_path_when_querying_then_orphaned_everywhere() {
    let mut key = KeyDocument::new("Key", HostCapabilities::all());
    key.add_shape("Smile");
    let mut service = ShapeTreeService::new(key, ShapeTree::default(), NamingOptions::default());
    service
        .insert(NodeRequest::linked(
            NodeType::Combination,
            "Smile",
            "combos[\"Smile\"]",
            None,
        ))
        .unwrap();

    let report = service.report("Smile").unwrap();

    assert!(!service.is_valid("Smile").unwrap());
    assert!(!report.valid);
    assert_eq!(
        report.orphaned,
        Some(Orphaned::UnresolvedData("combos[\"Smile\"]".into()))
    );
    let orphans: Vec<&str> = service.orphans().iter().map(|n| n.name()).collect();
    assert_eq!(orphans, ["Smile"]);
}

#[rstest]
fn given_report_when_querying_then_lists_relatives(mut service: Service) {
    service.add_group(None).unwrap();
    service.add_shapekey(Some("Group"), None).unwrap();
    service.add_group(Some("Group")).unwrap();
    service.add_shapekey(Some("Group.001"), None).unwrap();

    let report = service.report("Group.001").unwrap();

    assert_eq!(report.index, 2);
    assert_eq!(report.depth, 1);
    assert_eq!(report.ancestors, ["Group"]);
    assert_eq!(report.children, ["Key.001"]);
    assert_eq!(report.siblings, ["Key"]);
    assert_eq!(report.subtree, ["Group.001", "Key.001"]);
    assert!(report.shape.is_none());
}
