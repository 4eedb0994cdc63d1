mod common;

use std::fs;

use cfngin::errors::{DagError, GraphError};
use cfngin::plan::{Graph, Plan, Step};
use cfngin::stack::Stack;
use cfngin_test_utils::builders::stack;
use cfngin_test_utils::steps::complete;
use common::steps_of;
use tempfile::tempdir;

fn vpc_bastion() -> Graph {
    let func = complete();
    let layout: &[(&str, &[&str])] = &[("vpc", &[]), ("bastion", &["vpc"]), ("db", &[])];
    Graph::from_steps(steps_of(layout, &func)).unwrap()
}

#[test]
fn test_requires_creates_edges_to_dependencies() {
    let graph = vpc_bastion();

    let deps: Vec<String> = graph
        .downstream("bastion")
        .unwrap()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(deps, vec!["vpc"]);
    assert_eq!(graph.to_dict()["bastion"], vec!["vpc"]);
    assert!(graph.to_dict()["vpc"].is_empty());
    assert_eq!(graph.len(), 3);
}

#[test]
fn test_required_by_creates_reverse_edge() {
    let graph = Graph::from_steps(vec![
        Step::noop(Stack::new("vpc").required_by("bastion")),
        Step::noop(Stack::new("bastion")),
    ])
    .unwrap();

    assert_eq!(graph.to_dict()["bastion"], vec!["vpc"]);
}

#[test]
fn test_declaration_order_does_not_matter() {
    let graph = Graph::from_steps(vec![
        Step::noop(stack("bastion", &["vpc"])),
        Step::noop(stack("vpc", &[])),
    ])
    .unwrap();

    assert_eq!(graph.to_dict()["bastion"], vec!["vpc"]);
}

#[test]
fn test_duplicate_step_is_rejected() {
    let result = Graph::from_steps(vec![
        Step::noop(stack("vpc", &[])),
        Step::noop(stack("vpc", &[])),
    ]);

    match result {
        Err(GraphError::DuplicateStep(name)) => assert_eq!(name, "vpc"),
        other => panic!("Expected DuplicateStep, got: {:?}", other),
    }
}

#[test]
fn test_unknown_dependency_names_stack_and_dependency() {
    let result = Graph::from_steps(vec![Step::noop(stack("bastion", &["vpc"]))]);

    match result {
        Err(GraphError::Dependency {
            stack,
            dependency,
            source,
        }) => {
            assert_eq!(stack, "bastion");
            assert_eq!(dependency, "vpc");
            assert_eq!(source, DagError::NodeNotFound("vpc".to_string()));
        }
        other => panic!("Expected Dependency error, got: {:?}", other),
    }
}

#[test]
fn test_dependency_cycle_is_rejected() {
    let result = Graph::from_steps(vec![
        Step::noop(stack("a", &["b"])),
        Step::noop(stack("b", &["a"])),
    ]);

    match result {
        Err(GraphError::Dependency { source, .. }) => {
            assert!(matches!(source, DagError::Validation(_)));
        }
        other => panic!("Expected Dependency error, got: {:?}", other),
    }
}

#[test]
fn test_transposed_reverses_edges() {
    let graph = vpc_bastion().transposed();

    assert_eq!(graph.to_dict()["vpc"], vec!["bastion"]);
    assert!(graph.to_dict()["bastion"].is_empty());
    assert_eq!(graph.len(), 3);
}

#[test]
fn test_filtered_keeps_targets_and_dependencies() {
    let graph = vpc_bastion().filtered(&["bastion"]).unwrap();

    let mut names: Vec<&str> = graph.step_names().collect();
    names.sort();
    assert_eq!(names, vec!["bastion", "vpc"]);
    assert!(graph.get("db").is_none());
}

#[test]
fn test_pop_removes_step_and_edges() {
    let mut graph = vpc_bastion();

    let popped = graph.pop("vpc").unwrap();

    assert_eq!(popped.name(), "vpc");
    assert!(graph.get("vpc").is_none());
    assert!(graph.to_dict()["bastion"].is_empty());
    assert!(graph.pop("vpc").is_none());
}

#[test]
fn test_add_step_if_not_exists_keeps_first() {
    let mut graph = vpc_bastion();
    graph
        .add_step_if_not_exists(std::sync::Arc::new(Step::noop(stack("vpc", &[]))), true, true)
        .unwrap();

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.get("vpc").unwrap().action(), "deploy");
}

#[test]
fn test_dumps_serialises_adjacency() {
    let graph = vpc_bastion();
    assert_eq!(
        graph.dumps(false).unwrap(),
        r#"{"vpc":[],"bastion":["vpc"],"db":[]}"#
    );
}

#[test]
fn test_transitive_reduction_on_graph() {
    let mut graph = Graph::from_steps(vec![
        Step::noop(stack("a", &["b", "c"])),
        Step::noop(stack("b", &["c"])),
        Step::noop(stack("c", &[])),
    ])
    .unwrap();

    graph.transitive_reduction();

    assert_eq!(graph.to_dict()["a"], vec!["b"]);
}

#[test]
fn test_dump_writes_versioned_templates() {
    let dir = tempdir().unwrap();
    let template = dir.path().join("vpc.json");
    fs::write(&template, r#"{"cidr": "${Cidr}", "env": "${Env}"}"#).unwrap();

    let mut vpc = Stack::new("vpc").with_namespace("dev");
    vpc.template_path = Some(template);
    vpc.parameters.insert("Cidr".to_string(), "10.0.0.0/16".to_string());
    let bastion = Stack::new("bastion").with_namespace("dev").requires("vpc");

    let plan = Plan::new(
        "Create/Update stacks",
        Graph::from_steps(vec![Step::noop(vpc), Step::noop(bastion)]).unwrap(),
    );

    let out = dir.path().join("out");
    let written = plan.dump(&out).unwrap();

    assert_eq!(written.len(), 2);
    assert!(written[0].starts_with(out.join("stack_templates").join("dev-vpc")));
    assert!(written[1].starts_with(out.join("stack_templates").join("dev-bastion")));

    let file_name = written[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(file_name.starts_with("vpc-"));
    assert!(file_name.ends_with(".json"));
    assert_eq!(file_name.len(), "vpc-".len() + 8 + ".json".len());

    let body = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(body, r#"{"cidr": "10.0.0.0/16", "env": "${Env}"}"#);

    let description = fs::read_to_string(&written[1]).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&description).unwrap();
    assert_eq!(doc["fqn"], "dev-bastion");
    assert_eq!(doc["requires"][0], "vpc");
}
