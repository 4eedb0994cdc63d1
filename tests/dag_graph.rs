mod common;

use cfngin::dag::Dag;
use cfngin::errors::DagError;
use common::basic_dag;

#[test]
fn test_topological_sort_lists_dependents_first() {
    let dag = basic_dag();
    assert_eq!(dag.topological_sort().unwrap(), vec!["a", "b", "c", "d"]);
    assert_eq!(dag.walk_order().unwrap(), vec!["d", "c", "b", "a"]);
}

#[test]
fn test_all_downstreams_in_topological_order() {
    let dag = basic_dag();
    assert_eq!(dag.all_downstreams("a").unwrap(), vec!["b", "c", "d"]);
    assert_eq!(dag.all_downstreams("b").unwrap(), vec!["d"]);
    assert!(dag.all_downstreams("d").unwrap().is_empty());
}

#[test]
fn test_independent_nodes_and_leaves() {
    let dag = basic_dag();
    assert_eq!(dag.ind_nodes(), vec!["a"]);
    assert_eq!(dag.all_leaves(), vec!["d"]);
    assert_eq!(dag.predecessors("d"), vec!["b", "c"]);
    assert_eq!(dag.downstream("a").unwrap(), vec!["b", "c"]);
}

#[test]
fn test_cycle_is_rejected_and_graph_unchanged() {
    let mut dag = basic_dag();
    let before = dag.clone();

    match dag.add_edge("d", "a") {
        Err(DagError::Validation(_)) => {}
        other => panic!("Expected Validation error, got: {:?}", other),
    }
    assert_eq!(dag, before);
    assert!(dag.downstream("d").unwrap().is_empty());
}

#[test]
fn test_cycle_below_an_independent_node_is_rejected() {
    // `a` stays independent, so only the sort can detect the b <-> d loop.
    let mut dag = basic_dag();

    match dag.add_edge("d", "b") {
        Err(DagError::Validation(msg)) => assert!(msg.contains("not acyclic")),
        other => panic!("Expected Validation error, got: {:?}", other),
    }
}

#[test]
fn test_missing_nodes_are_reported() {
    let mut dag = basic_dag();

    assert_eq!(
        dag.add_edge("a", "zzz"),
        Err(DagError::NodeNotFound("zzz".to_string()))
    );
    assert_eq!(
        dag.downstream("zzz"),
        Err(DagError::NodeNotFound("zzz".to_string()))
    );
    assert_eq!(
        dag.delete_node("zzz"),
        Err(DagError::NodeNotFound("zzz".to_string()))
    );
    assert_eq!(
        dag.delete_edge("d", "a"),
        Err(DagError::EdgeNotFound {
            ind: "d".to_string(),
            dep: "a".to_string()
        })
    );
}

#[test]
fn test_if_exists_variants_are_idempotent() {
    let mut dag = basic_dag();

    assert_eq!(dag.add_node("a"), Err(DagError::NodeExists("a".to_string())));

    dag.add_node_if_not_exists("a");
    dag.add_node_if_not_exists("e");
    dag.add_node_if_not_exists("e");
    assert_eq!(dag.size(), 5);

    dag.delete_node_if_exists("missing");
    assert_eq!(dag.len(), 5);
}

#[test]
fn test_delete_node_prunes_edges() {
    let mut dag = basic_dag();
    dag.delete_node("d").unwrap();

    assert!(!dag.contains("d"));
    assert!(dag.downstream("b").unwrap().is_empty());
    assert!(dag.downstream("c").unwrap().is_empty());
    assert_eq!(dag.all_leaves(), vec!["b", "c"]);
}

#[test]
fn test_delete_edge() {
    let mut dag = basic_dag();
    dag.delete_edge("a", "b").unwrap();

    assert_eq!(dag.downstream("a").unwrap(), vec!["c"]);
    assert_eq!(dag.ind_nodes(), vec!["a", "b"]);

    // A removed edge is gone for good, and unknown sources are not edges.
    assert!(matches!(
        dag.delete_edge("a", "b"),
        Err(DagError::EdgeNotFound { .. })
    ));
    assert!(matches!(
        dag.delete_edge("zzz", "a"),
        Err(DagError::EdgeNotFound { .. })
    ));
    assert_eq!(dag.downstream("a").unwrap(), vec!["c"]);
}

#[test]
fn test_transpose_reverses_edges_and_is_an_involution() {
    let dag = basic_dag();
    let transposed = dag.transpose();

    assert_eq!(transposed.downstream("d").unwrap(), vec!["b", "c"]);
    assert!(transposed.downstream("a").unwrap().is_empty());
    assert_eq!(transposed.ind_nodes(), vec!["d"]);
    assert_eq!(transposed.transpose(), dag);
}

#[test]
fn test_transitive_reduction_drops_implied_edges() {
    let mut dag = Dag::from_dict([
        ("a", vec!["b", "c", "d"]),
        ("b", vec!["c"]),
        ("c", vec!["d"]),
        ("d", vec![]),
    ])
    .unwrap();
    let reachable_before = dag.all_downstreams("a").unwrap();

    dag.transitive_reduction();

    assert_eq!(dag.downstream("a").unwrap(), vec!["b"]);
    assert_eq!(dag.downstream("b").unwrap(), vec!["c"]);
    assert_eq!(dag.downstream("c").unwrap(), vec!["d"]);
    assert_eq!(dag.all_downstreams("a").unwrap(), reachable_before);
}

#[test]
fn test_transitive_reduction_keeps_diamond() {
    let mut dag = basic_dag();
    let before = dag.clone();
    dag.transitive_reduction();
    assert_eq!(dag, before);
}

#[test]
fn test_filter_keeps_requested_nodes_and_their_dependencies() {
    let dag = basic_dag();
    let filtered = dag.filter(&["b"]).unwrap();

    let mut nodes: Vec<&str> = filtered.nodes().collect();
    nodes.sort();
    assert_eq!(nodes, vec!["b", "d"]);
    assert_eq!(filtered.downstream("b").unwrap(), vec!["d"]);

    assert_eq!(
        dag.filter(&["nope"]).map(|_| ()),
        Err(DagError::NodeNotFound("nope".to_string()))
    );
}

#[test]
fn test_rename_edges() {
    let mut dag = basic_dag();
    dag.rename_edges("d", "e");

    assert!(!dag.contains("d"));
    assert!(dag.contains("e"));
    assert_eq!(dag.downstream("b").unwrap(), vec!["e"]);
    assert_eq!(dag.predecessors("e"), vec!["b", "c"]);
}

#[test]
fn test_walk_calls_each_node_in_execution_order() {
    let dag = basic_dag();
    let mut seen = Vec::new();
    dag.walk(|node| seen.push(node.to_string())).unwrap();
    assert_eq!(seen, vec!["d", "c", "b", "a"]);
}

#[test]
fn test_to_dict_round_trips_and_reset_clears() {
    let mut dag = basic_dag();
    let dict = dag.to_dict();
    assert_eq!(dict["a"], vec!["b", "c"]);
    assert!(dict["d"].is_empty());

    let rebuilt = Dag::from_dict(dict).unwrap();
    assert_eq!(rebuilt, dag);

    dag.reset_graph();
    assert!(dag.is_empty());
}

#[test]
fn test_validate() {
    assert!(basic_dag().validate().is_ok());

    match Dag::new().validate() {
        Err(DagError::Validation(msg)) => assert!(msg.contains("no independent nodes")),
        other => panic!("Expected Validation error, got: {:?}", other),
    }
}
