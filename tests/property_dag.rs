use std::collections::HashSet;

use cfngin::dag::Dag;
use proptest::prelude::*;

// Acyclic by construction: node i may only point at nodes with a higher index.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Dag> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec((0..num_nodes, 0..num_nodes), 0..num_nodes * 2).prop_map(
            move |pairs| {
                let mut dag = Dag::new();
                for i in 0..num_nodes {
                    dag.add_node(&format!("n{i}")).unwrap();
                }
                for (x, y) in pairs {
                    if x == y {
                        continue;
                    }
                    let (from, to) = (x.min(y), x.max(y));
                    dag.add_edge(&format!("n{from}"), &format!("n{to}")).unwrap();
                }
                dag
            },
        )
    })
}

fn reachability(dag: &Dag) -> Vec<(String, HashSet<String>)> {
    dag.nodes()
        .map(|node| {
            let reachable = dag.all_downstreams(node).unwrap().into_iter().collect();
            (node.to_string(), reachable)
        })
        .collect()
}

proptest! {
    #[test]
    fn test_topological_sort_puts_every_node_before_its_dependencies(dag in dag_strategy(10)) {
        let order = dag.topological_sort().unwrap();
        prop_assert_eq!(order.len(), dag.len());

        let index = |name: &str| order.iter().position(|n| n == name).unwrap();
        for node in dag.nodes() {
            for dep in dag.downstream(node).unwrap() {
                prop_assert!(index(node) < index(&dep));
            }
        }
    }

    #[test]
    fn test_transpose_twice_is_identity(dag in dag_strategy(10)) {
        prop_assert_eq!(dag.transpose().transpose(), dag);
    }

    #[test]
    fn test_transitive_reduction_preserves_reachability(dag in dag_strategy(10)) {
        let mut reduced = dag.clone();
        reduced.transitive_reduction();
        prop_assert_eq!(reachability(&reduced), reachability(&dag));

        let mut twice = reduced.clone();
        twice.transitive_reduction();
        prop_assert_eq!(twice, reduced);
    }

    #[test]
    fn test_back_edges_are_rejected_without_side_effects(dag in dag_strategy(8)) {
        for node in dag.nodes().map(str::to_string).collect::<Vec<_>>() {
            for dep in dag.all_downstreams(&node).unwrap() {
                let mut attempt = dag.clone();
                prop_assert!(attempt.add_edge(&dep, &node).is_err());
                prop_assert_eq!(&attempt, &dag);
            }
        }
    }

    #[test]
    fn test_filter_is_closed_under_dependencies(dag in dag_strategy(10), pick in 0usize..10) {
        let nodes: Vec<String> = dag.nodes().map(str::to_string).collect();
        let target = &nodes[pick % nodes.len()];
        let filtered = dag.filter(&[target]).unwrap();

        prop_assert!(filtered.contains(target));
        for node in filtered.nodes() {
            for dep in dag.downstream(node).unwrap() {
                prop_assert!(filtered.contains(&dep));
            }
        }
    }
}
