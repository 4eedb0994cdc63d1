// src/actions/graph.rs

//! Render a stack graph as Graphviz dot or JSON.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};

use crate::plan::Graph;
use crate::types::GraphFormat;

pub fn render(graph: &Graph, format: GraphFormat, reduce: bool) -> serde_json::Result<String> {
    match format {
        GraphFormat::Dot => Ok(to_dot(graph, reduce)),
        GraphFormat::Json => to_json(graph, reduce),
    }
}

/// Edges point from a stack to the stacks it depends on.
pub fn to_dot(graph: &Graph, reduce: bool) -> String {
    let edges = edges(graph, reduce);

    let mut out = String::from("digraph digraph {\n");
    for (node, deps) in &edges {
        for dep in deps {
            let _ = writeln!(out, "  \"{node}\" -> \"{dep}\";");
        }
    }
    out.push('}');
    out
}

/// `{"steps": {"<name>": {"deps": [...]}}}`
pub fn to_json(graph: &Graph, reduce: bool) -> serde_json::Result<String> {
    let steps: Map<String, Value> = edges(graph, reduce)
        .into_iter()
        .map(|(node, deps)| (node, json!({ "deps": deps })))
        .collect();

    serde_json::to_string_pretty(&json!({ "steps": steps }))
}

fn edges(graph: &Graph, reduce: bool) -> Vec<(String, Vec<String>)> {
    let dag = if reduce {
        let mut dag = graph.dag().clone();
        dag.transitive_reduction();
        dag
    } else {
        graph.dag().clone()
    };
    dag.to_dict().into_iter().collect()
}
