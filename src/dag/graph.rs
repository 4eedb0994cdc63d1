// src/dag/graph.rs

use std::collections::{HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::errors::DagError;

/// Mutable directed acyclic graph of named nodes.
///
/// Each node maps to the insertion-ordered set of nodes it points at. In the
/// planning layer an edge `a -> b` reads "a requires b", so the nodes a node
/// points at are its *downstream* dependencies.
///
/// Acyclicity is enforced on every [`Dag::add_edge`]: the edge is first added
/// to a copy of the graph, the copy is validated, and only then is the copy
/// committed. A rejected edge leaves the graph untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dag {
    graph: IndexMap<String, IndexSet<String>>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(node, dependencies)` pairs.
    ///
    /// All nodes are added first, then every edge is added (and validated)
    /// in declaration order.
    pub fn from_dict<I, K, D, S>(graph_dict: I) -> Result<Self, DagError>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<(String, Vec<String>)> = graph_dict
            .into_iter()
            .map(|(node, deps)| {
                (
                    node.as_ref().to_string(),
                    deps.into_iter().map(|d| d.as_ref().to_string()).collect(),
                )
            })
            .collect();

        let mut dag = Self::new();
        for (node, _) in &entries {
            dag.add_node(node)?;
        }
        for (node, deps) in &entries {
            for dep in deps {
                dag.add_edge(node, dep)?;
            }
        }
        Ok(dag)
    }

    /// Read-only access to the adjacency map: `{node: {dependencies}}`.
    pub fn graph(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.graph
    }

    /// Owned `{node: [dependencies]}` snapshot, the shape graph exporters use.
    pub fn to_dict(&self) -> IndexMap<String, Vec<String>> {
        self.graph
            .iter()
            .map(|(node, edges)| (node.clone(), edges.iter().cloned().collect()))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, node: &str) -> bool {
        self.graph.contains_key(node)
    }

    pub fn size(&self) -> usize {
        self.graph.len()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn reset_graph(&mut self) {
        self.graph.clear();
    }

    pub fn add_node(&mut self, name: &str) -> Result<(), DagError> {
        if self.graph.contains_key(name) {
            return Err(DagError::NodeExists(name.to_string()));
        }
        self.graph.insert(name.to_string(), IndexSet::new());
        Ok(())
    }

    pub fn add_node_if_not_exists(&mut self, name: &str) {
        if !self.graph.contains_key(name) {
            self.graph.insert(name.to_string(), IndexSet::new());
        }
    }

    /// Remove a node and every edge pointing at it.
    pub fn delete_node(&mut self, name: &str) -> Result<(), DagError> {
        if self.graph.shift_remove(name).is_none() {
            return Err(DagError::NodeNotFound(name.to_string()));
        }
        for edges in self.graph.values_mut() {
            edges.shift_remove(name);
        }
        Ok(())
    }

    pub fn delete_node_if_exists(&mut self, name: &str) {
        let _ = self.delete_node(name);
    }

    /// Add an edge `ind_node -> dep_node`, rejecting it if the result would
    /// not be a valid DAG.
    pub fn add_edge(&mut self, ind_node: &str, dep_node: &str) -> Result<(), DagError> {
        if !self.graph.contains_key(ind_node) {
            return Err(DagError::NodeNotFound(ind_node.to_string()));
        }
        if !self.graph.contains_key(dep_node) {
            return Err(DagError::NodeNotFound(dep_node.to_string()));
        }

        let mut test_graph = self.clone();
        if let Some(edges) = test_graph.graph.get_mut(ind_node) {
            edges.insert(dep_node.to_string());
        }
        test_graph.validate()?;

        self.graph = test_graph.graph;
        Ok(())
    }

    pub fn delete_edge(&mut self, ind_node: &str, dep_node: &str) -> Result<(), DagError> {
        match self.graph.get_mut(ind_node).map(|edges| edges.shift_remove(dep_node)) {
            Some(true) => Ok(()),
            _ => Err(DagError::EdgeNotFound {
                ind: ind_node.to_string(),
                dep: dep_node.to_string(),
            }),
        }
    }

    /// Replace every occurrence of `old` (as a node or as an edge target)
    /// with `new`.
    pub fn rename_edges(&mut self, old: &str, new: &str) {
        if let Some(edges) = self.graph.shift_remove(old) {
            self.graph.insert(new.to_string(), edges);
        }
        for edges in self.graph.values_mut() {
            if edges.shift_remove(old) {
                edges.insert(new.to_string());
            }
        }
    }

    /// New graph with every edge reversed.
    ///
    /// The transpose of an acyclic graph is acyclic, so edges are copied
    /// without re-validation.
    pub fn transpose(&self) -> Dag {
        let mut transposed = Dag::new();
        for node in self.graph.keys() {
            transposed.add_node_if_not_exists(node);
        }
        for (node, edges) in &self.graph {
            for edge in edges {
                if let Some(reversed) = transposed.graph.get_mut(edge) {
                    reversed.insert(node.clone());
                }
            }
        }
        transposed
    }

    /// Nodes that point at `node`.
    pub fn predecessors(&self, node: &str) -> Vec<String> {
        self.graph
            .iter()
            .filter(|(_, edges)| edges.contains(node))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Direct dependencies of `node`.
    pub fn downstream(&self, node: &str) -> Result<Vec<String>, DagError> {
        self.graph
            .get(node)
            .map(|edges| edges.iter().cloned().collect())
            .ok_or_else(|| DagError::NodeNotFound(node.to_string()))
    }

    /// Every node reachable from `node`, in topological order.
    pub fn all_downstreams(&self, node: &str) -> Result<Vec<String>, DagError> {
        let mut queue = vec![node.to_string()];
        let mut seen: HashSet<String> = HashSet::new();
        let mut i = 0;

        while i < queue.len() {
            for dep in self.downstream(&queue[i])? {
                if seen.insert(dep.clone()) {
                    queue.push(dep);
                }
            }
            i += 1;
        }

        Ok(self
            .topological_sort()?
            .into_iter()
            .filter(|n| seen.contains(n))
            .collect())
    }

    /// New graph holding exactly `nodes` plus everything they depend on.
    pub fn filter<S: AsRef<str>>(&self, nodes: &[S]) -> Result<Dag, DagError> {
        let mut filtered = Dag::new();
        for node in nodes {
            let node = node.as_ref();
            let downstreams = self.all_downstreams(node)?;
            filtered.add_node_if_not_exists(node);
            for dep in downstreams {
                filtered.add_node_if_not_exists(&dep);
            }
        }

        for (node, edges) in &self.graph {
            if let Some(kept) = filtered.graph.get_mut(node) {
                *kept = edges.clone();
            }
        }
        Ok(filtered)
    }

    /// Nodes with no dependencies.
    pub fn all_leaves(&self) -> Vec<String> {
        self.graph
            .iter()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Nodes nothing else depends on.
    pub fn ind_nodes(&self) -> Vec<String> {
        let dependent: HashSet<&str> = self
            .graph
            .values()
            .flat_map(|edges| edges.iter().map(|s| s.as_str()))
            .collect();
        self.graph
            .keys()
            .filter(|name| !dependent.contains(name.as_str()))
            .cloned()
            .collect()
    }

    pub fn validate(&self) -> Result<(), DagError> {
        if self.ind_nodes().is_empty() {
            return Err(DagError::Validation(
                "no independent nodes detected".to_string(),
            ));
        }
        self.topological_sort()
            .map_err(|err| DagError::Validation(err.to_string()))?;
        Ok(())
    }

    /// Kahn's algorithm over in-degrees.
    ///
    /// Dependents come before their dependencies. Newly ready nodes are
    /// enqueued in alphabetical order so the result is deterministic.
    pub fn topological_sort(&self) -> Result<Vec<String>, DagError> {
        let mut in_degree: IndexMap<&str, usize> =
            self.graph.keys().map(|k| (k.as_str(), 0)).collect();
        for edges in self.graph.values() {
            for dep in edges {
                if let Some(count) = in_degree.get_mut(dep.as_str()) {
                    *count += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut sorted = Vec::with_capacity(self.graph.len());
        while let Some(node) = queue.pop_front() {
            sorted.push(node.to_string());

            let mut edges: Vec<&str> = self.graph[node].iter().map(|s| s.as_str()).collect();
            edges.sort_unstable();
            for dep in edges {
                if let Some(count) = in_degree.get_mut(dep) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dep);
                    }
                }
            }
        }

        if sorted.len() == self.graph.len() {
            Ok(sorted)
        } else {
            Err(DagError::NotAcyclic)
        }
    }

    /// Execution order: the reversed topological sort, dependency-free nodes
    /// first.
    pub fn walk_order(&self) -> Result<Vec<String>, DagError> {
        let mut nodes = self.topological_sort()?;
        nodes.reverse();
        Ok(nodes)
    }

    /// Serially call `walk_func` once per node in execution order.
    pub fn walk<F>(&self, mut walk_func: F) -> Result<(), DagError>
    where
        F: FnMut(&str),
    {
        for node in self.walk_order()? {
            walk_func(&node);
        }
        Ok(())
    }

    /// Drop every edge `a -> b` for which a longer path `a -> ... -> b`
    /// exists. Reachability is unchanged.
    pub fn transitive_reduction(&mut self) {
        let edges: HashSet<(String, String)> = self
            .graph
            .iter()
            .flat_map(|(node, deps)| deps.iter().map(move |d| (node.clone(), d.clone())))
            .collect();

        // Pairs joined by a path of two or more hops, grown to a fixed point.
        let mut multi_hop: HashSet<(String, String)> = compose(&edges, &edges);
        loop {
            let extended = compose(&multi_hop, &edges);
            let before = multi_hop.len();
            multi_hop.extend(extended);
            if multi_hop.len() == before {
                break;
            }
        }

        let mut removed = 0usize;
        for (node, deps) in self.graph.iter_mut() {
            deps.retain(|dep| {
                let keep = !multi_hop.contains(&(node.clone(), dep.clone()));
                if !keep {
                    removed += 1;
                }
                keep
            });
        }
        debug!(removed, "transitive reduction removed redundant edges");
    }
}

/// `{(a, c) | (a, b) in left, (b, c) in right}`.
fn compose(
    left: &HashSet<(String, String)>,
    right: &HashSet<(String, String)>,
) -> HashSet<(String, String)> {
    let mut out = HashSet::new();
    for (a, b) in left {
        for (b2, c) in right {
            if b == b2 {
                out.insert((a.clone(), c.clone()));
            }
        }
    }
    out
}
