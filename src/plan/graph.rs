// src/plan/graph.rs

//! Dependency graph of [`Step`]s.
//!
//! Edges mirror each stack's declarations: `requires = ["b"]` on `a` and
//! `required_by = ["a"]` on `b` both produce the DAG edge `a -> b`.

use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::dag::{Dag, Walker};
use crate::errors::{DagError, GraphError};
use crate::plan::step::Step;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    steps: IndexMap<String, Arc<Step>>,
    dag: Dag,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from steps, connecting every declared dependency.
    pub fn from_steps<I>(steps: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = Step>,
    {
        let mut graph = Self::new();
        graph.add_steps(steps.into_iter().map(Arc::new))?;
        Ok(graph)
    }

    pub fn add_step(
        &mut self,
        step: Arc<Step>,
        add_dependencies: bool,
        add_dependents: bool,
    ) -> Result<(), GraphError> {
        let name = step.name().to_string();
        self.dag
            .add_node(&name)
            .map_err(|_| GraphError::DuplicateStep(name.clone()))?;
        self.steps.insert(name.clone(), Arc::clone(&step));

        if add_dependencies {
            for dep in step.requires() {
                self.connect(&name, dep)?;
            }
        }
        if add_dependents {
            for parent in step.required_by() {
                self.connect(parent, &name)?;
            }
        }
        Ok(())
    }

    pub fn add_step_if_not_exists(
        &mut self,
        step: Arc<Step>,
        add_dependencies: bool,
        add_dependents: bool,
    ) -> Result<(), GraphError> {
        if self.steps.contains_key(step.name()) {
            return Ok(());
        }
        self.add_step(step, add_dependencies, add_dependents)
    }

    /// Add every step first, then connect their declared dependencies, so
    /// declaration order does not matter.
    pub fn add_steps<I>(&mut self, steps: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = Arc<Step>>,
    {
        let steps: Vec<Arc<Step>> = steps.into_iter().collect();
        for step in &steps {
            self.add_step(Arc::clone(step), false, false)?;
        }
        for step in &steps {
            for dep in step.requires() {
                self.connect(step.name(), dep)?;
            }
            for parent in step.required_by() {
                self.connect(parent, step.name())?;
            }
        }
        Ok(())
    }

    /// Remove a step and every edge referencing it.
    pub fn pop(&mut self, name: &str) -> Option<Arc<Step>> {
        let step = self.steps.shift_remove(name)?;
        self.dag.delete_node_if_exists(name);
        Some(step)
    }

    /// Add the edge `step -> dep`.
    pub fn connect(&mut self, step: &str, dep: &str) -> Result<(), GraphError> {
        self.dag
            .add_edge(step, dep)
            .map_err(|source| GraphError::Dependency {
                stack: step.to_string(),
                dependency: dep.to_string(),
                source,
            })
    }

    pub fn transitive_reduction(&mut self) {
        self.dag.transitive_reduction();
    }

    /// Walk the graph with `walker`, calling `walk_func` with each step.
    pub async fn walk<F, Fut>(&self, walker: &Walker, walk_func: F) -> Result<(), DagError>
    where
        F: Fn(Arc<Step>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let steps = self.steps.clone();
        walker
            .walk(&self.dag, move |name| {
                let call = steps.get(&name).cloned().map(&walk_func);
                async move {
                    if let Some(call) = call {
                        call.await;
                    }
                }
            })
            .await
    }

    /// Direct dependencies of the named step.
    pub fn downstream(&self, name: &str) -> Result<Vec<Arc<Step>>, DagError> {
        Ok(self
            .dag
            .downstream(name)?
            .iter()
            .filter_map(|dep| self.steps.get(dep).cloned())
            .collect())
    }

    /// Same steps, every edge reversed: the destroy ordering of a deploy graph.
    pub fn transposed(&self) -> Graph {
        Graph {
            steps: self.steps.clone(),
            dag: self.dag.transpose(),
        }
    }

    /// Restrict the graph to `names` and everything they depend on.
    pub fn filtered<S: AsRef<str>>(&self, names: &[S]) -> Result<Graph, DagError> {
        let dag = self.dag.filter(names)?;
        let steps = self
            .steps
            .iter()
            .filter(|(name, _)| dag.contains(name))
            .map(|(name, step)| (name.clone(), Arc::clone(step)))
            .collect();
        Ok(Graph { steps, dag })
    }

    pub fn topological_sort(&self) -> Result<Vec<Arc<Step>>, DagError> {
        Ok(self
            .dag
            .topological_sort()?
            .iter()
            .filter_map(|name| self.steps.get(name).cloned())
            .collect())
    }

    pub fn to_dict(&self) -> IndexMap<String, Vec<String>> {
        self.dag.to_dict()
    }

    pub fn dumps(&self, pretty: bool) -> serde_json::Result<String> {
        let dict = self.to_dict();
        if pretty {
            serde_json::to_string_pretty(&dict)
        } else {
            serde_json::to_string(&dict)
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Step>> {
        self.steps.get(name)
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(|s| s.as_str())
    }

    pub fn steps(&self) -> &IndexMap<String, Arc<Step>> {
        &self.steps
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
