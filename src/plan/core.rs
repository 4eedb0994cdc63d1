// src/plan/core.rs

//! A [`Plan`] pairs a description with a [`Graph`] of steps and knows how to
//! execute, outline, or dump it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dag::Walker;
use crate::errors::{CfnginError, DagError, PlanFailed};
use crate::plan::graph::Graph;
use crate::plan::status::{self, StatusCode};
use crate::plan::step::Step;

/// One line of [`Plan::outline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// 1-based position in execution order.
    pub index: usize,
    pub target: String,
    pub action: String,
}

#[derive(Debug)]
pub struct Plan {
    id: Uuid,
    description: String,
    graph: Graph,
}

impl Plan {
    pub fn new(description: impl Into<String>, graph: Graph) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            graph,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Steps in execution order (dependency-free first).
    pub fn steps(&self) -> Result<Vec<Arc<Step>>, DagError> {
        let mut steps = self.graph.topological_sort()?;
        steps.reverse();
        Ok(steps)
    }

    pub fn step_names(&self) -> Result<Vec<String>, DagError> {
        Ok(self
            .steps()?
            .iter()
            .map(|step| step.name().to_string())
            .collect())
    }

    /// Names of every step in the plan, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.graph.step_names().map(|s| s.to_string()).collect()
    }

    /// Walk the plan and fail with [`PlanFailed`] if any step ended failed.
    ///
    /// Independent branches always run to completion before failures are
    /// reported.
    pub async fn execute(&self, walker: &Walker) -> Result<(), CfnginError> {
        info!(plan = %self.id, description = %self.description, "executing plan");
        self.walk(walker).await?;

        let failed: Vec<String> = self
            .steps()?
            .iter()
            .filter(|step| step.status().code() == StatusCode::Failed)
            .map(|step| step.name().to_string())
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(PlanFailed { failed }.into())
        }
    }

    /// Run every step in dependency order.
    ///
    /// A step whose direct dependency did not end `ok` is marked failed with
    /// "dependency has failed" and its callback is never invoked.
    pub async fn walk(&self, walker: &Walker) -> Result<(), DagError> {
        let mut deps: HashMap<String, Vec<Arc<Step>>> = HashMap::new();
        for name in self.graph.step_names() {
            deps.insert(name.to_string(), self.graph.downstream(name)?);
        }
        let deps = Arc::new(deps);

        self.graph
            .walk(walker, move |step| {
                let deps = Arc::clone(&deps);
                async move {
                    let blocked = deps
                        .get(step.name())
                        .is_some_and(|deps| deps.iter().any(|dep| !dep.ok()));
                    if blocked {
                        warn!(step = %step.name(), "a dependency failed; not running step");
                        step.set_status(status::DEPENDENCY_FAILED);
                        return;
                    }
                    step.run().await;
                }
            })
            .await
    }

    /// Log and return the planned step order.
    pub fn outline(&self, message: Option<&str>) -> Result<Vec<OutlineEntry>, DagError> {
        info!("plan \"{}\":", self.description);

        let entries: Vec<OutlineEntry> = self
            .steps()?
            .iter()
            .enumerate()
            .map(|(i, step)| OutlineEntry {
                index: i + 1,
                target: step.name().to_string(),
                action: step.action().to_string(),
            })
            .collect();

        for entry in &entries {
            info!(
                "  - step: {}: target: \"{}\", action: \"{}\"",
                entry.index, entry.target, entry.action
            );
        }
        if let Some(message) = message {
            info!("{message}");
        }
        Ok(entries)
    }

    /// Write every step's rendered template under `directory` without
    /// touching the remote API.
    ///
    /// Each template lands at
    /// `<directory>/stack_templates/<fqn>/<name>-<version>.json`, where
    /// `version` is the first 8 hex characters of the rendered body's hash.
    pub fn dump(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        info!(directory = ?directory, "dumping \"{}\"", self.description);
        fs::create_dir_all(directory)
            .with_context(|| format!("creating dump directory {:?}", directory))?;

        let mut written = Vec::new();
        let mut outcome: Result<()> = Ok(());

        self.graph.dag().walk(|name| {
            if outcome.is_err() {
                return;
            }
            let Some(step) = self.graph.get(name) else {
                return;
            };
            match dump_step(step, directory) {
                Ok(path) => written.push(path),
                Err(err) => outcome = Err(err),
            }
        })?;

        outcome.map(|()| written)
    }
}

fn dump_step(step: &Step, directory: &Path) -> Result<PathBuf> {
    let stack = step.stack();
    let rendered = stack.render_template()?;
    let version: String = blake3::hash(rendered.as_bytes())
        .to_hex()
        .chars()
        .take(8)
        .collect();

    let path = directory
        .join("stack_templates")
        .join(&stack.fqn)
        .join(format!("{}-{version}.json", stack.name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating template directory {:?}", parent))?;
    }

    info!(stack = %stack.name, path = ?path, "writing stack template");
    fs::write(&path, rendered).with_context(|| format!("writing template {:?}", path))?;
    Ok(path)
}
