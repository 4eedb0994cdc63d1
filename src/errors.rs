// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DagError`] is raised synchronously by DAG mutation and sorting.
//! - [`GraphError`] wraps a [`DagError`] with the stack/dependency that caused
//!   it while a planning graph is being built, or names a duplicate stack.
//! - [`PlanFailed`] is the single aggregated failure of a plan execution.
//! - [`CfnginError`] is what the application layer propagates.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    #[error("node '{0}' already exists")]
    NodeExists(String),

    #[error("node '{0}' does not exist in graph")]
    NodeNotFound(String),

    #[error("edge '{ind}' -> '{dep}' does not exist in graph")]
    EdgeNotFound { ind: String, dep: String },

    #[error("DAG validation failed: {0}")]
    Validation(String),

    #[error("graph is not acyclic")]
    NotAcyclic,
}

/// Raised while building a planning graph from declared dependencies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("stack '{0}' is declared more than once")]
    DuplicateStep(String),

    #[error("error detected when adding '{dependency}' as a dependency of '{stack}': {source}")]
    Dependency {
        stack: String,
        dependency: String,
        #[source]
        source: DagError,
    },
}

/// Raised once after a full plan walk when one or more steps failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("the following steps failed: {}", failed.join(", "))]
pub struct PlanFailed {
    pub failed: Vec<String>,
}

#[derive(Error, Debug)]
pub enum CfnginError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Cycle detected in stack graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    PlanFailed(#[from] PlanFailed),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CfnginError>;
