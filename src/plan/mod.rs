// src/plan/mod.rs

//! Planning and execution.
//!
//! - [`status`] defines the ordered status values a step moves through.
//! - [`step`] is the per-stack state machine driving a work callback.
//! - [`graph`] builds the dependency graph of steps.
//! - [`core`] holds the [`Plan`] that executes, outlines, or dumps a graph.

pub mod core;
pub mod graph;
pub mod status;
pub mod step;

pub use self::core::{OutlineEntry, Plan};
pub use graph::Graph;
pub use status::{Status, StatusCode};
pub use step::{Step, StepFn, WatchFn, step_fn, watch_fn};
