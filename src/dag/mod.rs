// src/dag/mod.rs

//! Generic DAG and the strategies used to walk it.
//!
//! - [`graph`] holds the mutable, always-acyclic [`Dag`] of named nodes.
//! - [`walker`] contains the serial and task-per-node traversal strategies.

pub mod graph;
pub mod walker;

pub use graph::Dag;
pub use walker::{ThreadedWalker, WalkSemaphore, Walker, walk};
