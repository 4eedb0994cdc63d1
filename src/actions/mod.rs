// src/actions/mod.rs

//! Deploy/destroy work callbacks and the plans built from them.
//!
//! - [`deploy`] launches stacks in dependency order.
//! - [`destroy`] removes stacks in reverse dependency order.
//! - [`graph`] renders a stack graph as dot or JSON.

pub mod deploy;
pub mod destroy;
pub mod graph;

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::errors::CfnginError;
use crate::plan::{Graph, Plan, Step, watch_fn};
use crate::provider::Provider;
use crate::stack::Stack;

/// Everything a work callback needs besides the stack itself.
#[derive(Clone)]
pub struct ActionContext {
    pub provider: Arc<dyn Provider>,
    /// Process-wide cancellation (Ctrl-C).
    pub cancel: CancelToken,
    /// Delay between polls of a submitted stack.
    pub poll_interval: Duration,
    /// Attach the provider's tail as each step's watch callback.
    pub tail: bool,
}

impl ActionContext {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            cancel: CancelToken::new(),
            poll_interval: Duration::from_secs(1),
            tail: false,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_tail(mut self, tail: bool) -> Self {
        self.tail = tail;
        self
    }

    /// Attach the tail watcher to `step` when tailing is enabled.
    fn maybe_tail(&self, step: Step) -> Step {
        if !self.tail {
            return step;
        }
        let provider = Arc::clone(&self.provider);
        step.with_watch(watch_fn(move |stack: Arc<Stack>, cancel| {
            let provider = Arc::clone(&provider);
            async move {
                if let Err(err) = provider.tail_stack(&stack, cancel).await {
                    tracing::warn!(stack = %stack.name, error = %format!("{err:#}"), "tail failed");
                }
            }
        }))
    }
}

/// Restrict `graph` to `targets` (plus dependencies) when any are given.
pub fn target_graph(graph: Graph, targets: &[String]) -> Result<Graph, CfnginError> {
    if targets.is_empty() {
        return Ok(graph);
    }
    for target in targets {
        if graph.get(target).is_none() {
            return Err(CfnginError::StackNotFound(target.clone()));
        }
    }
    Ok(graph.filtered(targets)?)
}

/// Plan that creates or updates `stacks` in dependency order.
pub fn deploy_plan(
    ctx: &ActionContext,
    stacks: Vec<Stack>,
    targets: &[String],
) -> Result<Plan, CfnginError> {
    let steps = stacks
        .into_iter()
        .map(|stack| ctx.maybe_tail(Step::new(stack, "deploy", deploy::launch_stack_fn(ctx.clone()))));
    let graph = target_graph(Graph::from_steps(steps)?, targets)?;
    Ok(Plan::new("Create/Update stacks", graph))
}

/// Plan that destroys `stacks`, dependents first.
pub fn destroy_plan(
    ctx: &ActionContext,
    stacks: Vec<Stack>,
    targets: &[String],
) -> Result<Plan, CfnginError> {
    let steps = stacks
        .into_iter()
        .map(|stack| ctx.maybe_tail(Step::new(stack, "destroy", destroy::destroy_stack_fn(ctx.clone()))));
    let graph = target_graph(Graph::from_steps(steps)?.transposed(), targets)?;
    Ok(Plan::new("Destroy stacks", graph))
}
