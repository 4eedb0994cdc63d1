// src/plan/step.rs

//! Per-stack state machine.
//!
//! A [`Step`] repeatedly invokes its work callback with the current status
//! until a terminal status comes back. Errors and panics raised by the
//! callback become a `Failed` status; they never escape `run`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use colored::Colorize;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::plan::status::{self, Status, StatusCode};
use crate::stack::Stack;

/// Unit of work: called with the stack and its current status, returns the
/// next status.
pub type StepFn = Arc<
    dyn Fn(Arc<Stack>, Status) -> Pin<Box<dyn Future<Output = anyhow::Result<Status>> + Send>>
        + Send
        + Sync,
>;

/// Observer run alongside a step for the duration of [`Step::run`].
pub type WatchFn =
    Arc<dyn Fn(Arc<Stack>, CancelToken) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`StepFn`].
pub fn step_fn<F, Fut>(f: F) -> StepFn
where
    F: Fn(Arc<Stack>, Status) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Status>> + Send + 'static,
{
    Arc::new(move |stack, status| Box::pin(f(stack, status)))
}

/// Wrap an async closure as a [`WatchFn`].
pub fn watch_fn<F, Fut>(f: F) -> WatchFn
where
    F: Fn(Arc<Stack>, CancelToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |stack, cancel| Box::pin(f(stack, cancel)))
}

#[derive(Debug)]
struct StepState {
    status: Status,
    last_updated: DateTime<Utc>,
}

pub struct Step {
    stack: Arc<Stack>,
    action: String,
    func: StepFn,
    watch_func: Option<WatchFn>,
    state: Mutex<StepState>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.stack.name)
            .field("action", &self.action)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Step {
    pub fn new(stack: impl Into<Arc<Stack>>, action: impl Into<String>, func: StepFn) -> Self {
        Self {
            stack: stack.into(),
            action: action.into(),
            func,
            watch_func: None,
            state: Mutex::new(StepState {
                status: status::PENDING,
                last_updated: Utc::now(),
            }),
        }
    }

    /// A step whose callback does nothing but complete.
    ///
    /// Used for graph-only work such as export and outlines.
    pub fn noop(stack: impl Into<Arc<Stack>>) -> Self {
        Self::new(
            stack,
            "noop",
            step_fn(|_, _| async { Ok(status::COMPLETE) }),
        )
    }

    pub fn with_watch(mut self, watch_func: WatchFn) -> Self {
        self.watch_func = Some(watch_func);
        self
    }

    pub fn name(&self) -> &str {
        &self.stack.name
    }

    pub fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }

    /// Name of the action the callback performs (shown in outlines).
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn requires(&self) -> &[String] {
        &self.stack.requires
    }

    pub fn required_by(&self) -> &[String] {
        &self.stack.required_by
    }

    pub fn status(&self) -> Status {
        self.state.lock().status.clone()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.state.lock().last_updated
    }

    pub fn completed(&self) -> bool {
        self.state.lock().status.code() == StatusCode::Complete
    }

    pub fn skipped(&self) -> bool {
        self.state.lock().status.code() == StatusCode::Skipped
    }

    pub fn failed(&self) -> bool {
        self.state.lock().status.code() == StatusCode::Failed
    }

    /// Handed off to the remote system at least once.
    pub fn submitted(&self) -> bool {
        self.state.lock().status.code() >= StatusCode::Submitted
    }

    pub fn done(&self) -> bool {
        self.state.lock().status.is_terminal()
    }

    pub fn ok(&self) -> bool {
        self.state.lock().status.is_ok()
    }

    /// Drive the callback until a terminal status is reached.
    ///
    /// The watch callback, if any, runs for the whole call and is always
    /// cancelled and awaited before returning. Returns [`Step::ok`].
    pub async fn run(&self) -> bool {
        let watcher = self.watch_func.as_ref().map(|watch_func| {
            let cancel = CancelToken::new();
            let handle = tokio::spawn(watch_func(Arc::clone(&self.stack), cancel.clone()));
            (cancel, handle)
        });

        while !self.done() {
            self.run_once().await;
        }

        if let Some((cancel, handle)) = watcher {
            cancel.cancel();
            if let Err(err) = handle.await {
                warn!(step = %self.name(), error = %err, "watch callback did not finish cleanly");
            }
        }

        self.ok()
    }

    /// Invoke the callback once and record the status it returns.
    pub async fn run_once(&self) -> Status {
        let current = self.status();
        let call = (self.func)(Arc::clone(&self.stack), current);

        let next = match tokio::spawn(call).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                error!(step = %self.name(), error = %format!("{err:#}"), "step callback failed");
                Status::failed(err.to_string())
            }
            Err(join_err) => {
                error!(step = %self.name(), error = %join_err, "step callback panicked");
                Status::failed(join_err.to_string())
            }
        };

        self.set_status(next.clone());
        next
    }

    /// Record `status`; a no-op when it equals the current one.
    pub fn set_status(&self, status: Status) {
        {
            let mut state = self.state.lock();
            if state.status == status {
                return;
            }
            debug!(step = %self.name(), status = %status.name(), "setting step status");
            state.status = status;
            state.last_updated = Utc::now();
        }

        if self.stack.logging {
            self.log_step();
        }
    }

    pub fn complete(&self) {
        self.set_status(status::COMPLETE);
    }

    pub fn skip(&self) {
        self.set_status(status::SKIPPED);
    }

    pub fn submit(&self) {
        self.set_status(status::SUBMITTED);
    }

    pub fn log_step(&self) {
        let status = self.status();
        let mut msg = format!("{}:{}", self.name(), status.name());
        if let Some(reason) = status.reason() {
            msg.push_str(&format!(" ({reason})"));
        }

        match status.code() {
            StatusCode::Submitted => info!("{}", msg.yellow()),
            StatusCode::Complete => info!("{}", msg.green()),
            StatusCode::Failed => error!("{}", msg.red()),
            StatusCode::Pending | StatusCode::Skipped => info!("{msg}"),
        }
    }
}
