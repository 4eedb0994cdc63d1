//! Step callbacks for driving the engine without a provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cfngin::plan::status::{self, Status};
use cfngin::plan::{StepFn, step_fn};
use cfngin::stack::Stack;
use parking_lot::Mutex;

/// Always returns `status`.
pub fn returning(status: Status) -> StepFn {
    step_fn(move |_, _| {
        let status = status.clone();
        async move { Ok(status) }
    })
}

pub fn complete() -> StepFn {
    returning(status::COMPLETE)
}

pub fn failing(reason: &'static str) -> StepFn {
    returning(Status::failed(reason))
}

/// Returns an error instead of a status.
pub fn erroring(message: &'static str) -> StepFn {
    step_fn(move |_, _| async move { Err(anyhow::anyhow!(message)) })
}

pub fn panicking() -> StepFn {
    step_fn(explode)
}

async fn explode(_stack: Arc<Stack>, _status: Status) -> anyhow::Result<Status> {
    panic!("callback exploded")
}

/// Returns `statuses` in order (the last repeats) and counts invocations.
pub fn scripted(statuses: Vec<Status>) -> (StepFn, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let statuses = Arc::new(statuses);

    let func = step_fn(move |_, _| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let statuses = Arc::clone(&statuses);
        async move {
            let idx = n.min(statuses.len().saturating_sub(1));
            Ok(statuses.get(idx).cloned().unwrap_or(status::COMPLETE))
        }
    });
    (func, calls)
}

/// Appends the stack name to `log` when started, then completes after `delay`.
pub fn recording(log: Arc<Mutex<Vec<String>>>, delay: Duration) -> StepFn {
    step_fn(move |stack, _| {
        let log = Arc::clone(&log);
        async move {
            log.lock().push(stack.name.clone());
            tokio::time::sleep(delay).await;
            Ok(status::COMPLETE)
        }
    })
}

/// Tracks how many callbacks run at once; `peak` holds the maximum seen.
pub fn concurrency_probe(
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay: Duration,
) -> StepFn {
    step_fn(move |_, _| {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(status::COMPLETE)
        }
    })
}
