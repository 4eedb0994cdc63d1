// src/actions/deploy.rs

//! Create/update work callback.
//!
//! The callback is re-invoked for as long as it returns a submitted status.
//! The status reason carries which operation is in flight, so each call can
//! interpret the remote state it polls.

use anyhow::Result;

use crate::actions::ActionContext;
use crate::plan::status::{self, Status, StatusCode};
use crate::plan::{StepFn, step_fn};
use crate::provider::{RemoteStack, RemoteStatus, UpdateOutcome};
use crate::stack::Stack;

pub const CREATING: &str = "creating new stack";
pub const UPDATING: &str = "updating existing stack";
pub const WAITING: &str = "waiting for stack to become available";
pub const RECREATING: &str = "destroying stack for re-creation";
pub const ROLLING_BACK: &str = "rolling back";
pub const ROLLING_BACK_NEW: &str = "rolling back new stack";
pub const ROLLED_BACK: &str = "rolled back";

pub fn launch_stack_fn(ctx: ActionContext) -> StepFn {
    step_fn(move |stack, status| {
        let ctx = ctx.clone();
        async move { launch_stack(&ctx, &stack, status).await }
    })
}

pub async fn launch_stack(ctx: &ActionContext, stack: &Stack, status: Status) -> Result<Status> {
    if ctx.cancel.is_cancelled() {
        return Ok(status::INTERRUPTED);
    }
    if !stack.enabled {
        return Ok(status::NOT_SUBMITTED);
    }

    let submitted = status.code() == StatusCode::Submitted;
    if submitted && ctx.cancel.sleep(ctx.poll_interval).await {
        return Ok(status::INTERRUPTED);
    }

    let remote = ctx.provider.get_stack(stack).await?;
    if submitted {
        return poll_launch(ctx, stack, status, remote).await;
    }

    let Some(remote) = remote else {
        ctx.provider.create_stack(stack).await?;
        return Ok(Status::submitted(CREATING));
    };

    match remote.status {
        RemoteStatus::InProgress | RemoteStatus::RollingBack => Ok(Status::submitted(WAITING)),
        RemoteStatus::Failed if stack.recreate_failed => {
            ctx.provider.destroy_stack(stack).await?;
            Ok(Status::submitted(RECREATING))
        }
        RemoteStatus::Failed => Ok(Status::failed(match remote.reason {
            Some(reason) => format!("stack is in a failed state: {reason}"),
            None => "stack is in a failed state".to_string(),
        })),
        RemoteStatus::Complete if stack.locked => Ok(status::NOT_UPDATED),
        RemoteStatus::Complete => match ctx.provider.update_stack(stack).await? {
            UpdateOutcome::NoChange => Ok(status::DID_NOT_CHANGE),
            UpdateOutcome::Submitted => Ok(Status::submitted(UPDATING)),
        },
    }
}

/// Interpret the remote state of a stack this step already submitted.
async fn poll_launch(
    ctx: &ActionContext,
    stack: &Stack,
    status: Status,
    remote: Option<RemoteStack>,
) -> Result<Status> {
    let reason = status.reason().unwrap_or_default();

    let Some(remote) = remote else {
        if reason == WAITING {
            return Ok(Status::pending(WAITING));
        }
        if reason == RECREATING {
            ctx.provider.create_stack(stack).await?;
            return Ok(Status::submitted(CREATING));
        }
        return Ok(Status::failed("stack disappeared while being provisioned"));
    };

    if reason == WAITING {
        return Ok(match remote.status {
            RemoteStatus::InProgress | RemoteStatus::RollingBack => status,
            // Someone else's operation finished; decide again from scratch.
            RemoteStatus::Complete | RemoteStatus::Failed => Status::pending(WAITING),
        });
    }

    match remote.status {
        RemoteStatus::InProgress => Ok(status),
        RemoteStatus::RollingBack if reason == CREATING || reason == ROLLING_BACK_NEW => {
            Ok(Status::submitted(ROLLING_BACK_NEW))
        }
        RemoteStatus::RollingBack => Ok(Status::submitted(ROLLING_BACK)),
        RemoteStatus::Complete if reason == ROLLING_BACK || reason == ROLLING_BACK_NEW => {
            Ok(Status::failed(ROLLED_BACK))
        }
        RemoteStatus::Complete if reason.is_empty() => Ok(status::COMPLETE),
        RemoteStatus::Complete => Ok(Status::complete(reason)),
        RemoteStatus::Failed => Ok(Status::failed(
            remote.reason.unwrap_or_else(|| "stack failed".to_string()),
        )),
    }
}
