// src/actions/destroy.rs

//! Destroy work callback.

use anyhow::Result;

use crate::actions::ActionContext;
use crate::plan::status::{self, Status, StatusCode};
use crate::plan::{StepFn, step_fn};
use crate::provider::RemoteStatus;
use crate::stack::Stack;

pub const DESTROYING: &str = "submitted for destruction";
pub const DESTROYED: &str = "stack destroyed";

pub fn destroy_stack_fn(ctx: ActionContext) -> StepFn {
    step_fn(move |stack, status| {
        let ctx = ctx.clone();
        async move { destroy_stack(&ctx, &stack, status).await }
    })
}

pub async fn destroy_stack(ctx: &ActionContext, stack: &Stack, status: Status) -> Result<Status> {
    if ctx.cancel.is_cancelled() {
        return Ok(status::INTERRUPTED);
    }

    let submitted = status.code() == StatusCode::Submitted;
    if submitted && ctx.cancel.sleep(ctx.poll_interval).await {
        return Ok(status::INTERRUPTED);
    }

    let Some(remote) = ctx.provider.get_stack(stack).await? else {
        return Ok(if submitted {
            Status::complete(DESTROYED)
        } else {
            status::DOES_NOT_EXIST
        });
    };

    if submitted {
        return Ok(match remote.status {
            RemoteStatus::Failed => Status::failed(
                remote
                    .reason
                    .unwrap_or_else(|| "stack failed to destroy".to_string()),
            ),
            _ => status,
        });
    }

    ctx.provider.destroy_stack(stack).await?;
    Ok(Status::submitted(DESTROYING))
}
