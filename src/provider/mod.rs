// src/provider/mod.rs

//! Remote provisioning contract consumed by the deploy/destroy actions.
//!
//! The engine never talks to the provisioning system directly; work callbacks
//! call a [`Provider`] and translate the [`RemoteStack`] it reports into step
//! statuses.
//!
//! - [`shell`] implements the contract by running per-stack shell commands.
//! - [`hash`] stores content hashes used to detect unchanged stacks.

pub mod hash;
pub mod shell;

use anyhow::Result;
use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::stack::Stack;

pub use shell::ShellProvider;

/// State of a stack as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    InProgress,
    RollingBack,
    Complete,
    Failed,
}

impl RemoteStatus {
    pub fn is_in_progress(self) -> bool {
        matches!(self, RemoteStatus::InProgress)
    }

    pub fn is_rolling_back(self) -> bool {
        matches!(self, RemoteStatus::RollingBack)
    }

    pub fn is_completed(self) -> bool {
        matches!(self, RemoteStatus::Complete)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, RemoteStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStack {
    pub name: String,
    pub status: RemoteStatus,
    pub reason: Option<String>,
}

impl RemoteStack {
    pub fn new(name: impl Into<String>, status: RemoteStatus) -> Self {
        Self {
            name: name.into(),
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Result of asking the provider to update an existing stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Submitted,
    NoChange,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Current remote state, or `None` if the stack does not exist.
    async fn get_stack(&self, stack: &Stack) -> Result<Option<RemoteStack>>;

    async fn create_stack(&self, stack: &Stack) -> Result<()>;

    async fn update_stack(&self, stack: &Stack) -> Result<UpdateOutcome>;

    async fn destroy_stack(&self, stack: &Stack) -> Result<()>;

    /// Stream progress for `stack` until `cancel` fires.
    async fn tail_stack(&self, _stack: &Stack, cancel: CancelToken) -> Result<()> {
        cancel.cancelled().await;
        Ok(())
    }
}
