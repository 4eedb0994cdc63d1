// src/provider/shell.rs

//! [`Provider`] backed by per-stack shell commands.
//!
//! - `deploy` creates or updates the stack.
//! - `destroy` removes it.
//! - `check` (optional) exits 0 when the stack already exists. Without it,
//!   an untracked stack is assumed to exist.
//!
//! Commands are spawned without waiting; `get_stack` polls the child so the
//! deploy/destroy callbacks see `InProgress` until it exits, exactly as they
//! would for a remote provisioning API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::provider::hash::{HashStore, compute_stack_hash};
use crate::provider::{Provider, RemoteStack, RemoteStatus, UpdateOutcome};
use crate::stack::Stack;
use crate::types::StackName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Deploy,
    Destroy,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Deploy => "deploy",
            Operation::Destroy => "destroy",
        }
    }
}

/// A spawned command and, once it exited, its exit status.
struct Tracked {
    op: Operation,
    child: Child,
    exit: Option<ExitStatus>,
    /// Hash recorded once a deploy succeeds.
    hash: Option<String>,
}

impl Tracked {
    fn poll(&mut self) -> Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self
                .child
                .try_wait()
                .with_context(|| format!("polling {} command", self.op.label()))?;
        }
        Ok(self.exit)
    }
}

pub struct ShellProvider {
    root: PathBuf,
    processes: Mutex<HashMap<StackName, Tracked>>,
    hashes: Mutex<Box<dyn HashStore>>,
    output: Mutex<HashMap<StackName, broadcast::Sender<String>>>,
}

impl ShellProvider {
    /// Commands run with `root` as their working directory.
    pub fn new(root: PathBuf, hashes: Box<dyn HashStore>) -> Self {
        Self {
            root,
            processes: Mutex::new(HashMap::new()),
            hashes: Mutex::new(hashes),
            output: Mutex::new(HashMap::new()),
        }
    }

    fn output_sender(&self, stack: &str) -> broadcast::Sender<String> {
        self.output
            .lock()
            .entry(stack.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }

    fn shell_command(&self, stack: &Stack, cmd: &str) -> Command {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmd);
            c
        };

        command
            .current_dir(&self.root)
            .env("CFNGIN_STACK_NAME", &stack.name)
            .env("CFNGIN_STACK_FQN", &stack.fqn);
        if let Some(path) = &stack.template_path {
            command.env("CFNGIN_TEMPLATE", path);
        }
        for (key, value) in &stack.parameters {
            command.env(format!("CFNGIN_PARAM_{}", key.to_uppercase()), value);
        }
        command
    }

    fn spawn(&self, stack: &Stack, op: Operation, cmd: &str, hash: Option<String>) -> Result<()> {
        info!(stack = %stack.name, op = op.label(), cmd = %cmd, "starting stack command");

        let mut command = self.shell_command(stack, cmd);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .with_context(|| format!("spawning {} command for stack '{}'", op.label(), stack.name))?;

        let sender = self.output_sender(&stack.name);
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stack.name.clone(), stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stack.name.clone(), stderr, sender);
        }

        self.processes.lock().insert(
            stack.name.clone(),
            Tracked {
                op,
                child,
                exit: None,
                hash,
            },
        );
        Ok(())
    }

    /// State of a stack whose command this provider spawned, if any.
    ///
    /// `Some(None)` means the tracked command destroyed the stack.
    fn tracked_state(&self, stack: &Stack) -> Result<Option<Option<RemoteStack>>> {
        let mut processes = self.processes.lock();
        let Some(tracked) = processes.get_mut(&stack.name) else {
            return Ok(None);
        };

        let remote = match (tracked.op, tracked.poll()?) {
            (_, None) => Some(RemoteStack::new(&stack.name, RemoteStatus::InProgress)),
            (Operation::Deploy, Some(exit)) if exit.success() => {
                if let Some(hash) = tracked.hash.take() {
                    self.hashes.lock().save(&stack.name, &hash)?;
                }
                Some(RemoteStack::new(&stack.name, RemoteStatus::Complete))
            }
            (Operation::Destroy, Some(exit)) if exit.success() => {
                self.hashes.lock().remove(&stack.name)?;
                None
            }
            (op, Some(exit)) => Some(
                RemoteStack::new(&stack.name, RemoteStatus::Failed).with_reason(format!(
                    "{} command exited with code {}",
                    op.label(),
                    exit.code().unwrap_or(-1)
                )),
            ),
        };
        Ok(Some(remote))
    }
}

#[async_trait]
impl Provider for ShellProvider {
    async fn get_stack(&self, stack: &Stack) -> Result<Option<RemoteStack>> {
        if let Some(state) = self.tracked_state(stack)? {
            return Ok(state);
        }

        let Some(check) = &stack.check else {
            return Ok(Some(RemoteStack::new(&stack.name, RemoteStatus::Complete)));
        };

        let status = self
            .shell_command(stack, check)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("running check command for stack '{}'", stack.name))?;
        debug!(stack = %stack.name, exists = status.success(), "check command finished");

        Ok(status
            .success()
            .then(|| RemoteStack::new(&stack.name, RemoteStatus::Complete)))
    }

    async fn create_stack(&self, stack: &Stack) -> Result<()> {
        let Some(cmd) = &stack.deploy else {
            bail!("stack '{}' has no deploy command", stack.name);
        };
        let hash = compute_stack_hash(stack)?;
        self.spawn(stack, Operation::Deploy, cmd, Some(hash))
    }

    async fn update_stack(&self, stack: &Stack) -> Result<UpdateOutcome> {
        let Some(cmd) = &stack.deploy else {
            return Ok(UpdateOutcome::NoChange);
        };

        let hash = compute_stack_hash(stack)?;
        if self.hashes.lock().load(&stack.name)?.as_deref() == Some(hash.as_str()) {
            debug!(stack = %stack.name, "stack hash unchanged; skipping update");
            return Ok(UpdateOutcome::NoChange);
        }

        self.spawn(stack, Operation::Deploy, cmd, Some(hash))?;
        Ok(UpdateOutcome::Submitted)
    }

    async fn destroy_stack(&self, stack: &Stack) -> Result<()> {
        let Some(cmd) = &stack.destroy else {
            bail!("stack '{}' has no destroy command", stack.name);
        };
        self.spawn(stack, Operation::Destroy, cmd, None)
    }

    async fn tail_stack(&self, stack: &Stack, cancel: CancelToken) -> Result<()> {
        let mut rx = self.output_sender(&stack.name).subscribe();
        info!(stack = %stack.name, "tailing stack output");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                line = rx.recv() => match line {
                    Ok(line) => info!(stack = %stack.name, "{line}"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(stack = %stack.name, skipped, "tail fell behind; lines dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        Ok(())
    }
}

/// Log every line of `reader` at debug and broadcast it to tail subscribers.
fn forward_lines<R>(stack: StackName, reader: R, sender: broadcast::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(stack = %stack, "output: {}", line);
            // No subscribers is fine; the line was already logged.
            let _ = sender.send(line);
        }
    });
}
