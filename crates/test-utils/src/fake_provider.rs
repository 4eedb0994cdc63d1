use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};
use async_trait::async_trait;
use cfngin::provider::{Provider, RemoteStack, RemoteStatus, UpdateOutcome};
use cfngin::stack::Stack;
use parking_lot::Mutex;

/// A provider whose remote state is scripted per stack.
///
/// - `get_stack` pops the next scripted state; the last one repeats forever.
///   An unscripted stack does not exist.
/// - `create`/`update`/`destroy` are recorded as `"<op>:<stack>"`.
#[derive(Default)]
pub struct FakeProvider {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    states: HashMap<String, VecDeque<Option<RemoteStack>>>,
    updates: HashMap<String, UpdateOutcome>,
    failing: HashSet<(String, String)>,
    calls: Vec<String>,
}

/// Shorthand for a scripted remote state.
pub fn remote(name: &str, status: RemoteStatus) -> Option<RemoteStack> {
    Some(RemoteStack::new(name, status))
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// States returned by successive `get_stack` calls for `stack`.
    pub fn script<I>(self, stack: &str, states: I) -> Self
    where
        I: IntoIterator<Item = Option<RemoteStack>>,
    {
        self.inner
            .lock()
            .states
            .insert(stack.to_string(), states.into_iter().collect());
        self
    }

    pub fn with_update(self, stack: &str, outcome: UpdateOutcome) -> Self {
        self.inner.lock().updates.insert(stack.to_string(), outcome);
        self
    }

    /// Make `op` ("create", "update", "destroy") return an error for `stack`.
    pub fn failing(self, op: &str, stack: &str) -> Self {
        self.inner
            .lock()
            .failing
            .insert((op.to_string(), stack.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, op: &str, stack: &Stack) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(format!("{op}:{}", stack.name));
        if inner.failing.contains(&(op.to_string(), stack.name.clone())) {
            bail!("{op} failed for stack '{}'", stack.name);
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn get_stack(&self, stack: &Stack) -> Result<Option<RemoteStack>> {
        let mut inner = self.inner.lock();
        let Some(states) = inner.states.get_mut(&stack.name) else {
            return Ok(None);
        };
        let state = if states.len() > 1 {
            states.pop_front().flatten()
        } else {
            states.front().cloned().flatten()
        };
        Ok(state)
    }

    async fn create_stack(&self, stack: &Stack) -> Result<()> {
        self.record("create", stack)
    }

    async fn update_stack(&self, stack: &Stack) -> Result<UpdateOutcome> {
        self.record("update", stack)?;
        Ok(self
            .inner
            .lock()
            .updates
            .get(&stack.name)
            .copied()
            .unwrap_or(UpdateOutcome::Submitted))
    }

    async fn destroy_stack(&self, stack: &Stack) -> Result<()> {
        self.record("destroy", stack)
    }
}
