// src/dag/walker.rs

//! Traversal strategies over a [`Dag`].
//!
//! Every strategy calls `walk_func` exactly once per node, and never before
//! all of the node's transitive dependencies have been walked. Strategies
//! differ only in how much work may be in flight at once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::dag::Dag;
use crate::errors::DagError;

/// Walk the graph one node at a time in execution order.
pub async fn walk<F, Fut>(dag: &Dag, walk_func: F) -> Result<(), DagError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = ()>,
{
    for node in dag.walk_order()? {
        walk_func(node).await;
    }
    Ok(())
}

/// Gate limiting how many nodes run at the same time.
#[derive(Debug, Clone)]
pub enum WalkSemaphore {
    /// Never blocks.
    Unlimited,
    Bounded(Arc<Semaphore>),
}

impl WalkSemaphore {
    pub fn unlimited() -> Self {
        WalkSemaphore::Unlimited
    }

    /// A gate admitting at most `permits` nodes (minimum 1).
    pub fn bounded(permits: usize) -> Self {
        WalkSemaphore::Bounded(Arc::new(Semaphore::new(permits.max(1))))
    }

    /// The permit is released when dropped, whatever the walked node did.
    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match self {
            WalkSemaphore::Unlimited => None,
            WalkSemaphore::Bounded(sem) => Arc::clone(sem).acquire_owned().await.ok(),
        }
    }
}

/// Runs one task per node; each task waits on the completion signals of the
/// node's transitive dependencies before acquiring the semaphore.
#[derive(Debug, Clone)]
pub struct ThreadedWalker {
    semaphore: WalkSemaphore,
}

impl ThreadedWalker {
    pub fn new(semaphore: WalkSemaphore) -> Self {
        Self { semaphore }
    }

    pub async fn walk<F, Fut>(&self, dag: &Dag, walk_func: F) -> Result<(), DagError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let walk_func = Arc::new(walk_func);
        let mut finished: HashMap<String, watch::Receiver<bool>> = HashMap::new();
        let mut tasks = JoinSet::new();

        // Execution order guarantees every dependency already has a signal.
        for node in dag.walk_order()? {
            let waits: Vec<watch::Receiver<bool>> = dag
                .all_downstreams(&node)?
                .iter()
                .filter_map(|dep| finished.get(dep).cloned())
                .collect();

            let (done_tx, done_rx) = watch::channel(false);
            finished.insert(node.clone(), done_rx);

            let semaphore = self.semaphore.clone();
            let walk_func = Arc::clone(&walk_func);

            tasks.spawn(async move {
                for mut dep in waits {
                    // A dropped sender means that task died; it is done either way.
                    let _ = dep.wait_for(|done| *done).await;
                }

                let _permit = semaphore.acquire().await;
                debug!(node = %node, "walking node");
                walk_func(node).await;
                let _ = done_tx.send(true);
            });
        }

        while let Some(res) = tasks.join_next().await {
            if let Err(err) = res {
                warn!(error = %err, "walker task did not finish cleanly");
            }
        }

        Ok(())
    }
}

/// Walker selected from a concurrency setting.
#[derive(Debug, Clone)]
pub enum Walker {
    Serial,
    Threaded(ThreadedWalker),
}

impl Walker {
    /// `1` walks serially, `0` walks with unbounded parallelism, and any
    /// other value bounds the number of nodes in flight.
    pub fn from_concurrency(concurrency: usize) -> Self {
        match concurrency {
            1 => Walker::Serial,
            0 => Walker::Threaded(ThreadedWalker::new(WalkSemaphore::unlimited())),
            n => Walker::Threaded(ThreadedWalker::new(WalkSemaphore::bounded(n))),
        }
    }

    pub async fn walk<F, Fut>(&self, dag: &Dag, walk_func: F) -> Result<(), DagError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match self {
            Walker::Serial => walk(dag, walk_func).await,
            Walker::Threaded(walker) => walker.walk(dag, walk_func).await,
        }
    }
}
