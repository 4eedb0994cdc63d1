mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cfngin::dag::{Dag, ThreadedWalker, WalkSemaphore, Walker, walk};
use cfngin_test_utils::with_timeout;
use common::{basic_dag, position};
use parking_lot::Mutex;

/// Walk `dag` and return the `start:<node>` / `end:<node>` event log.
async fn walk_events(walker: &Walker, dag: &Dag) -> Vec<String> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);

    walker
        .walk(dag, move |node| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("start:{node}"));
                tokio::time::sleep(Duration::from_millis(5)).await;
                log.lock().push(format!("end:{node}"));
            }
        })
        .await
        .unwrap();

    let events = events.lock().clone();
    events
}

fn assert_dependencies_finish_first(dag: &Dag, events: &[String]) {
    for node in dag.nodes() {
        let started = position(events, &format!("start:{node}"));
        for dep in dag.all_downstreams(node).unwrap() {
            let finished = position(events, &format!("end:{dep}"));
            assert!(
                finished < started,
                "{dep} must finish before {node} starts: {events:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_serial_walk_follows_execution_order() {
    let dag = basic_dag();
    let seen = Mutex::new(Vec::new());

    walk(&dag, |node| {
        seen.lock().push(node);
        async {}
    })
    .await
    .unwrap();

    assert_eq!(*seen.lock(), vec!["d", "c", "b", "a"]);
}

#[tokio::test]
async fn test_every_walker_respects_dependencies() {
    let dag = basic_dag();

    for concurrency in [0, 1, 2, 8] {
        let walker = Walker::from_concurrency(concurrency);
        let events = with_timeout(walk_events(&walker, &dag)).await;

        assert_eq!(events.len(), 8, "concurrency {concurrency}: {events:?}");
        assert_dependencies_finish_first(&dag, &events);
    }
}

#[tokio::test]
async fn test_from_concurrency_selects_strategy() {
    assert!(matches!(Walker::from_concurrency(1), Walker::Serial));
    assert!(matches!(
        Walker::from_concurrency(0),
        Walker::Threaded(_)
    ));
    assert!(matches!(
        Walker::from_concurrency(4),
        Walker::Threaded(_)
    ));
}

async fn peak_concurrency(semaphore: WalkSemaphore, width: usize) -> usize {
    let nodes: Vec<(String, Vec<String>)> =
        (0..width).map(|i| (format!("n{i}"), Vec::new())).collect();
    let dag = Dag::from_dict(nodes).unwrap();

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));

    ThreadedWalker::new(semaphore)
        .walk(&dag, move |_| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await
        .unwrap();

    peak.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_bounded_semaphore_caps_parallelism() {
    let peak = with_timeout(peak_concurrency(WalkSemaphore::bounded(2), 6)).await;
    assert!(peak <= 2, "peak was {peak}");
    assert!(peak >= 1);
}

#[tokio::test]
async fn test_unlimited_semaphore_runs_independent_nodes_together() {
    let peak = with_timeout(peak_concurrency(WalkSemaphore::unlimited(), 6)).await;
    assert_eq!(peak, 6);
}

#[tokio::test]
async fn test_walking_an_empty_graph_is_a_noop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    Walker::from_concurrency(0)
        .walk(&Dag::new(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
