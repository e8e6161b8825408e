//! Integration tests for the scheduling bridge.
//!
//! These exercise the full dispatch / verify / hand-off pipeline against a
//! real worker pool and a real multi-threaded I/O runtime with named
//! event-loop threads. The thread-identity assertions run live inside the
//! bridge on every request; a violation panics the body and fails the test
//! through the `TaskAborted` path, so a passing test doubles as proof the
//! phase discipline held.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nio_bridge::config::BridgeConfig;
use nio_bridge::core::{SchedulingBridge, ThreadTaxonomy, WorkerPool, GREETING};
use nio_bridge::runtime::{build_io_runtime, IoScheduler};

fn harness(worker_count: usize) -> (tokio::runtime::Runtime, Arc<SchedulingBridge>) {
    let config = BridgeConfig::new()
        .with_worker_count(worker_count)
        .with_io_thread_count(2);
    let taxonomy = ThreadTaxonomy::from_config(&config);
    let runtime = build_io_runtime(&config).unwrap();
    let pool = Arc::new(WorkerPool::new(&config, &taxonomy).unwrap());
    let bridge = Arc::new(SchedulingBridge::new(
        pool,
        IoScheduler::new(runtime.handle().clone()),
        taxonomy,
    ));
    (runtime, bridge)
}

#[test]
fn greeting_arrives_after_the_requested_delay() {
    let (rt, bridge) = harness(2);
    let delay = Duration::from_millis(300);

    let stopwatch = Instant::now();
    let greeting = rt.block_on(bridge.handle(delay)).unwrap();

    assert_eq!(greeting, GREETING);
    assert!(stopwatch.elapsed() >= delay);
}

#[test]
fn zero_delay_traverses_the_full_pipeline() {
    let (rt, bridge) = harness(2);

    // No shortcut for zero: the request still crosses to a worker thread
    // and back. Success implies both identity checks and all four phase
    // transitions ran, since any skipped or misplaced phase panics the body.
    let greeting = rt.block_on(bridge.handle(Duration::ZERO)).unwrap();
    assert_eq!(greeting, GREETING);

    // The completed counter ticks when the worker closure returns, which can
    // trail the result emission by a hair.
    std::thread::sleep(Duration::from_millis(100));
    let stats = bridge.pool_stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 0);
}

#[test]
fn concurrent_requests_share_wall_clock() {
    let (rt, bridge) = harness(10);
    let delay = Duration::from_millis(500);
    let requests = 8;

    let stopwatch = Instant::now();
    let results = rt.block_on(async {
        let futures = (0..requests).map(|_| {
            let bridge = Arc::clone(&bridge);
            async move { bridge.handle(delay).await }
        });
        futures::future::join_all(futures).await
    });
    let elapsed = stopwatch.elapsed();

    for result in results {
        assert_eq!(result.unwrap(), GREETING);
    }
    // Eight half-second sleeps on ten workers finish in roughly one sleep's
    // time, nowhere near the serialized 4 seconds.
    assert!(elapsed >= delay);
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[test]
fn requests_complete_out_of_submission_order() {
    let (rt, bridge) = harness(2);

    rt.block_on(async {
        let slow = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge.handle(Duration::from_millis(600)).await.unwrap();
                Instant::now()
            })
        };
        // Submit the fast request strictly after the slow one.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge.handle(Duration::from_millis(50)).await.unwrap();
                Instant::now()
            })
        };

        let slow_done = slow.await.unwrap();
        let fast_done = fast.await.unwrap();
        assert!(fast_done < slow_done, "independent requests must not serialize");
    });
}

#[test]
fn dropped_request_interrupts_the_sleep_and_frees_the_worker() {
    // A single worker: if cancellation leaked the thread, the follow-up
    // request could not complete until the 30s sleep ran out.
    let (rt, bridge) = harness(1);

    rt.block_on(async {
        let doomed = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.handle(Duration::from_secs(30)).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Dropping the request future delivers the cancellation signal.
        doomed.abort();
        let _ = doomed.await;

        let stopwatch = Instant::now();
        let greeting = bridge.handle(Duration::ZERO).await.unwrap();
        assert_eq!(greeting, GREETING);
        assert!(
            stopwatch.elapsed() < Duration::from_secs(5),
            "worker was not returned to the pool"
        );
    });
}

#[test]
fn pool_stats_track_completed_requests() {
    let (rt, bridge) = harness(3);

    for _ in 0..5 {
        rt.block_on(bridge.handle(Duration::from_millis(10))).unwrap();
    }

    std::thread::sleep(Duration::from_millis(100));
    let stats = bridge.pool_stats();
    assert_eq!(stats.worker_count, 3);
    assert_eq!(stats.submitted, 5);
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.active, 0);
}
