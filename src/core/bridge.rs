//! Scheduling bridge: dispatch blocking work onto the worker pool, then hand
//! the outcome back onto the I/O event loop.
//!
//! One request flows through three scheduling contexts:
//!
//! ```text
//! i/o thread          worker thread                i/o thread
//! ----------          -------------                ----------
//! handle(delay) ----> body sleeps `delay`
//!   (returns to         assert Worker kind
//!    the event loop)    hand-off ----------------> assert Io kind
//!                                                  emit "Delayed greetings!"
//! ```
//!
//! The dispatching I/O thread is free the moment the task is queued; the
//! hand-off is a non-blocking spawn, never a thread-occupying wait. Exactly
//! one hand-off happens per request, and both outcomes (completion and
//! interruption) travel through it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::core::delay;
use crate::core::error::BridgeError;
use crate::core::task::{Phase, Task, TaskOutcome};
use crate::core::verifier::{ThreadKind, ThreadTaxonomy};
use crate::core::worker_pool::{JobHandle, WorkerPool};
use crate::runtime::{IoScheduler, Spawn};

/// The fixed confirmation emitted for every successful request.
pub const GREETING: &str = "Delayed greetings!";

type ResultReceiver = oneshot::Receiver<Result<&'static str, BridgeError>>;

/// Orchestrates the dispatch / verify / hand-off sequence for one request
/// at a time. Holds process-scoped collaborators by handle; owns neither.
pub struct SchedulingBridge {
    pool: Arc<WorkerPool>,
    io: IoScheduler,
    taxonomy: ThreadTaxonomy,
}

impl SchedulingBridge {
    /// Assemble a bridge from its injected collaborators.
    #[must_use]
    pub fn new(pool: Arc<WorkerPool>, io: IoScheduler, taxonomy: ThreadTaxonomy) -> Self {
        Self { pool, io, taxonomy }
    }

    /// Run one request: sleep `delay` on a worker thread, then emit the
    /// greeting from an I/O thread.
    ///
    /// A zero delay takes no shortcut; every phase and both identity checks
    /// still run. If this future is dropped before the result arrives (the
    /// connection went away), the sleeping worker is interrupted and
    /// returned to the pool.
    ///
    /// # Errors
    ///
    /// - `BridgeError::Pool` if the task could not be dispatched
    /// - `BridgeError::Interrupted` if the body was cancelled mid-sleep
    /// - `BridgeError::TaskAborted` if the body panicked before emitting
    pub async fn handle(&self, delay: Duration) -> Result<&'static str, BridgeError> {
        let (job, result_rx) = self.dispatch(delay)?;
        let guard = CancelOnDrop::arm(job);
        let result = result_rx.await.map_err(|_| BridgeError::TaskAborted);
        guard.disarm();
        result?
    }

    /// Phases 1-5: build the task, dispatch its body onto the worker pool,
    /// and wire the hand-off continuation that will emit onto an I/O thread.
    fn dispatch(
        &self,
        delay: Duration,
    ) -> Result<(JobHandle, ResultReceiver), BridgeError> {
        let task = Task::new(delay);
        let task_id = task.id;
        let phase = task.phase.clone();

        let (result_tx, result_rx) = oneshot::channel::<Result<&'static str, BridgeError>>();
        let io = self.io.clone();
        let taxonomy = self.taxonomy.clone();

        debug!(task_id, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "dispatching blocking task");

        let job = self.pool.submit(move |cancel| {
            phase.advance(Phase::WorkerExecuting);
            info!(task_id, "time to go to sleep");

            let outcome = delay::run(delay, cancel);

            info!(task_id, "time to wake up");
            // Success or failure, the body must have run on a worker thread
            // and never on the event loop.
            taxonomy.assert_kind(ThreadKind::Worker);
            phase.advance(Phase::AwaitingHandoff);

            // Hand-off: schedule the continuation onto the I/O scheduler
            // regardless of which worker just finished. This is the only
            // re-entry into the event-loop world for this request.
            io.spawn(async move {
                taxonomy.assert_kind(ThreadKind::Io);
                phase.advance(Phase::IoEmitting);

                let result = match outcome {
                    TaskOutcome::Completed => {
                        phase.advance(Phase::Done);
                        Ok(GREETING)
                    }
                    TaskOutcome::Interrupted => {
                        phase.advance(Phase::Failed);
                        Err(BridgeError::Interrupted)
                    }
                };
                // The requester may have gone away; nothing to do then.
                let _ = result_tx.send(result);
            });
        })?;

        Ok((job, result_rx))
    }

    /// Statistics of the underlying worker pool.
    #[must_use]
    pub fn pool_stats(&self) -> crate::core::worker_pool::PoolStats {
        self.pool.stats()
    }
}

/// Interrupts the job if the request future is dropped before completion.
struct CancelOnDrop {
    job: Option<JobHandle>,
}

impl CancelOnDrop {
    fn arm(job: JobHandle) -> Self {
        Self { job: Some(job) }
    }

    fn disarm(mut self) {
        self.job.take();
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            debug!("request dropped before completion, interrupting blocking body");
            job.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::runtime::build_io_runtime;

    fn harness() -> (tokio::runtime::Runtime, SchedulingBridge) {
        let config = BridgeConfig::new()
            .with_worker_count(2)
            .with_io_thread_count(2);
        let taxonomy = ThreadTaxonomy::from_config(&config);
        let runtime = build_io_runtime(&config).unwrap();
        let pool = Arc::new(WorkerPool::new(&config, &taxonomy).unwrap());
        let bridge = SchedulingBridge::new(
            pool,
            IoScheduler::new(runtime.handle().clone()),
            taxonomy,
        );
        (runtime, bridge)
    }

    #[test]
    fn emits_the_greeting_for_a_short_delay() {
        let (rt, bridge) = harness();
        let greeting = rt.block_on(bridge.handle(Duration::from_millis(20))).unwrap();
        assert_eq!(greeting, GREETING);
    }

    #[test]
    fn interruption_propagates_through_the_handoff() {
        let (rt, bridge) = harness();
        rt.block_on(async {
            let (job, result_rx) = bridge.dispatch(Duration::from_secs(30)).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            job.cancel();

            // The failure still arrives via the I/O-side continuation, not
            // as a dropped channel.
            let result = result_rx.await.unwrap();
            assert!(matches!(result, Err(BridgeError::Interrupted)));
        });
    }
}
