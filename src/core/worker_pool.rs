//! Bounded worker pool with dedicated OS threads for blocking work.
//!
//! The pool is a process-wide resource: exactly N long-lived threads created
//! once at startup, never resized, torn down at shutdown. Work queues when
//! all workers are busy (the queue is intentionally unbounded in this
//! design; a bounded queue with an explicit rejection policy is the named
//! hardening point for sustained overload).
//!
//! # Design
//!
//! - **No polling**: workers block on channel recv; dropping the sender
//!   unblocks them naturally at shutdown
//! - **Deterministic names**: every thread is `<prefix><k>` with `k` drawn
//!   from an atomic counter shared across the pool's lifetime, so the
//!   thread-identity verifier can classify workers by name alone
//! - **Panic containment**: a panicking body is captured, counted as failed,
//!   and logged; the worker thread stays available for the next submission

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::core::error::PoolError;
use crate::core::task::CancelToken;
use crate::core::verifier::ThreadTaxonomy;

/// A unit of blocking work. Receives the cancellation token so the body can
/// honor interruption.
type Job = Box<dyn FnOnce(&CancelToken) + Send + 'static>;

struct QueuedJob {
    job: Job,
    cancel: CancelToken,
}

/// Handle returned by [`WorkerPool::submit`].
///
/// The only operation on in-flight work is cancellation; completion is
/// observed through whatever channel the submitted closure reports on.
#[derive(Debug, Clone)]
pub struct JobHandle {
    cancel: CancelToken,
}

impl JobHandle {
    /// Deliver the cancellation signal to the job, whether it is still
    /// queued or already sleeping on a worker thread.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Total jobs submitted.
    pub submitted: u64,
    /// Jobs waiting in the queue.
    pub queued: u64,
    /// Jobs currently executing.
    pub active: u64,
    /// Jobs that ran to completion.
    pub completed: u64,
    /// Jobs whose body panicked.
    pub failed: u64,
}

/// Lock-free counters backing [`PoolStats`].
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    queued: AtomicU64,
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            submitted: self.submitted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-size pool of blocking-capable OS threads.
pub struct WorkerPool {
    worker_count: usize,
    /// Job sender. `None` once shut down; dropping it unblocks workers.
    job_tx: Mutex<Option<Sender<QueuedJob>>>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool with `config.worker_count` threads named
    /// `<worker_thread_prefix><k>`.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` for invalid configuration and
    /// `PoolError::Spawn` if the OS refuses a thread.
    pub fn new(config: &BridgeConfig, taxonomy: &ThreadTaxonomy) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (job_tx, job_rx) = unbounded::<QueuedJob>();
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        // Name indices come from one counter for the pool's whole lifetime:
        // strictly increasing, never reused even if a worker were replaced.
        let name_seq = Arc::new(AtomicU64::new(0));

        let mut workers = Vec::with_capacity(config.worker_count);
        for _ in 0..config.worker_count {
            let worker = spawn_worker(
                taxonomy.worker_prefix(),
                &name_seq,
                config.thread_stack_size,
                job_rx.clone(),
                Arc::clone(&counters),
                Arc::clone(&shutdown),
            )?;
            workers.push(worker);
        }

        info!(
            worker_count = config.worker_count,
            prefix = taxonomy.worker_prefix(),
            "worker pool initialized with dedicated OS threads"
        );

        Ok(Self {
            worker_count: config.worker_count,
            job_tx: Mutex::new(Some(job_tx)),
            counters,
            shutdown,
            workers: Mutex::new(workers),
        })
    }

    /// Submit a unit of blocking work.
    ///
    /// Enqueueing never blocks the caller: the work executes on one of the
    /// pool's threads, queueing behind in-flight jobs when all are busy.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Shutdown` once the pool has been shut down.
    pub fn submit<F>(&self, work: F) -> Result<JobHandle, PoolError>
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::Shutdown);
        }

        let cancel = CancelToken::new();
        let queued = QueuedJob {
            job: Box::new(work),
            cancel: cancel.clone(),
        };

        let job_tx_guard = self.job_tx.lock();
        let Some(job_tx) = job_tx_guard.as_ref() else {
            return Err(PoolError::Shutdown);
        };

        // Unbounded queue: send only fails if every receiver is gone.
        if job_tx.send(queued).is_err() {
            return Err(PoolError::Shutdown);
        }

        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        Ok(JobHandle { cancel })
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.worker_count)
    }

    /// Shut down the pool gracefully.
    ///
    /// Drops the sender to unblock idle workers, then joins each worker with
    /// a per-worker timeout. Workers that do not exit in time are detached.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return; // Already shut down.
        }

        info!("shutting down worker pool");

        {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
        }

        let mut workers = self.workers.lock();
        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(true) => debug!(worker = idx, "worker joined"),
                Ok(false) => warn!(worker = idx, "worker panicked during shutdown"),
                Err(_) => {
                    warn!(worker = idx, "worker did not exit within timeout, detaching");
                    continue;
                }
            }

            let _ = join_thread.join();
        }

        info!("worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Daemon semantics: the process may exit without waiting for the
        // workers. Signal shutdown and detach; explicit shutdown() is the
        // graceful path.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            let mut job_tx = self.job_tx.lock();
            *job_tx = None;
            debug!("worker pool dropped without explicit shutdown, detaching workers");
        }
    }
}

fn spawn_worker(
    prefix: &str,
    name_seq: &Arc<AtomicU64>,
    stack_size: usize,
    job_rx: Receiver<QueuedJob>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, PoolError> {
    let index = name_seq.fetch_add(1, Ordering::Relaxed) + 1;
    let name = format!("{prefix}{index}");

    let handle = thread::Builder::new()
        .name(name)
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker = index, "worker thread started");

            // Blocking recv; returns Err once the sender is dropped.
            while let Ok(queued) = job_rx.recv() {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                counters.queued.fetch_sub(1, Ordering::Relaxed);
                counters.active.fetch_add(1, Ordering::Relaxed);

                let QueuedJob { job, cancel } = queued;
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&cancel)));

                counters.active.fetch_sub(1, Ordering::Relaxed);
                match outcome {
                    Ok(()) => {
                        counters.completed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(payload) => {
                        // The thread survives a panicking body; the failure
                        // is attached to the originating task by whoever
                        // observes its dropped response channel.
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            worker = index,
                            panic = panic_message(payload.as_ref()),
                            "blocking body panicked; worker remains available"
                        );
                    }
                }
            }

            debug!(worker = index, "worker thread exiting");
        })?;

    Ok(handle)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;

    fn test_pool(worker_count: usize) -> WorkerPool {
        let config = BridgeConfig::new().with_worker_count(worker_count);
        let taxonomy = ThreadTaxonomy::from_config(&config);
        WorkerPool::new(&config, &taxonomy).unwrap()
    }

    #[test]
    fn executes_work_on_a_named_worker_thread() {
        let pool = test_pool(2);
        let (tx, rx) = mpsc::channel();

        pool.submit(move |_cancel| {
            let name = thread::current().name().unwrap_or("").to_string();
            tx.send(name).unwrap();
        })
        .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(name.starts_with("blocking-worker-"), "got `{name}`");
    }

    #[test]
    fn worker_thread_names_are_unique() {
        let pool = test_pool(4);
        let (tx, rx) = mpsc::channel();
        let barrier = Arc::new(std::sync::Barrier::new(4));

        // Hold all four workers at a barrier so each reports its own name.
        for _ in 0..4 {
            let tx = tx.clone();
            let barrier = Arc::clone(&barrier);
            pool.submit(move |_cancel| {
                barrier.wait();
                let name = thread::current().name().unwrap_or("").to_string();
                tx.send(name).unwrap();
            })
            .unwrap();
        }

        let mut names = HashSet::new();
        for _ in 0..4 {
            let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert!(name.starts_with("blocking-worker-"));
            assert!(names.insert(name), "duplicate worker name");
        }
    }

    #[test]
    fn panicking_body_leaves_worker_usable() {
        let pool = test_pool(1);

        pool.submit(|_cancel| panic!("boom")).unwrap();

        // The single worker must survive and run the next job.
        let (tx, rx) = mpsc::channel();
        pool.submit(move |_cancel| tx.send(()).unwrap()).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Counters tick after the body returns; give the worker a beat.
        thread::sleep(Duration::from_millis(100));
        let stats = pool.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.submitted, 2);
    }

    #[test]
    fn cancellation_reaches_the_executing_job() {
        let pool = test_pool(1);
        let (tx, rx) = mpsc::channel();

        let handle = pool
            .submit(move |cancel| {
                let outcome = crate::core::delay::run(Duration::from_secs(30), cancel);
                tx.send(outcome).unwrap();
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        handle.cancel();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, crate::core::task::TaskOutcome::Interrupted);
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let pool = test_pool(1);
        pool.shutdown();
        let result = pool.submit(|_cancel| {});
        assert!(matches!(result, Err(PoolError::Shutdown)));
    }

    #[test]
    fn queued_work_runs_when_a_worker_frees_up() {
        let pool = test_pool(1);
        let (tx, rx) = mpsc::channel();

        for i in 0..3 {
            let tx = tx.clone();
            pool.submit(move |_cancel| {
                thread::sleep(Duration::from_millis(20));
                tx.send(i).unwrap();
            })
            .unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        }
        // One worker drains the queue in submission order.
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
