//! Handle to the externally-owned I/O event-loop scheduler.
//!
//! The bridge never owns the event loop's lifecycle; it holds a read-only
//! handle used for exactly one thing: scheduling the result-emission
//! continuation back onto an I/O thread after the blocking body finishes.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::BridgeConfig;

/// Abstraction for scheduling a continuation onto a runtime.
pub trait Spawn {
    /// Schedule `fut` without blocking the calling thread.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Clone-able handle onto the tokio runtime that drives non-blocking I/O.
#[derive(Clone)]
pub struct IoScheduler {
    handle: Arc<tokio::runtime::Handle>,
}

impl IoScheduler {
    /// Wrap an existing runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Wrap the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, as
    /// `tokio::runtime::Handle::current` does.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Spawn for IoScheduler {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}

/// Build the multi-threaded I/O runtime with deterministically named
/// event-loop threads (`<io_thread_prefix><k>`).
///
/// The naming matters: it is what lets the thread-identity verifier
/// recognize event-loop threads. The bridge core never calls this; sizing
/// and owning the runtime is the binary's (or test harness's) job.
///
/// # Errors
///
/// Returns the underlying I/O error if the runtime cannot be built.
pub fn build_io_runtime(config: &BridgeConfig) -> io::Result<tokio::runtime::Runtime> {
    let prefix = config.io_thread_prefix.clone();
    let name_seq = Arc::new(AtomicU64::new(0));

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.io_thread_count)
        .thread_name_fn(move || {
            let index = name_seq.fetch_add(1, Ordering::Relaxed) + 1;
            format!("{prefix}{index}")
        })
        .enable_all()
        .build()
}
