//! Thread-identity verification.
//!
//! The bridge's correctness story is "blocking bodies never run on an I/O
//! thread, and result emission always does". Both thread sets carry
//! deterministic name prefixes, so the kind of the current thread can be
//! inferred from its name and checked at each phase transition. The checks
//! are a diagnostic aid: they never branch real logic, they only confirm the
//! discipline holds.

use std::sync::Arc;
use std::thread;

use tracing::error;

use crate::config::BridgeConfig;
use crate::core::error::ContractViolation;

/// The kind of thread a phase is contractually required to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKind {
    /// A non-blocking event-loop thread owned by the I/O scheduler.
    Io,
    /// A blocking-capable thread owned by the worker pool.
    Worker,
}

impl std::fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => f.write_str("i/o event-loop"),
            Self::Worker => f.write_str("worker"),
        }
    }
}

/// Maps thread names to [`ThreadKind`]s via the two configured prefixes.
///
/// Cheap to clone; constructed once at startup from configuration and
/// injected into the pool, the runtime builder, and the bridge so all three
/// agree on the naming scheme.
#[derive(Debug, Clone)]
pub struct ThreadTaxonomy {
    worker_prefix: Arc<str>,
    io_prefix: Arc<str>,
}

impl ThreadTaxonomy {
    /// Build a taxonomy from explicit prefixes.
    #[must_use]
    pub fn new(worker_prefix: &str, io_prefix: &str) -> Self {
        Self {
            worker_prefix: Arc::from(worker_prefix),
            io_prefix: Arc::from(io_prefix),
        }
    }

    /// Build a taxonomy from validated configuration.
    #[must_use]
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.worker_thread_prefix, &config.io_thread_prefix)
    }

    /// Prefix carried by every worker-pool thread name.
    #[must_use]
    pub fn worker_prefix(&self) -> &str {
        &self.worker_prefix
    }

    /// Prefix carried by every I/O event-loop thread name.
    #[must_use]
    pub fn io_prefix(&self) -> &str {
        &self.io_prefix
    }

    /// Classify a thread name, or `None` if it belongs to neither set.
    #[must_use]
    pub fn classify(&self, name: &str) -> Option<ThreadKind> {
        if name.starts_with(self.worker_prefix.as_ref()) {
            Some(ThreadKind::Worker)
        } else if name.starts_with(self.io_prefix.as_ref()) {
            Some(ThreadKind::Io)
        } else {
            None
        }
    }

    /// Classify the current thread.
    #[must_use]
    pub fn current_kind(&self) -> Option<ThreadKind> {
        thread::current().name().and_then(|name| self.classify(name))
    }

    /// Check that the current thread is of the expected kind.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation::WrongThread` when the current thread is
    /// unnamed, unclassified, or of the other kind.
    pub fn check(&self, expected: ThreadKind) -> Result<(), ContractViolation> {
        let current = thread::current();
        let name = current.name().unwrap_or("<unnamed>");
        match self.classify(name) {
            Some(kind) if kind == expected => Ok(()),
            _ => Err(ContractViolation::WrongThread {
                expected,
                thread: name.to_string(),
            }),
        }
    }

    /// Assert that the current thread is of the expected kind.
    ///
    /// # Panics
    ///
    /// Panics on mismatch. A mismatch means the bridge's phase discipline
    /// was broken and must abort the request loudly rather than be swallowed
    /// as an ordinary failure.
    pub fn assert_kind(&self, expected: ThreadKind) {
        if let Err(violation) = self.check(expected) {
            error!(error = %violation, "thread-identity contract broken");
            panic!("{violation}");
        }
    }
}
