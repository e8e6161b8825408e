//! Error types for the worker pool and scheduling bridge.

use thiserror::Error;

use crate::core::task::Phase;
use crate::core::verifier::ThreadKind;

/// Errors produced by the bounded worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been shut down and no longer accepts work.
    #[error("worker pool has been shut down")]
    Shutdown,
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Request-level errors surfaced by the scheduling bridge.
///
/// Every variant is terminal for its request; the bridge never retries.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The blocking body was interrupted before it completed.
    #[error("blocking work was interrupted before completing")]
    Interrupted,
    /// The task could not be dispatched to the worker pool.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// The task aborted before emitting a result (e.g. the body panicked
    /// and the worker dropped the response channel).
    #[error("task aborted before emitting a result")]
    TaskAborted,
}

/// A violation of the bridge's phase/thread discipline.
///
/// This is a programming-contract failure, not a request failure: it means
/// the bridge itself scheduled a phase onto the wrong thread kind or skipped
/// a phase. It is raised as a panic on the offending thread rather than
/// flowing through the normal error path.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// A phase ran on a thread of the wrong kind.
    #[error("expected to run on a {expected} thread, but current thread is `{thread}`")]
    WrongThread {
        /// The thread kind the phase is contractually required to run on.
        expected: ThreadKind,
        /// Name of the thread that actually executed the phase.
        thread: String,
    },
    /// A task attempted a phase transition its state machine does not allow.
    #[error("illegal phase transition: {from:?} -> {to:?}")]
    IllegalPhase {
        /// Phase the task was in.
        from: Phase,
        /// Phase the task attempted to enter.
        to: Phase,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
