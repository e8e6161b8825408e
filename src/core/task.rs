//! Task model: one request's unit of blocking work, its phase state machine,
//! and the cancellation token threaded through the blocking body.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::error;

use crate::core::error::ContractViolation;

/// Process-wide task id source. Strictly increasing, never reused.
static TASK_IDS: AtomicU64 = AtomicU64::new(1);

/// Lifecycle phase of a task as it moves through the scheduling bridge.
///
/// The thread-identity discipline is modeled as an explicit state machine
/// rather than inline side effects: each request advances strictly
/// `Dispatched -> WorkerExecuting -> AwaitingHandoff -> IoEmitting` and then
/// terminates in `Done` or `Failed`. An out-of-order transition is a bug in
/// the bridge, not bad input, and panics via [`PhaseCell::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queued on the worker pool, body not yet started.
    Dispatched,
    /// The blocking body is running on a worker thread.
    WorkerExecuting,
    /// Body finished; outcome is being handed back to the I/O scheduler.
    AwaitingHandoff,
    /// The continuation is running on an I/O thread, emitting the result.
    IoEmitting,
    /// Result emitted successfully.
    Done,
    /// A failure outcome was emitted.
    Failed,
}

impl Phase {
    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Dispatched, Self::WorkerExecuting)
                | (Self::WorkerExecuting, Self::AwaitingHandoff)
                | (Self::AwaitingHandoff, Self::IoEmitting)
                | (Self::IoEmitting, Self::Done | Self::Failed)
        )
    }
}

/// Shared, thread-safe holder for a task's current [`Phase`].
///
/// Cloning is cheap; all clones observe the same state. The cell is shared
/// between the dispatching I/O thread, the executing worker thread, and the
/// emitting I/O thread, which never touch it concurrently for a single task
/// (phases are strictly ordered).
#[derive(Debug, Clone)]
pub struct PhaseCell {
    inner: Arc<Mutex<Phase>>,
}

impl PhaseCell {
    /// Create a cell in the initial `Dispatched` phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Phase::Dispatched)),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        *self.inner.lock()
    }

    /// Attempt a transition, reporting a [`ContractViolation`] if the state
    /// machine does not allow it.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation::IllegalPhase` when the transition is not
    /// permitted from the current phase.
    pub fn try_advance(&self, next: Phase) -> Result<(), ContractViolation> {
        let mut cur = self.inner.lock();
        if !cur.can_transition(next) {
            return Err(ContractViolation::IllegalPhase { from: *cur, to: next });
        }
        *cur = next;
        Ok(())
    }

    /// Advance the state machine, panicking on an illegal transition.
    ///
    /// # Panics
    ///
    /// Panics when the transition is not permitted; this signals a bug in
    /// the bridge's phase discipline and is intentionally loud.
    pub fn advance(&self, next: Phase) {
        if let Err(violation) = self.try_advance(next) {
            error!(error = %violation, "task phase discipline broken");
            panic!("{violation}");
        }
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a task's blocking body.
///
/// Interruption is an explicit variant propagated through the hand-off
/// rather than an unwind thrown across the thread boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The body ran to completion.
    Completed,
    /// The body was cancelled before completing.
    Interrupted,
}

/// One request's unit of blocking work.
///
/// Created per inbound request, owned exclusively by it, and discarded once
/// the response is produced. Never shared across requests.
#[derive(Debug)]
pub struct Task {
    /// Unique, monotonically increasing task id.
    pub id: u64,
    /// Requested blocking duration; zero means "no delay" but still
    /// traverses every phase.
    pub delay: Duration,
    /// Shared phase state machine for this task.
    pub phase: PhaseCell,
}

impl Task {
    /// Create a task for the given delay, starting in `Dispatched`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            id: TASK_IDS.fetch_add(1, Ordering::Relaxed),
            delay,
            phase: PhaseCell::new(),
        }
    }
}

struct CancelInner {
    flag: Mutex<bool>,
    cv: Condvar,
}

/// Cancellation signal for an in-flight blocking body.
///
/// The executing side sleeps on the condvar; `cancel` flips the flag and
/// wakes it, so a cancelled sleep returns promptly instead of running out
/// its full duration.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancelInner {
                flag: Mutex::new(false),
                cv: Condvar::new(),
            }),
        }
    }

    /// Deliver the cancellation signal, waking any sleeper.
    pub fn cancel(&self) {
        let mut flag = self.inner.flag.lock();
        *flag = true;
        self.inner.cv.notify_all();
    }

    /// Whether the signal has been delivered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.flag.lock()
    }

    pub(crate) fn parts(&self) -> (&Mutex<bool>, &Condvar) {
        (&self.inner.flag, &self.inner.cv)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
