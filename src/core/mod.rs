//! Core scheduling abstractions: task model, worker pool, thread-identity
//! verification, and the bridge between the two scheduler worlds.

pub mod bridge;
pub mod delay;
pub mod error;
pub mod task;
pub mod verifier;
pub mod worker_pool;

pub use bridge::{SchedulingBridge, GREETING};
pub use error::{AppResult, BridgeError, ContractViolation, PoolError};
pub use task::{CancelToken, Phase, PhaseCell, Task, TaskOutcome};
pub use verifier::{ThreadKind, ThreadTaxonomy};
pub use worker_pool::{JobHandle, PoolStats, WorkerPool};
