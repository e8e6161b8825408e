//! Runtime adapters: the handle onto the I/O event loop and the bootstrap
//! helper that builds it with verifier-compatible thread names.

pub mod io_scheduler;

pub use io_scheduler::{build_io_runtime, IoScheduler, Spawn};
