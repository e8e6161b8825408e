//! # nio-bridge
//!
//! A scheduling bridge for event-loop servers: run blocking work without
//! starving the small, fixed set of non-blocking I/O threads, and return
//! control to the I/O scheduler once the blocking work completes.
//!
//! ## Core Problem Solved
//!
//! Event-loop servers live and die by "few threads, always busy". One
//! blocking call — a slow downstream service, disk I/O, a sleep — parked on
//! an event-loop thread stalls every connection that thread drives. Letting
//! blocking work spawn threads freely is no better: uncontrolled thread
//! proliferation throws away the memory and scheduling benefits that made
//! the event loop attractive in the first place.
//!
//! This crate demonstrates the bridging discipline:
//!
//! - **Bounded Worker Pool**: a fixed set of named, dedicated OS threads
//!   executes blocking bodies; work queues when all are busy
//! - **Scheduling Bridge**: dispatches each request's body onto the pool,
//!   then hands the outcome back onto the I/O event loop before emitting
//!   the final value
//! - **Thread-Identity Verifier**: runtime assertions that blocking code
//!   never executes on an I/O thread and result emission always does,
//!   enforced as an explicit per-task phase state machine
//! - **Delay Simulator**: the example blocking workload — an interruptible
//!   sleep standing in for any real blocking call
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use nio_bridge::config::BridgeConfig;
//! use nio_bridge::core::{SchedulingBridge, ThreadTaxonomy, WorkerPool};
//! use nio_bridge::runtime::{build_io_runtime, IoScheduler};
//!
//! let config = BridgeConfig::new().with_worker_count(10);
//! let taxonomy = ThreadTaxonomy::from_config(&config);
//! let runtime = build_io_runtime(&config)?;
//! let pool = Arc::new(WorkerPool::new(&config, &taxonomy)?);
//! let bridge = SchedulingBridge::new(pool, IoScheduler::new(runtime.handle().clone()), taxonomy);
//!
//! let greeting = runtime.block_on(bridge.handle(Duration::from_secs(2)))?;
//! assert_eq!(greeting, "Delayed greetings!");
//! ```
//!
//! The HTTP surface (`GET /hello?delayInSeconds=n`) in [`server`] is thin
//! plumbing over [`core::SchedulingBridge::handle`]; the bridge and its
//! invariants are the design content here.

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, worker pool, verifier, bridge.
pub mod core;
/// Configuration models for the bridge and the HTTP server.
pub mod config;
/// Runtime adapters for the I/O event loop.
pub mod runtime;
/// Thin HTTP surface over the bridge.
pub mod server;
/// Shared utilities.
pub mod util;
