//! Configuration models for the bridge and the HTTP server.

pub mod bridge;

pub use bridge::{AppConfig, BridgeConfig, ServerConfig};
