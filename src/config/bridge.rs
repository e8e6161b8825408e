//! Configuration for the worker pool, the I/O runtime, and the HTTP server.

use serde::{Deserialize, Serialize};

/// Configuration for the scheduling bridge's two thread sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Number of blocking-capable worker threads. Fixed for the process
    /// lifetime; the pool never grows or shrinks.
    pub worker_count: usize,
    /// Number of non-blocking event-loop threads for the I/O runtime.
    pub io_thread_count: usize,
    /// Name prefix for worker threads; the verifier classifies by it.
    pub worker_thread_prefix: String,
    /// Name prefix for event-loop threads; the verifier classifies by it.
    pub io_thread_prefix: String,
    /// Stack size per worker thread, in bytes.
    pub thread_stack_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            io_thread_count: num_cpus::get(),
            worker_thread_prefix: "blocking-worker-".to_string(),
            io_thread_prefix: "event-loop-".to_string(),
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

impl BridgeConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the I/O event-loop thread count.
    #[must_use]
    pub fn with_io_thread_count(mut self, count: usize) -> Self {
        self.io_thread_count = count;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_worker_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_thread_prefix = prefix.into();
        self
    }

    /// Set the event-loop thread name prefix.
    #[must_use]
    pub fn with_io_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.io_thread_prefix = prefix.into();
        self
    }

    /// Set the per-worker stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.io_thread_count == 0 {
            return Err("io_thread_count must be greater than 0".into());
        }
        if self.thread_stack_size < 128 * 1024 {
            return Err("thread_stack_size must be at least 128 KiB".into());
        }
        if self.worker_thread_prefix.is_empty() || self.io_thread_prefix.is_empty() {
            return Err("thread name prefixes must not be empty".into());
        }
        // The verifier infers thread kind from name prefixes; overlapping
        // prefixes would make the two sets indistinguishable.
        if self.worker_thread_prefix.starts_with(&self.io_thread_prefix)
            || self.io_thread_prefix.starts_with(&self.worker_thread_prefix)
        {
            return Err("worker and io thread prefixes must not overlap".into());
        }
        Ok(())
    }
}

/// Configuration for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8080`.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map(|_| ())
            .map_err(|e| format!("bind_addr `{}` invalid: {e}", self.bind_addr))
    }
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Bridge (thread pools) settings.
    pub bridge: BridgeConfig,
}

impl AppConfig {
    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        self.server
            .validate()
            .map_err(|e| format!("server config invalid: {e}"))?;
        self.bridge
            .validate()
            .map_err(|e| format!("bridge config invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by environment
    /// variables (`NIO_BRIDGE_BIND_ADDR`, `NIO_BRIDGE_WORKER_COUNT`,
    /// `NIO_BRIDGE_IO_THREADS`), then validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_env() -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Ok(addr) = std::env::var("NIO_BRIDGE_BIND_ADDR") {
            cfg.server.bind_addr = addr;
        }
        if let Ok(count) = std::env::var("NIO_BRIDGE_WORKER_COUNT") {
            cfg.bridge.worker_count = count
                .parse()
                .map_err(|e| format!("NIO_BRIDGE_WORKER_COUNT invalid: {e}"))?;
        }
        if let Ok(count) = std::env::var("NIO_BRIDGE_IO_THREADS") {
            cfg.bridge.io_thread_count = count
                .parse()
                .map_err(|e| format!("NIO_BRIDGE_IO_THREADS invalid: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
