//! nio-bridge server binary: wire configuration, telemetry, the two thread
//! sets, and the HTTP surface together, then serve until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use nio_bridge::config::AppConfig;
use nio_bridge::core::{SchedulingBridge, ThreadTaxonomy, WorkerPool};
use nio_bridge::runtime::{build_io_runtime, IoScheduler};
use nio_bridge::server;
use nio_bridge::util::init_tracing;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = AppConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let taxonomy = ThreadTaxonomy::from_config(&cfg.bridge);
    let runtime = build_io_runtime(&cfg.bridge).context("building i/o runtime")?;
    let pool = Arc::new(WorkerPool::new(&cfg.bridge, &taxonomy).context("starting worker pool")?);
    let bridge = Arc::new(SchedulingBridge::new(
        Arc::clone(&pool),
        IoScheduler::new(runtime.handle().clone()),
        taxonomy,
    ));

    info!(
        workers = cfg.bridge.worker_count,
        io_threads = cfg.bridge.io_thread_count,
        "nio-bridge starting"
    );

    let result = runtime.block_on(async move {
        let listener = TcpListener::bind(&cfg.server.bind_addr)
            .await
            .with_context(|| format!("binding {}", cfg.server.bind_addr))?;
        server::serve(listener, bridge).await
    });

    pool.shutdown();
    result
}
