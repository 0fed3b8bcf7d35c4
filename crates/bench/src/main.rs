//! Bus Latency Benchmark - Main Entry Point

use anyhow::Context;
use bench::{init_logging, load_config, run_bench, DEFAULT_CONFIG_PATH};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path).with_context(|| format!("loading configuration from {path}"))?;

    init_logging(&config.log);

    info!("=== Bus Latency Bench v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting benchmark, Ctrl-C to stop...");

    let report = run_bench(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!(
        "Sent {} frame(s), {} send failure(s)",
        report.initiator.frames_sent, report.initiator.send_failures
    );
    info!(
        "Received {} complete, {} malformed, {} lost at handoff",
        report.responder.frames_complete,
        report.responder.malformed(),
        report.responder.handoff_dropped
    );
    info!("Latency: {}", report.latency);

    Ok(())
}
