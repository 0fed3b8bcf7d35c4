//! Bus Latency Benchmark
//!
//! Wires the three roles together on one controller: the initiator writes a
//! timestamped record every interval, the responder reassembles it in
//! interrupt context and hands a latency sample across a lock-free ring, and
//! the reporter turns samples into diagnostic lines.

mod config;
mod logging;

pub use config::{load_config, BenchConfig, LogConfig, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use logging::init_logging;

use anyhow::{anyhow, Context};
use bus_initiator::{BusInitiator, InitiatorStats};
use bus_link::{LoopbackBus, SystemClock};
use bus_responder::{Responder, StatsSnapshot};
use latency_reporter::{LatencyReporter, LatencySummary};
use record_codec::RECORD_LEN;
use ring_buffer::RingBuffer;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Final numbers from one benchmark run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BenchReport {
    /// Send side
    pub initiator: InitiatorStats,
    /// Receive side
    pub responder: StatsSnapshot,
    /// Measured latencies
    pub latency: LatencySummary,
}

/// Run the benchmark until `shutdown` resolves or the frame limit is reached
pub async fn run_bench<F>(config: BenchConfig, shutdown: F) -> anyhow::Result<BenchReport>
where
    F: Future<Output = ()>,
{
    config
        .bus
        .validate(RECORD_LEN)
        .context("invalid bus configuration")?;

    let clock = SystemClock::new();
    let (producer, consumer) = RingBuffer::split(config.bus.handoff_capacity);
    let responder: Responder<SystemClock> = Responder::new(clock, producer);
    let responder_stats = responder.stats();

    let (transmitter, irq) = LoopbackBus::new(config.bus.clone())
        .attach(responder)
        .context("starting responder interrupt thread")?;

    let reporter = LatencyReporter::new(consumer, Arc::clone(&responder_stats), config.report.clone());
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let reporter_task = tokio::spawn(reporter.run_until(async move {
        let _ = stop_rx.wait_for(|stop| *stop).await;
    }));

    let mut initiator = BusInitiator::new(transmitter, clock, &config.bus);
    if let Some(frames) = config.frames {
        initiator = initiator.with_frame_limit(frames);
    }
    let initiator_stats = initiator.run_until(shutdown).await;

    // Closing the wire lets the interrupt thread finish its last frame and exit
    drop(initiator);
    tokio::task::spawn_blocking(move || irq.join())
        .await
        .context("joining responder interrupt thread")?
        .map_err(|_| anyhow!("responder interrupt thread panicked"))?;

    let _ = stop_tx.send(true);
    let latency = reporter_task.await.context("reporter task failed")?;

    let report = BenchReport {
        initiator: initiator_stats,
        responder: responder_stats.snapshot(),
        latency,
    };
    info!("Benchmark finished: {:?}", report);
    Ok(report)
}
