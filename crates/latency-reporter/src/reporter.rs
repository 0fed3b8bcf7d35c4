//! Latency Reporter Implementation

use crate::summary::LatencySummary;
use bus_responder::{LatencySample, ResponderStats, StatsSnapshot};
use record_codec::{encode, RECORD_LEN};
use ring_buffer::Consumer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Reporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// How often the handoff ring is drained (milliseconds)
    pub poll_interval_ms: u64,
    /// Log a summary every N samples (0 disables)
    pub summary_every: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            summary_every: 10,
        }
    }
}

/// One diagnostic line per completed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLine {
    /// Elapsed time between send and receipt
    pub elapsed_us: u64,
    /// Frame size
    pub byte_count: usize,
    /// The record as it travelled on the wire
    pub data: [u8; RECORD_LEN],
}

impl From<&LatencySample> for ReportLine {
    fn from(sample: &LatencySample) -> Self {
        Self {
            elapsed_us: sample.elapsed_us,
            byte_count: sample.byte_count,
            data: encode(&sample.record),
        }
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MICROS: {}, BYTES: {}, DATA:", self.elapsed_us, self.byte_count)?;
        for b in &self.data {
            write!(f, " {:02x}", b)?;
        }
        Ok(())
    }
}

/// Drains the handoff ring and reports what it finds
pub struct LatencyReporter {
    samples: Consumer<LatencySample>,
    stats: Arc<ResponderStats>,
    last_stats: StatsSnapshot,
    summary: LatencySummary,
    config: ReportConfig,
}

impl LatencyReporter {
    /// Create a reporter over the consumer end of the handoff ring
    pub fn new(
        samples: Consumer<LatencySample>,
        stats: Arc<ResponderStats>,
        config: ReportConfig,
    ) -> Self {
        info!("Creating latency reporter with config: {:?}", config);
        Self {
            samples,
            stats,
            last_stats: StatsSnapshot::default(),
            summary: LatencySummary::default(),
            config,
        }
    }

    /// Drain every pending sample, log it, and check the fault counters
    pub fn poll(&mut self) -> Vec<ReportLine> {
        let mut lines = Vec::new();

        while let Some(sample) = self.samples.pop() {
            let line = ReportLine::from(&sample);
            info!("{}", line);

            metrics::histogram!("bus_latency_us").record(sample.elapsed_us as f64);
            self.summary.record(sample.elapsed_us);

            let every = self.config.summary_every;
            if every > 0 && self.summary.count % every == 0 {
                info!("Latency summary: {}", self.summary);
            }
            lines.push(line);
        }

        self.check_faults();
        lines
    }

    fn check_faults(&mut self) {
        let now = self.stats.snapshot();
        let delta = now.since(&self.last_stats);
        self.last_stats = now;

        metrics::counter!("bus_frames_complete_total").increment(delta.frames_complete);

        if delta.malformed() > 0 {
            warn!(
                "Discarded {} malformed frame(s): short={} mismatch={} overflow={} (bytes dropped={})",
                delta.malformed(),
                delta.frames_short,
                delta.frames_mismatch,
                delta.frames_overflow,
                delta.bytes_dropped
            );
            metrics::counter!("bus_frames_malformed_total").increment(delta.malformed());
        }

        if delta.handoff_dropped > 0 {
            warn!(
                "Reporter fell behind, {} sample(s) dropped at handoff",
                delta.handoff_dropped
            );
            metrics::counter!("bus_handoff_dropped_total").increment(delta.handoff_dropped);
        }
    }

    /// Summary of everything reported so far
    pub fn summary(&self) -> LatencySummary {
        self.summary
    }

    /// Poll on a fixed cadence until `shutdown` resolves
    ///
    /// Drains once more after shutdown so no finished sample is left behind.
    pub async fn run_until<F>(mut self, shutdown: F) -> LatencySummary
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Starting latency reporter");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let lines = self.poll();
                    if !lines.is_empty() {
                        debug!("Reported {} sample(s)", lines.len());
                    }
                }
            }
        }

        self.poll();
        info!("Latency reporter stopped: {}", self.summary);
        self.summary
    }
}
