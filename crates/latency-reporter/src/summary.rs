//! Running Latency Summary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Min / max / mean over every sample seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of samples
    pub count: u64,
    /// Smallest latency (us)
    pub min_us: u64,
    /// Largest latency (us)
    pub max_us: u64,
    /// Most recent latency (us)
    pub last_us: u64,
    /// Sum of all latencies (us)
    pub total_us: u128,
}

impl LatencySummary {
    /// Fold in one sample
    pub fn record(&mut self, elapsed_us: u64) {
        if self.count == 0 {
            self.min_us = elapsed_us;
            self.max_us = elapsed_us;
        } else {
            self.min_us = self.min_us.min(elapsed_us);
            self.max_us = self.max_us.max(elapsed_us);
        }
        self.count += 1;
        self.last_us = elapsed_us;
        self.total_us += elapsed_us as u128;
    }

    /// Mean latency, or 0.0 before the first sample
    pub fn mean_us(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_us as f64 / self.count as f64
        }
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} min={}us max={}us mean={:.1}us last={}us",
            self.count,
            self.min_us,
            self.max_us,
            self.mean_us(),
            self.last_us
        )
    }
}
