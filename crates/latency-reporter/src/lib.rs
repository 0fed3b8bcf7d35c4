//! Latency Reporter
//!
//! Drains latency samples handed off by the bus responder and emits one
//! diagnostic line per completed frame, keeps a running summary, and surfaces
//! the responder's fault counters. Never runs in interrupt context.

mod reporter;
mod summary;

pub use reporter::{LatencyReporter, ReportConfig, ReportLine};
pub use summary::LatencySummary;
