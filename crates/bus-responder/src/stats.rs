//! Responder Counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Frame counters written from interrupt context, read from anywhere
///
/// Every update is a single relaxed `fetch_add`; readers get a consistent
/// enough picture for diagnostics, not a transactional one.
#[derive(Debug, Default)]
pub struct ResponderStats {
    frames_complete: AtomicU64,
    frames_short: AtomicU64,
    frames_mismatch: AtomicU64,
    frames_overflow: AtomicU64,
    bytes_dropped: AtomicU64,
    handoff_dropped: AtomicU64,
}

impl ResponderStats {
    pub(crate) fn record_complete(&self) {
        self.frames_complete.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_short(&self) {
        self.frames_short.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mismatch(&self) {
        self.frames_mismatch.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self, bytes_dropped: usize) {
        self.frames_overflow.fetch_add(1, Ordering::Relaxed);
        self.bytes_dropped
            .fetch_add(bytes_dropped as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_handoff_drop(&self) {
        self.handoff_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy out the current values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_complete: self.frames_complete.load(Ordering::Relaxed),
            frames_short: self.frames_short.load(Ordering::Relaxed),
            frames_mismatch: self.frames_mismatch.load(Ordering::Relaxed),
            frames_overflow: self.frames_overflow.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            handoff_dropped: self.handoff_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ResponderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Frames that produced a latency sample
    pub frames_complete: u64,
    /// Frames that ended before a full record arrived
    pub frames_short: u64,
    /// Frames whose length matched neither a record nor the buffer limit
    pub frames_mismatch: u64,
    /// Frames that ran past the buffer capacity
    pub frames_overflow: u64,
    /// Bytes dropped by overflowing frames
    pub bytes_dropped: u64,
    /// Samples lost because the reporter fell behind
    pub handoff_dropped: u64,
}

impl StatsSnapshot {
    /// Frames that produced no sample
    pub fn malformed(&self) -> u64 {
        self.frames_short + self.frames_mismatch + self.frames_overflow
    }

    /// Every finished frame
    pub fn frames_total(&self) -> u64 {
        self.frames_complete + self.malformed()
    }

    /// Per-counter increase since an earlier snapshot
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            frames_complete: self.frames_complete.saturating_sub(earlier.frames_complete),
            frames_short: self.frames_short.saturating_sub(earlier.frames_short),
            frames_mismatch: self.frames_mismatch.saturating_sub(earlier.frames_mismatch),
            frames_overflow: self.frames_overflow.saturating_sub(earlier.frames_overflow),
            bytes_dropped: self.bytes_dropped.saturating_sub(earlier.bytes_dropped),
            handoff_dropped: self.handoff_dropped.saturating_sub(earlier.handoff_dropped),
        }
    }
}
