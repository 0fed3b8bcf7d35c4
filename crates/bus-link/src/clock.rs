//! Monotonic Microsecond Clocks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic time in microseconds since an arbitrary epoch
///
/// `now_us` is called from interrupt context, so it must not block.
pub trait MonotonicClock: Send + Sync {
    /// Microseconds since the clock's epoch
    fn now_us(&self) -> u64;
}

/// Wall-independent clock backed by `Instant`
///
/// Clones share the epoch, so an initiator and a responder holding clones
/// of one `SystemClock` read the same timeline.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock for tests
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start_us`
    pub fn new(start_us: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_us)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::Release);
    }

    /// Move forward by `delta_us`
    pub fn advance(&self, delta_us: u64) {
        self.now.fetch_add(delta_us, Ordering::AcqRel);
    }
}

impl MonotonicClock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Arc<C> {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_us();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now_us();
        assert!(b >= a + 1_000);
    }

    #[test]
    fn test_system_clock_clones_share_epoch() {
        let clock = SystemClock::new();
        let copy = clock;
        std::thread::sleep(std::time::Duration::from_millis(1));
        let diff = copy.now_us().abs_diff(clock.now_us());
        assert!(diff < 1_000);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(other.now_us(), 150);
        other.set(10);
        assert_eq!(clock.now_us(), 10);
    }
}
