//! Periodic Record Sender

use bus_link::{frame_wire_time_us, BusAddress, BusConfig, BusError, BusTransmitter, MonotonicClock};
use record_codec::{encode, Record, RECORD_LEN};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Send-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatorStats {
    /// Frames the bus accepted
    pub frames_sent: u64,
    /// Frames the bus rejected
    pub send_failures: u64,
}

impl InitiatorStats {
    /// Every send attempted, successful or not
    pub fn attempts(&self) -> u64 {
        self.frames_sent + self.send_failures
    }
}

/// Sends one timestamped record per interval
///
/// Writes are blocking. The async loops move each write off the worker when
/// the runtime has more than one thread.
pub struct BusInitiator<B, K> {
    bus: B,
    clock: K,
    address: BusAddress,
    interval: Duration,
    seq: u16,
    frame_limit: Option<u64>,
    stats: InitiatorStats,
}

impl<B: BusTransmitter, K: MonotonicClock> BusInitiator<B, K> {
    /// Create an initiator targeting the configured responder
    pub fn new(bus: B, clock: K, config: &BusConfig) -> Self {
        let wire_us = frame_wire_time_us(RECORD_LEN, config.clock_rate_hz);
        info!(
            "Initiator targeting {} every {}ms ({}us per frame on the wire)",
            config.responder_address, config.send_interval_ms, wire_us
        );

        Self {
            bus,
            clock,
            address: config.responder_address,
            interval: Duration::from_millis(config.send_interval_ms),
            seq: 0,
            frame_limit: None,
            stats: InitiatorStats::default(),
        }
    }

    /// Stop `run_until` on its own after `frames` send attempts
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    fn limit_reached(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.stats.attempts() >= limit)
    }

    /// Build, stamp and write one record
    ///
    /// Failures are counted and returned but never retried; the next cycle
    /// simply sends a fresh record.
    pub fn send_once(&mut self) -> Result<Record, BusError> {
        let record = Record::diagnostic(self.seq, self.clock.now_us());
        self.seq = self.seq.wrapping_add(1);

        match self.bus.write_blocking(self.address, &encode(&record)) {
            Ok(written) => {
                self.stats.frames_sent += 1;
                debug!("Sent record #{} ({} bytes)", record.buttons, written);
                Ok(record)
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!("Send of record #{} failed: {}", record.buttons, e);
                Err(e)
            }
        }
    }

    /// `send_once` from inside an async loop without holding up the worker
    fn send_from_task(&mut self) -> Result<Record, BusError> {
        match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| self.send_once()),
            _ => self.send_once(),
        }
    }

    fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Send exactly `frames` records, one per interval, starting immediately
    pub async fn run_for(&mut self, frames: usize) -> InitiatorStats {
        let mut ticker = self.ticker();
        for _ in 0..frames {
            ticker.tick().await;
            let _ = self.send_from_task();
        }
        self.stats
    }

    /// Send one record per interval until `shutdown` resolves or the frame
    /// limit is reached
    pub async fn run_until<F>(&mut self, shutdown: F) -> InitiatorStats
    where
        F: Future<Output = ()>,
    {
        let mut ticker = self.ticker();
        tokio::pin!(shutdown);

        info!("Starting initiator loop");
        while !self.limit_reached() {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let _ = self.send_from_task();
                }
            }
        }

        info!(
            "Initiator stopped: {} sent, {} failed",
            self.stats.frames_sent, self.stats.send_failures
        );
        self.stats
    }

    /// Counters so far
    pub fn stats(&self) -> InitiatorStats {
        self.stats
    }

    /// Sequence number the next record will carry
    pub fn next_seq(&self) -> u16 {
        self.seq
    }

    /// Give back the bus transmitter
    pub fn into_bus(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_link::ManualClock;
    use record_codec::decode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Records writes; can be told to reject them
    #[derive(Default)]
    struct MockBus {
        writes: Vec<(BusAddress, Vec<u8>)>,
        fail: bool,
    }

    impl BusTransmitter for MockBus {
        fn write_blocking(&mut self, address: BusAddress, bytes: &[u8]) -> Result<usize, BusError> {
            if self.fail {
                return Err(BusError::Nack(address.get()));
            }
            self.writes.push((address, bytes.to_vec()));
            Ok(bytes.len())
        }

        fn read_blocking(&mut self, _address: BusAddress, _buf: &mut [u8]) -> Result<usize, BusError> {
            Err(BusError::Disconnected)
        }
    }

    /// Clock that follows tokio's (possibly paused) time
    struct TokioClock(tokio::time::Instant);

    impl MonotonicClock for TokioClock {
        fn now_us(&self) -> u64 {
            self.0.elapsed().as_micros() as u64
        }
    }

    #[test]
    fn test_send_once_writes_one_record() {
        let clock = ManualClock::new(4_242);
        let mut initiator = BusInitiator::new(MockBus::default(), clock, &BusConfig::default());

        let record = initiator.send_once().unwrap();
        assert_eq!(record.timestamp_us, 4_242);
        assert_eq!(record.buttons, 0);

        let bus = initiator.into_bus();
        assert_eq!(bus.writes.len(), 1);
        let (address, bytes) = &bus.writes[0];
        assert_eq!(address.get(), 0x17);
        assert_eq!(bytes.len(), RECORD_LEN);
        assert_eq!(decode(bytes).unwrap(), record);
    }

    #[test]
    fn test_sequence_increments_even_on_failure() {
        let bus = MockBus {
            fail: true,
            ..Default::default()
        };
        let mut initiator = BusInitiator::new(bus, ManualClock::new(0), &BusConfig::default());

        assert_eq!(initiator.send_once(), Err(BusError::Nack(0x17)));
        assert_eq!(initiator.send_once(), Err(BusError::Nack(0x17)));
        assert_eq!(initiator.next_seq(), 2);
        assert_eq!(
            initiator.stats(),
            InitiatorStats {
                frames_sent: 0,
                send_failures: 2
            }
        );
    }

    #[test]
    fn test_sequence_wraps() {
        let mut initiator =
            BusInitiator::new(MockBus::default(), ManualClock::new(0), &BusConfig::default());
        initiator.seq = u16::MAX;
        assert_eq!(initiator.send_once().unwrap().buttons, u16::MAX);
        assert_eq!(initiator.send_once().unwrap().buttons, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_for_keeps_cadence() {
        let clock = TokioClock(tokio::time::Instant::now());
        let mut initiator = BusInitiator::new(MockBus::default(), clock, &BusConfig::default());

        let stats = initiator.run_for(3).await;
        assert_eq!(stats.frames_sent, 3);

        let stamps: Vec<u64> = initiator
            .into_bus()
            .writes
            .iter()
            .map(|(_, bytes)| decode(bytes).unwrap().timestamp_us)
            .collect();
        assert_eq!(stamps, vec![0, 1_000_000, 2_000_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_on_shutdown() {
        let config = BusConfig {
            send_interval_ms: 100,
            ..Default::default()
        };
        let mut initiator = BusInitiator::new(MockBus::default(), ManualClock::new(0), &config);

        let stats = initiator
            .run_until(tokio::time::sleep(Duration::from_millis(250)))
            .await;
        // Ticks at 0, 100 and 200 ms
        assert_eq!(stats.frames_sent, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_honours_frame_limit() {
        let bus = MockBus {
            fail: true,
            ..Default::default()
        };
        let mut initiator =
            BusInitiator::new(bus, ManualClock::new(0), &BusConfig::default()).with_frame_limit(4);

        let stats = initiator.run_until(std::future::pending()).await;
        assert_eq!(stats.attempts(), 4);
        assert_eq!(stats.send_failures, 4);
    }

    /// Accepts a write only once another task has raised the gate
    struct GatedBus {
        gate: Arc<AtomicBool>,
    }

    impl BusTransmitter for GatedBus {
        fn write_blocking(&mut self, _address: BusAddress, bytes: &[u8]) -> Result<usize, BusError> {
            for _ in 0..2_000 {
                if self.gate.load(Ordering::Acquire) {
                    return Ok(bytes.len());
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(BusError::Timeout(2_000))
        }

        fn read_blocking(&mut self, _address: BusAddress, _buf: &mut [u8]) -> Result<usize, BusError> {
            Err(BusError::Disconnected)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_blocking_write_leaves_worker_free() {
        let gate = Arc::new(AtomicBool::new(false));
        let bus = GatedBus {
            gate: Arc::clone(&gate),
        };
        let mut initiator = BusInitiator::new(bus, ManualClock::new(0), &BusConfig::default());

        let sender = tokio::spawn(async move { initiator.run_for(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::spawn(async move { gate.store(true, Ordering::Release) });

        let stats = sender.await.unwrap();
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.send_failures, 0);
    }
}
