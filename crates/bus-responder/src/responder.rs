//! Interrupt-Context Responder State Machine

use crate::frame::{FrameBuffer, FrameState};
use crate::stats::ResponderStats;
use bus_link::{BusEvent, BusEventHandler, MonotonicClock};
use record_codec::{decode, Record, RECORD_LEN};
use ring_buffer::Producer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Byte clocked out when the initiator reads from us; this role has nothing to send
pub const FILLER_BYTE: u8 = 0xFF;

/// One measured transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Bytes in the frame (always `RECORD_LEN`)
    pub byte_count: usize,
    /// `finished_at_us - record.timestamp_us`, floored at zero
    pub elapsed_us: u64,
    /// Clock reading when the frame closed
    pub finished_at_us: u64,
    /// The decoded record
    pub record: Record,
}

/// Why a finished frame produced no sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameFault {
    /// More bytes arrived than the buffer holds
    #[error("Frame overflowed the buffer, {dropped} bytes dropped")]
    Overflow { dropped: usize },

    /// Frame closed before a whole record arrived
    #[error("Short frame: {received} of {expected} bytes")]
    ShortFrame { received: usize, expected: usize },

    /// Byte count does not match the record size
    #[error("Frame length {received} does not match record size {expected}")]
    DecodeMismatch { received: usize, expected: usize },
}

/// Result of closing a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A sample was produced
    Complete(LatencySample),
    /// Data discarded
    Malformed(FrameFault),
}

impl FrameOutcome {
    /// The transient state this outcome corresponds to
    pub fn state(&self) -> FrameState {
        match self {
            FrameOutcome::Complete(_) => FrameState::Complete,
            FrameOutcome::Malformed(_) => FrameState::Malformed,
        }
    }
}

/// Receive-only bus responder
///
/// Owns the frame buffer outright; the only thing that leaves this struct
/// while the program runs is a finished [`LatencySample`], through the
/// lock-free ring, and relaxed counters in [`ResponderStats`]. Every method
/// is bounded and non-blocking so it can run as the bus interrupt handler.
pub struct Responder<K: MonotonicClock, const N: usize = RECORD_LEN> {
    frame: FrameBuffer<N>,
    clock: K,
    handoff: Producer<LatencySample>,
    stats: Arc<ResponderStats>,
}

impl<K: MonotonicClock, const N: usize> Responder<K, N> {
    /// Create a responder that timestamps with `clock` and hands samples to `handoff`
    pub fn new(clock: K, handoff: Producer<LatencySample>) -> Self {
        Self {
            frame: FrameBuffer::new(),
            clock,
            handoff,
            stats: Arc::new(ResponderStats::default()),
        }
    }

    /// Shared counters, for the reporter to read
    pub fn stats(&self) -> Arc<ResponderStats> {
        Arc::clone(&self.stats)
    }

    /// The in-flight frame
    pub fn frame(&self) -> &FrameBuffer<N> {
        &self.frame
    }

    /// Current frame state
    pub fn state(&self) -> FrameState {
        self.frame.state()
    }

    /// Store one byte, or drop it if the frame is already full
    #[inline]
    pub fn receive_byte(&mut self, byte: u8) {
        self.frame.push(byte);
    }

    /// Close the current frame and return to `Empty`
    ///
    /// Exactly one reset happens per call, whatever the outcome.
    pub fn finish_frame(&mut self) -> FrameOutcome {
        let finished_at_us = self.clock.now_us();
        let outcome = self.classify(finished_at_us);

        match outcome {
            FrameOutcome::Complete(sample) => {
                self.stats.record_complete();
                if self.handoff.push(sample).is_err() {
                    self.stats.record_handoff_drop();
                }
            }
            FrameOutcome::Malformed(FrameFault::Overflow { dropped }) => {
                self.stats.record_overflow(dropped)
            }
            FrameOutcome::Malformed(FrameFault::ShortFrame { .. }) => self.stats.record_short(),
            FrameOutcome::Malformed(FrameFault::DecodeMismatch { .. }) => {
                self.stats.record_mismatch()
            }
        }

        self.frame.reset();
        outcome
    }

    fn classify(&self, finished_at_us: u64) -> FrameOutcome {
        if self.frame.overflowed() {
            return FrameOutcome::Malformed(FrameFault::Overflow {
                dropped: self.frame.dropped(),
            });
        }

        let received = self.frame.len();
        if received < RECORD_LEN {
            return FrameOutcome::Malformed(FrameFault::ShortFrame {
                received,
                expected: RECORD_LEN,
            });
        }

        match decode(self.frame.as_bytes()) {
            Ok(record) => FrameOutcome::Complete(LatencySample {
                byte_count: received,
                elapsed_us: finished_at_us.saturating_sub(record.timestamp_us),
                finished_at_us,
                record,
            }),
            Err(_) => FrameOutcome::Malformed(FrameFault::DecodeMismatch {
                received,
                expected: RECORD_LEN,
            }),
        }
    }

    /// Dispatch one bus event
    pub fn handle(&mut self, event: BusEvent) -> Option<u8> {
        match event {
            BusEvent::ByteReceived(byte) => {
                self.receive_byte(byte);
                None
            }
            BusEvent::DataRequested => Some(FILLER_BYTE),
            BusEvent::FrameFinished => {
                self.finish_frame();
                None
            }
        }
    }
}

impl<K: MonotonicClock + 'static, const N: usize> BusEventHandler for Responder<K, N> {
    fn on_event(&mut self, event: BusEvent) -> Option<u8> {
        self.handle(event)
    }
}
