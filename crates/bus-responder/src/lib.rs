//! Bus Responder
//!
//! The receive-only end of the latency benchmark. Bytes arrive one interrupt
//! at a time and are reassembled in a [`FrameBuffer`]; when the initiator
//! closes the frame the [`Responder`] decodes the record, measures how long it
//! took to arrive, and pushes a [`LatencySample`] into a lock-free ring for
//! an ordinary-context reporter to pick up.

mod frame;
mod responder;
mod stats;

pub use frame::{FrameBuffer, FrameState};
pub use responder::{FrameFault, FrameOutcome, LatencySample, Responder, FILLER_BYTE};
pub use stats::{ResponderStats, StatsSnapshot};
