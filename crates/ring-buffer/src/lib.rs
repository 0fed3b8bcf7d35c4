//! Lock-Free Ring Buffer
//!
//! Provides a fixed-capacity SPSC ring buffer used as the handoff channel
//! between a producer that must never block (an interrupt handler) and an
//! ordinary-context consumer.

mod buffer;

pub use buffer::{Consumer, Producer, RingBuffer, DEFAULT_CAPACITY};
