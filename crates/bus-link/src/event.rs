//! Bus Events and Transfer Traits

use crate::config::BusAddress;
use crate::error::BusError;

/// A hardware event delivered to the responder, one per interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// The initiator wrote one byte
    ByteReceived(u8),
    /// The initiator is clocking a byte out of the responder
    DataRequested,
    /// Stop or repeated-start: the current frame is over
    FrameFinished,
}

/// Receives bus events in interrupt context
///
/// Implementations run preemptively on every bus event and must return in
/// bounded time: no blocking, no locks, no logging.
pub trait BusEventHandler: Send + 'static {
    /// Handle one event; for `DataRequested` the returned byte goes on the wire
    fn on_event(&mut self, event: BusEvent) -> Option<u8>;
}

/// The initiator side of the bus
pub trait BusTransmitter {
    /// Write `bytes` to `address` as a single frame, blocking until the stop
    /// condition has gone out
    fn write_blocking(&mut self, address: BusAddress, bytes: &[u8]) -> Result<usize, BusError>;

    /// Read `buf.len()` bytes from `address` as a single frame
    fn read_blocking(&mut self, address: BusAddress, buf: &mut [u8]) -> Result<usize, BusError>;
}
