//! Bus Error Types

use thiserror::Error;

/// Errors a blocking bus transfer can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No device acknowledged the address
    #[error("No acknowledge from address {0:#04X}")]
    Nack(u8),

    /// The other end of the bus is gone
    #[error("Bus disconnected")]
    Disconnected,

    /// Transfer did not complete in time
    #[error("Timeout waiting for bus transfer after {0}ms")]
    Timeout(u64),

    /// A read came back with a different number of bytes than requested
    #[error("Read returned {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Errors in bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Address outside the 7-bit range
    #[error("Address {0:#04X} does not fit in 7 bits")]
    AddressOutOfRange(u8),

    /// Address in one of the reserved blocks (0x00-0x07, 0x78-0x7F)
    #[error("Address {0:#04X} is reserved")]
    ReservedAddress(u8),

    /// Bus clock of zero
    #[error("Clock rate must be > 0")]
    ZeroClockRate,

    /// Send interval of zero
    #[error("Send interval must be > 0")]
    ZeroInterval,

    /// Handoff ring of zero capacity
    #[error("Handoff capacity must be > 0")]
    ZeroHandoffCapacity,

    /// A pin is assigned twice
    #[error("Pin {0} is assigned to more than one line")]
    PinConflict(u8),

    /// A frame would not finish well inside one send interval
    #[error("Frame takes {wire_us}us on the wire, too close to the {interval_us}us send interval")]
    IntervalTooShort { wire_us: u64, interval_us: u64 },
}
