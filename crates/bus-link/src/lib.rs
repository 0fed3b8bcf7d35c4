//! Two-Wire Bus Link
//!
//! The primitives both bus roles are built on: the events a responder sees,
//! the blocking transfer an initiator performs, a monotonic microsecond clock,
//! bus configuration, and a loopback wiring that runs the responder's event
//! handler on its own thread the way a peripheral interrupt would.

mod clock;
mod config;
mod error;
mod event;
mod loopback;

pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use config::{frame_wire_time_us, BusAddress, BusConfig, BusPins, BusRole};
pub use error::{BusError, ConfigError};
pub use event::{BusEvent, BusEventHandler, BusTransmitter};
pub use loopback::{LoopbackBus, LoopbackHandle, LoopbackTransmitter};

/// Default settings, matching the reference board wiring
pub mod defaults {
    /// Responder data line (SDA)
    pub const RESPONDER_DATA_PIN: u8 = 4;
    /// Responder clock line (SCL)
    pub const RESPONDER_CLOCK_PIN: u8 = 5;
    /// Initiator data line (SDA)
    pub const INITIATOR_DATA_PIN: u8 = 6;
    /// Initiator clock line (SCL)
    pub const INITIATOR_CLOCK_PIN: u8 = 7;
    /// Bus clock rate (1.5 MHz)
    pub const CLOCK_RATE_HZ: u32 = 1_500_000;
    /// Responder device address
    pub const RESPONDER_ADDRESS: u8 = 0x17;
    /// Initiator send period
    pub const SEND_INTERVAL_MS: u64 = 1000;
    /// Samples buffered between responder and reporter
    pub const HANDOFF_CAPACITY: usize = 16;
    /// How long a blocking transfer waits for the responder
    pub const TRANSFER_TIMEOUT_MS: u64 = 100;
}
