//! Bus Initiator
//!
//! Builds a record stamped with the current monotonic time and writes it to
//! the responder on a fixed period.

mod initiator;

pub use initiator::{BusInitiator, InitiatorStats};
