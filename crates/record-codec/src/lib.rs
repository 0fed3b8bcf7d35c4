//! Telemetry Record Codec
//!
//! Maps the gamepad telemetry record to and from the exact byte sequence that
//! travels on the bus. The layout is written field by field in little-endian
//! order, so both ends agree regardless of processor byte order or struct
//! padding.

mod error;
mod record;

pub use error::CodecError;
pub use record::{decode, encode, encode_into, Record, JOYSTICK_MID, RECORD_LEN};
