//! Gamepad Record Definition and Wire Layout

use crate::error::CodecError;
use serde::{Deserialize, Serialize};

/// Resting position of an analog stick axis
pub const JOYSTICK_MID: u16 = 0x7FFF;

/// Size of one encoded record on the wire
///
/// dpad(1) + buttons(2) + aux(2) + 4 axes(8) + lt(1) + rt(1) + timestamp(8)
pub const RECORD_LEN: usize = 23;

/// Gamepad state plus the moment it was handed to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// D-pad direction bits
    pub dpad: u8,
    /// Button bitmask
    pub buttons: u16,
    /// Auxiliary button bitmask
    pub aux: u16,
    /// Left stick X
    pub lx: u16,
    /// Left stick Y
    pub ly: u16,
    /// Right stick X
    pub rx: u16,
    /// Right stick Y
    pub ry: u16,
    /// Left trigger
    pub lt: u8,
    /// Right trigger
    pub rt: u8,
    /// Send time (monotonic microseconds)
    pub timestamp_us: u64,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            dpad: 0,
            buttons: 0,
            aux: 0,
            lx: JOYSTICK_MID,
            ly: JOYSTICK_MID,
            rx: JOYSTICK_MID,
            ry: JOYSTICK_MID,
            lt: 0,
            rt: 0,
            timestamp_us: 0,
        }
    }
}

impl Record {
    /// Create a resting-state record stamped with the given time
    pub fn with_timestamp(timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            ..Default::default()
        }
    }

    /// Create the benchmark's diagnostic record
    ///
    /// The sequence counter rides in `buttons`; every other state field is
    /// zeroed so consecutive frames differ only in counter and timestamp.
    pub fn diagnostic(seq: u16, timestamp_us: u64) -> Self {
        Self {
            dpad: 0,
            buttons: seq,
            aux: 0,
            lx: 0,
            ly: 0,
            rx: 0,
            ry: 0,
            lt: 0,
            rt: 0,
            timestamp_us,
        }
    }

    /// Encode into a fresh fixed-size array
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        encode(self)
    }

    /// Decode from a slice of exactly `RECORD_LEN` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }
}

/// Sequential little-endian writer over a fixed array
struct Writer<'a> {
    out: &'a mut [u8; RECORD_LEN],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn put(&mut self, bytes: &[u8]) {
        self.out[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    fn u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.put(&v.to_le_bytes());
    }
}

/// Sequential little-endian reader over a fixed array
struct Reader<'a> {
    input: &'a [u8; RECORD_LEN],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.input[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }
}

/// Encode a record into its wire representation
pub fn encode(record: &Record) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    let mut w = Writer { out: &mut out, pos: 0 };
    w.u8(record.dpad);
    w.u16(record.buttons);
    w.u16(record.aux);
    w.u16(record.lx);
    w.u16(record.ly);
    w.u16(record.rx);
    w.u16(record.ry);
    w.u8(record.lt);
    w.u8(record.rt);
    w.u64(record.timestamp_us);
    debug_assert_eq!(w.pos, RECORD_LEN);
    out
}

/// Encode a record into the front of `out`, returning the bytes written
pub fn encode_into(record: &Record, out: &mut [u8]) -> Result<usize, CodecError> {
    let available = out.len();
    let dst = out
        .get_mut(..RECORD_LEN)
        .ok_or(CodecError::BufferTooSmall {
            needed: RECORD_LEN,
            available,
        })?;
    dst.copy_from_slice(&encode(record));
    Ok(RECORD_LEN)
}

/// Decode a record; any length other than `RECORD_LEN` is rejected
pub fn decode(bytes: &[u8]) -> Result<Record, CodecError> {
    let input: &[u8; RECORD_LEN] = bytes.try_into().map_err(|_| CodecError::LengthMismatch {
        expected: RECORD_LEN,
        actual: bytes.len(),
    })?;

    let mut r = Reader { input, pos: 0 };
    Ok(Record {
        dpad: r.u8(),
        buttons: r.u16(),
        aux: r.u16(),
        lx: r.u16(),
        ly: r.u16(),
        rx: r.u16(),
        ry: r.u16(),
        lt: r.u8(),
        rt: r.u8(),
        timestamp_us: r.u64(),
    })
}
