//! Codec Error Types

use thiserror::Error;

/// Errors produced while encoding or decoding a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input is not exactly one encoded record
    #[error("Record length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Output buffer cannot hold an encoded record
    #[error("Output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}
