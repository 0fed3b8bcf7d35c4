//! Frame Reassembly Buffer

use record_codec::RECORD_LEN;

/// Where a frame is in its lifecycle
///
/// `Complete` and `Malformed` only exist for the duration of the
/// frame-finished event; the buffer itself is back to `Empty` by the time
/// the handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No byte received since the last reset
    Empty,
    /// At least one byte (or a dropped byte) received
    Filling,
    /// Finished with exactly one record's worth of bytes
    Complete,
    /// Finished with anything else
    Malformed,
}

/// Fixed-capacity byte buffer with a write cursor
///
/// Lives for the whole program and never allocates. Bytes arriving once the
/// cursor has reached `C` are dropped and flag the frame as overflowed.
#[derive(Debug, Clone)]
pub struct FrameBuffer<const C: usize = RECORD_LEN> {
    storage: [u8; C],
    cursor: usize,
    overflowed: bool,
    dropped: usize,
}

impl<const C: usize> FrameBuffer<C> {
    const CAPACITY_FITS_RECORD: () = assert!(C >= RECORD_LEN, "Frame buffer smaller than a record");

    /// Create an empty buffer
    pub const fn new() -> Self {
        let () = Self::CAPACITY_FITS_RECORD;
        Self {
            storage: [0; C],
            cursor: 0,
            overflowed: false,
            dropped: 0,
        }
    }

    /// Append a byte; returns `false` if it was dropped for lack of room
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        match self.storage.get_mut(self.cursor) {
            Some(slot) => {
                *slot = byte;
                self.cursor += 1;
                true
            }
            None => {
                self.overflowed = true;
                self.dropped += 1;
                false
            }
        }
    }

    /// Bytes received so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.cursor]
    }

    /// Write cursor, in `[0, C]`
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// Check if nothing has been received
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Fixed capacity `C`
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Whether a byte has been dropped since the last reset
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Bytes dropped since the last reset
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Current lifecycle state
    pub fn state(&self) -> FrameState {
        if self.cursor == 0 && !self.overflowed {
            FrameState::Empty
        } else {
            FrameState::Filling
        }
    }

    /// Return to `Empty`: cursor to zero, overflow cleared
    ///
    /// Stale bytes are left in storage; nothing reads past the cursor.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.overflowed = false;
        self.dropped = 0;
    }
}

impl<const C: usize> Default for FrameBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_empty() {
        let buf: FrameBuffer = FrameBuffer::new();
        assert_eq!(buf.state(), FrameState::Empty);
        assert_eq!(buf.capacity(), RECORD_LEN);
        assert!(buf.as_bytes().is_empty());
    }

    #[test]
    fn test_push_moves_to_filling() {
        let mut buf: FrameBuffer = FrameBuffer::new();
        assert!(buf.push(0xAB));
        assert_eq!(buf.state(), FrameState::Filling);
        assert_eq!(buf.as_bytes(), &[0xAB]);
    }

    #[test]
    fn test_overflow_drops_and_flags() {
        let mut buf: FrameBuffer = FrameBuffer::new();
        for i in 0..RECORD_LEN {
            assert!(buf.push(i as u8));
        }
        assert!(!buf.overflowed());

        assert!(!buf.push(0xFF));
        assert!(buf.overflowed());
        assert!(!buf.push(0xFE));
        assert_eq!(buf.dropped(), 2);
        assert_eq!(buf.len(), RECORD_LEN);
        assert_eq!(buf.as_bytes()[RECORD_LEN - 1], (RECORD_LEN - 1) as u8);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut buf: FrameBuffer = FrameBuffer::new();
        for _ in 0..RECORD_LEN + 3 {
            buf.push(1);
        }
        buf.reset();
        assert_eq!(buf.state(), FrameState::Empty);
        assert_eq!(buf.len(), 0);
        assert!(!buf.overflowed());
        assert_eq!(buf.dropped(), 0);
    }

    #[test]
    fn test_larger_capacity() {
        let mut buf = FrameBuffer::<256>::new();
        for _ in 0..100 {
            assert!(buf.push(7));
        }
        assert_eq!(buf.len(), 100);
        assert!(!buf.overflowed());
    }

    proptest! {
        #[test]
        fn prop_bounded_write(bytes in proptest::collection::vec(any::<u8>(), 0..100)) {
            let mut buf: FrameBuffer = FrameBuffer::new();
            for b in &bytes {
                buf.push(*b);
            }
            let kept = bytes.len().min(RECORD_LEN);
            prop_assert_eq!(buf.len(), kept);
            prop_assert_eq!(buf.as_bytes(), &bytes[..kept]);
            prop_assert_eq!(buf.overflowed(), bytes.len() > RECORD_LEN);
            prop_assert_eq!(buf.dropped(), bytes.len() - kept);
        }
    }
}
