//! Lock-Free Ring Buffer Implementation

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default buffer capacity (samples in flight between producer and consumer)
pub const DEFAULT_CAPACITY: usize = 16;

/// Lock-free SPSC ring buffer
///
/// Only reachable through the [`Producer`] / [`Consumer`] pair returned by
/// [`RingBuffer::split`], so there is exactly one writer and one reader.
pub struct RingBuffer<T> {
    /// Pre-allocated storage
    storage: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Capacity of the buffer
    capacity: usize,
    /// Items ever pushed (write pointer, wraps)
    head: AtomicUsize,
    /// Items ever popped (read pointer, wraps)
    tail: AtomicUsize,
    /// Total items accepted (for statistics)
    total_written: AtomicUsize,
    /// Items rejected because the buffer was full
    dropped: AtomicUsize,
}

// SAFETY: a slot is only written by the single producer while it is outside
// the readable window and only read by the single consumer while inside it.
// The head/tail Release/Acquire pairs order those accesses.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T: Copy + Send> RingBuffer<T> {
    /// Allocate a buffer and split it into its two endpoints
    ///
    /// This is the only allocation the buffer ever makes.
    pub fn split(capacity: usize) -> (Producer<T>, Consumer<T>) {
        assert!(capacity > 0, "Ring buffer capacity must be > 0");
        let storage: Vec<UnsafeCell<MaybeUninit<T>>> = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        let ring = Arc::new(Self {
            storage: storage.into_boxed_slice(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            total_written: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        });
        (
            Producer {
                ring: Arc::clone(&ring),
            },
            Consumer { ring },
        )
    }

    /// Split with the default capacity
    pub fn split_default() -> (Producer<T>, Consumer<T>) {
        Self::split(DEFAULT_CAPACITY)
    }

    fn slot(&self, index: usize) -> *mut MaybeUninit<T> {
        self.storage[index % self.capacity].get()
    }

    /// Get the number of items currently buffered
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(self.capacity)
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get total items accepted
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Get total items rejected on a full buffer
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Writing endpoint; wait-free, never allocates
pub struct Producer<T> {
    ring: Arc<RingBuffer<T>>,
}

impl<T: Copy + Send> Producer<T> {
    /// Push an item, handing it back if the buffer is full
    ///
    /// A full buffer keeps what the consumer has not read yet and rejects the
    /// new item (bounded-drop). The rejection is counted in [`RingBuffer::dropped`].
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let tail = ring.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) >= ring.capacity {
            ring.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(item);
        }

        // SAFETY: slot `head` is outside the consumer's window until the
        // Release store below publishes it.
        unsafe {
            (*ring.slot(head)).write(item);
        }

        ring.head.store(head.wrapping_add(1), Ordering::Release);
        ring.total_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Shared view of the underlying buffer
    pub fn ring(&self) -> &RingBuffer<T> {
        &self.ring
    }
}

/// Reading endpoint
pub struct Consumer<T> {
    ring: Arc<RingBuffer<T>>,
}

impl<T: Copy + Send> Consumer<T> {
    /// Pop the oldest item
    pub fn pop(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let head = ring.head.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        // SAFETY: the Acquire load of `head` makes the producer's write to
        // slot `tail` visible, and the producer will not reuse the slot until
        // the Release store below.
        let item = unsafe { (*ring.slot(tail)).assume_init_read() };

        ring.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Pop everything currently buffered, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    /// Shared view of the underlying buffer
    pub fn ring(&self) -> &RingBuffer<T> {
        &self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn test_push_and_pop_in_order() {
        let (mut tx, mut rx) = RingBuffer::split(10);

        for i in 0..5u32 {
            tx.push(i).unwrap();
        }

        assert_eq!(rx.ring().len(), 5);
        assert_eq!(rx.drain().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(rx.ring().is_empty());
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_full_buffer_drops_newest() {
        let (mut tx, mut rx) = RingBuffer::split(3);

        for i in 0..5u32 {
            let _ = tx.push(i);
        }

        assert!(tx.ring().is_full());
        assert_eq!(tx.ring().dropped(), 2);
        assert_eq!(tx.ring().total_written(), 3);
        assert_eq!(tx.push(99), Err(99));

        assert_eq!(rx.drain().collect::<Vec<_>>(), vec![0, 1, 2]);

        // Space freed by the consumer is usable again
        tx.push(7).unwrap();
        assert_eq!(rx.pop(), Some(7));
    }

    #[test]
    fn test_wraps_around_many_times() {
        let (mut tx, mut rx) = RingBuffer::split(4);
        for i in 0..1000u64 {
            tx.push(i).unwrap();
            assert_eq!(rx.pop(), Some(i));
        }
        assert_eq!(tx.ring().total_written(), 1000);
        assert_eq!(tx.ring().dropped(), 0);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (mut tx, mut rx) = RingBuffer::split(8);
        const N: u64 = 20_000;

        let producer = std::thread::spawn(move || {
            for i in 0..N {
                // Spin instead of dropping so every item arrives
                while tx.push(i).is_err() {
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < N {
            if let Some(v) = rx.pop() {
                assert_eq!(v, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
        assert!(rx.ring().is_empty());
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        let _ = RingBuffer::<u8>::split(0);
    }

    proptest! {
        #[test]
        fn prop_matches_bounded_queue(ops in proptest::collection::vec(any::<Option<u8>>(), 0..200)) {
            let (mut tx, mut rx) = RingBuffer::split(5);
            let mut model = VecDeque::new();
            let mut dropped = 0;

            for op in ops {
                match op {
                    Some(v) => {
                        if model.len() < 5 {
                            model.push_back(v);
                            prop_assert!(tx.push(v).is_ok());
                        } else {
                            dropped += 1;
                            prop_assert_eq!(tx.push(v), Err(v));
                        }
                    }
                    None => prop_assert_eq!(rx.pop(), model.pop_front()),
                }
                prop_assert_eq!(rx.ring().len(), model.len());
            }
            prop_assert_eq!(tx.ring().dropped(), dropped);
        }
    }
}
