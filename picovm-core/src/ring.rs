//! Single-producer/single-consumer byte ring buffer
//!
//! Shared between an interrupt handler and the main thread without locks.
//! The buffer is split exactly once into a [`Producer`] and a [`Consumer`];
//! the producer is the only writer of the `in` index and the consumer the
//! only writer of the `out` index. Indices run freely and are masked on
//! access, so occupancy is `in - out` (wrapping) and a full buffer holds all
//! `N` slots.

use portable_atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity byte ring buffer
///
/// `N` must be a power of two and at least 2; other sizes fail to compile
/// as soon as the buffer is used.
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    /// Next write slot (`in`), written only by the producer
    head: AtomicUsize,
    /// Next read slot (`out`), written only by the consumer
    tail: AtomicUsize,
    split: AtomicBool,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = {
        assert!(
            N >= 2 && N.is_power_of_two(),
            "ring buffer size must be a power of two >= 2"
        );
        N - 1
    };

    /// Create an empty buffer
    ///
    /// `const` so buffers can live in statics shared with interrupt handlers.
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            split: AtomicBool::new(false),
        }
    }

    /// Buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Split the buffer into its producer and consumer halves
    ///
    /// Succeeds once per buffer. Any later call returns `None`, so no
    /// second writer of either index can ever exist.
    pub fn split(&self) -> Option<(Producer<'_, N>, Consumer<'_, N>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((Producer { ring: self }, Consumer { ring: self }))
    }

    /// Check if [`split`](Self::split) has already handed out the halves
    pub fn is_split(&self) -> bool {
        self.split.load(Ordering::Acquire)
    }

    fn occupancy(&self, head: usize, tail: usize) -> usize {
        head.wrapping_sub(tail)
    }

    fn slot(&self, index: usize) -> &AtomicU8 {
        &self.slots[index & Self::MASK]
    }
}

/// Write half of a [`RingBuffer`]
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append a byte, dropping it if the buffer is full
    ///
    /// Returns `false` when the byte was dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        if self.ring.occupancy(head, tail) >= N {
            return false;
        }
        self.ring.slot(head).store(byte, Ordering::Relaxed);
        self.ring.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Append a byte unconditionally, overwriting the oldest unread byte
    /// when the buffer is full
    ///
    /// The consumer skips the overwritten bytes on its next read.
    pub fn force_push(&mut self, byte: u8) {
        let head = self.ring.head.load(Ordering::Relaxed);
        self.ring.slot(head).store(byte, Ordering::Relaxed);
        self.ring.head.store(head.wrapping_add(1), Ordering::Release);
    }

    /// Number of unread bytes (saturates at capacity after an overrun)
    pub fn len(&self) -> usize {
        let head = self.ring.head.load(Ordering::Relaxed);
        let tail = self.ring.tail.load(Ordering::Acquire);
        self.ring.occupancy(head, tail).min(N)
    }

    /// Check if no unread bytes remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the next [`push`](Self::push) would drop its byte
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }
}

/// Read half of a [`RingBuffer`]
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Remove the oldest byte
    ///
    /// If the producer overran the buffer with [`Producer::force_push`],
    /// `out` first jumps forward to the oldest byte still present.
    pub fn pop(&mut self) -> Option<u8> {
        let head = self.ring.head.load(Ordering::Acquire);
        let mut tail = self.ring.tail.load(Ordering::Relaxed);
        let used = self.ring.occupancy(head, tail);
        if used == 0 {
            return None;
        }
        if used > N {
            tail = head.wrapping_sub(N);
        }
        let byte = self.ring.slot(tail).load(Ordering::Relaxed);
        self.ring.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Read the slot at `out` without advancing
    ///
    /// On an empty buffer this is whatever was last stored in that slot.
    pub fn peek_stale(&self) -> u8 {
        let tail = self.ring.tail.load(Ordering::Relaxed);
        self.ring.slot(tail).load(Ordering::Relaxed)
    }

    /// Number of unread bytes (saturates at capacity after an overrun)
    pub fn len(&self) -> usize {
        let head = self.ring.head.load(Ordering::Acquire);
        let tail = self.ring.tail.load(Ordering::Relaxed);
        self.ring.occupancy(head, tail).min(N)
    }

    /// Check if no unread bytes remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_only_once() {
        let ring = RingBuffer::<4>::new();
        assert!(!ring.is_split());
        assert!(ring.split().is_some());
        assert!(ring.is_split());
        assert!(ring.split().is_none());
    }

    #[test]
    fn test_empty_buffer() {
        let ring = RingBuffer::<8>::new();
        let (producer, mut consumer) = ring.split().unwrap();

        assert!(consumer.is_empty());
        assert!(producer.is_empty());
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let ring = RingBuffer::<4>::new();
        let (mut producer, mut consumer) = ring.split().unwrap();

        // Walk the indices around the buffer several times
        for round in 0..10u8 {
            assert!(producer.push(round));
            assert!(producer.push(round.wrapping_add(100)));
            assert_eq!(consumer.len(), 2);
            assert_eq!(consumer.pop(), Some(round));
            assert_eq!(consumer.pop(), Some(round.wrapping_add(100)));
        }
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_full_buffer_drops_newest() {
        let ring = RingBuffer::<4>::new();
        let (mut producer, mut consumer) = ring.split().unwrap();

        for byte in 1..=4 {
            assert!(producer.push(byte));
        }
        assert!(producer.is_full());
        assert!(!producer.push(5));
        assert_eq!(consumer.len(), 4);

        let drained: heapless::Vec<u8, 8> = core::iter::from_fn(|| consumer.pop()).collect();
        assert_eq!(drained.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_force_push_overwrites_oldest() {
        let ring = RingBuffer::<4>::new();
        let (mut producer, mut consumer) = ring.split().unwrap();

        for byte in 1..=6 {
            producer.force_push(byte);
        }
        // Two oldest bytes were overwritten
        assert_eq!(consumer.len(), 4);
        let drained: heapless::Vec<u8, 8> = core::iter::from_fn(|| consumer.pop()).collect();
        assert_eq!(drained.as_slice(), &[3, 4, 5, 6]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_peek_stale_does_not_advance() {
        let ring = RingBuffer::<4>::new();
        let (mut producer, mut consumer) = ring.split().unwrap();

        producer.push(0x42);
        assert_eq!(consumer.pop(), Some(0x42));

        // Slot at `out` was never written in this lap
        assert_eq!(consumer.peek_stale(), 0);
        assert!(consumer.is_empty());

        // Slots 1, 2, 3, 0 take the next lap; after draining, `out` is
        // back at slot 1 which still holds the lap-old byte
        for byte in [1, 2, 3, 4] {
            producer.push(byte);
        }
        while consumer.pop().is_some() {}
        assert_eq!(consumer.peek_stale(), 1);
        assert_eq!(consumer.len(), 0);
    }

    #[test]
    fn test_static_buffer() {
        static RING: RingBuffer<16> = RingBuffer::new();
        let (mut producer, mut consumer) = RING.split().unwrap();
        producer.push(7);
        assert_eq!(consumer.pop(), Some(7));
    }

    proptest! {
        #[test]
        fn prop_fifo_up_to_capacity(data in proptest::collection::vec(any::<u8>(), 0..=32)) {
            let ring = RingBuffer::<32>::new();
            let (mut producer, mut consumer) = ring.split().unwrap();

            for &byte in &data {
                prop_assert!(producer.push(byte));
            }
            for &byte in &data {
                prop_assert_eq!(consumer.pop(), Some(byte));
            }
            prop_assert_eq!(consumer.pop(), None);
        }

        #[test]
        fn prop_overflow_keeps_indices_sane(extra in 1usize..64) {
            let ring = RingBuffer::<16>::new();
            let (mut producer, mut consumer) = ring.split().unwrap();

            let mut accepted = 0;
            for i in 0..(16 + extra) {
                if producer.push(i as u8) {
                    accepted += 1;
                }
            }
            prop_assert_eq!(accepted, 16);
            prop_assert_eq!(consumer.len(), 16);

            let mut drained = 0u8;
            while let Some(byte) = consumer.pop() {
                prop_assert_eq!(byte, drained);
                drained += 1;
            }
            prop_assert_eq!(drained, 16);
            prop_assert!(producer.is_empty());
        }
    }
}
