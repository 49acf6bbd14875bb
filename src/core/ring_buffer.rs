//! Fixed-capacity circular byte buffer
//!
//! Plain head/tail indices plus a `full` flag, because `head == tail` is
//! ambiguous between empty and full. The buffer does no locking of its own:
//! every mutating call takes `&mut self`, and the queue backend owns it behind
//! its mutex.

use std::ops::Range;

use super::ByteStore;
use crate::error::MqResult;

/// Circular byte buffer over a [`ByteStore`].
pub struct RingBuffer {
    store: ByteStore,
    // Next byte to write
    head: usize,
    // Next byte to read
    tail: usize,
    full: bool,
}

impl RingBuffer {
    /// Creates an empty ring of `capacity` bytes.
    ///
    /// Allocation happens once here; reads and writes never allocate.
    pub fn new(capacity: usize) -> MqResult<Self> {
        let mut store = ByteStore::allocate(capacity)?;
        store.mark_free(0..capacity);

        Ok(Self {
            store,
            head: 0,
            tail: 0,
            full: false,
        })
    }

    /// Capacity in bytes.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Bytes currently stored.
    #[inline(always)]
    pub fn used(&self) -> usize {
        if self.full {
            self.capacity()
        } else if self.head >= self.tail {
            self.head - self.tail
        } else {
            self.capacity() + self.head - self.tail
        }
    }

    /// Bytes available for writing.
    #[inline(always)]
    pub fn free(&self) -> usize {
        self.capacity() - self.used()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    /// Copies `dst.len()` bytes from the front without consuming them.
    ///
    /// Returns `false` (and copies nothing) if fewer bytes are stored.
    pub fn peek(&self, dst: &mut [u8]) -> bool {
        if dst.len() > self.used() {
            return false;
        }

        let data = self.store.as_slice();
        let mut copied = 0;
        for range in self.segments(self.tail, dst.len()) {
            let n = range.len();
            dst[copied..copied + n].copy_from_slice(&data[range]);
            copied += n;
        }
        true
    }

    /// Copies `dst.len()` bytes from the front and releases them.
    ///
    /// Returns `false` (and consumes nothing) if fewer bytes are stored.
    pub fn read(&mut self, dst: &mut [u8]) -> bool {
        if !self.peek(dst) {
            return false;
        }
        if dst.is_empty() {
            return true;
        }

        for range in self.segments(self.tail, dst.len()) {
            self.store.mark_free(range);
        }
        self.tail = (self.tail + dst.len()) % self.capacity();
        // Something was removed, so the ring cannot be full
        self.full = false;
        true
    }

    /// Appends `src` at the back.
    ///
    /// Returns `false` (and writes nothing) if `src` does not fit.
    pub fn write(&mut self, src: &[u8]) -> bool {
        if src.len() > self.free() {
            return false;
        }
        if src.is_empty() {
            return true;
        }

        let mut copied = 0;
        for range in self.segments(self.head, src.len()) {
            let n = range.len();
            self.store.check_free(range.clone());
            self.store.as_mut_slice()[range].copy_from_slice(&src[copied..copied + n]);
            copied += n;
        }
        self.head = (self.head + src.len()) % self.capacity();
        // Something was inserted, so head catching tail means full
        if self.head == self.tail {
            self.full = true;
        }
        true
    }

    /// Splits `len` bytes starting at `start` into at most two contiguous
    /// store ranges. The second range is empty when nothing wraps.
    #[inline(always)]
    fn segments(&self, start: usize, len: usize) -> [Range<usize>; 2] {
        let first = (self.capacity() - start).min(len);
        [start..start + first, 0..len - first]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_accounting(rb: &RingBuffer) {
        assert_eq!(rb.used() + rb.free(), rb.capacity());
    }

    #[test]
    fn test_basic_write_read() {
        let mut rb = RingBuffer::new(16).unwrap();

        assert!(rb.is_empty());
        assert_eq!(rb.free(), 16);

        assert!(rb.write(b"abcd"));
        assert_eq!(rb.used(), 4);
        assert_accounting(&rb);

        let mut out = [0u8; 4];
        assert!(rb.read(&mut out));
        assert_eq!(&out, b"abcd");
        assert!(rb.is_empty());
        assert_accounting(&rb);
    }

    #[test]
    fn test_full_buffer() {
        let mut rb = RingBuffer::new(4).unwrap();

        assert!(rb.write(b"wxyz"));
        assert_eq!(rb.used(), 4);
        assert_eq!(rb.free(), 0);
        assert!(!rb.write(b"!")); // No room left

        let mut out = [0u8; 1];
        assert!(rb.read(&mut out));
        assert_eq!(&out, b"w");
        assert!(rb.write(b"!")); // Now it fits
        assert_eq!(rb.used(), 4);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut rb = RingBuffer::new(8).unwrap();
        assert!(rb.write(b"hello"));

        let mut out = [0u8; 5];
        assert!(rb.peek(&mut out));
        assert_eq!(&out, b"hello");
        assert_eq!(rb.used(), 5);

        assert!(rb.read(&mut out));
        assert_eq!(rb.used(), 0);
    }

    #[test]
    fn test_short_read_fails_without_side_effects() {
        let mut rb = RingBuffer::new(8).unwrap();
        assert!(rb.write(b"abc"));

        let mut out = [0u8; 4];
        assert!(!rb.read(&mut out));
        assert!(!rb.peek(&mut out));
        assert_eq!(rb.used(), 3);
    }

    #[test]
    fn test_wraparound_split_copies() {
        let mut rb = RingBuffer::new(8).unwrap();

        // Fill and drain with a stride that does not divide the capacity so
        // transfers regularly straddle the end of the store
        for round in 0u8..20 {
            let msg = [round, round.wrapping_add(1), round.wrapping_add(2)];
            assert!(rb.write(&msg));
            let mut out = [0u8; 3];
            assert!(rb.read(&mut out));
            assert_eq!(out, msg);
            assert_accounting(&rb);
        }
    }

    #[test]
    fn test_full_flag_after_wrapping_write() {
        let mut rb = RingBuffer::new(6).unwrap();
        assert!(rb.write(b"1234"));
        let mut out = [0u8; 4];
        assert!(rb.read(&mut out));

        // head = tail = 4; a 6-byte write wraps and lands head back on tail
        assert!(rb.write(b"abcdef"));
        assert_eq!(rb.used(), 6);
        assert_eq!(rb.free(), 0);

        let mut out = [0u8; 6];
        assert!(rb.read(&mut out));
        assert_eq!(&out, b"abcdef");
        assert!(rb.is_empty());
    }

    #[test]
    fn test_zero_length_transfers_are_noops() {
        let mut rb = RingBuffer::new(4).unwrap();
        assert!(rb.write(b""));
        assert!(rb.is_empty());

        assert!(rb.write(b"full"));
        assert!(rb.read(&mut []));
        assert_eq!(rb.used(), 4);
    }
}
