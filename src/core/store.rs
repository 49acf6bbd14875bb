//! Anonymous mmap-backed byte store for ring buffers
//!
//! The store is one contiguous region mapped once at creation:
//! - No growth: capacity is fixed for the lifetime of the queue
//! - Kernel-zeroed pages: nothing is read before it was written
//! - Debug poisoning: released bytes are filled with [`POISON`] so that a
//!   write over live data is caught by an assertion

use std::ops::Range;

use memmap2::MmapMut;

use crate::error::{MqError, MqResult};

/// Marks a byte that the ring considers released.
pub const POISON: u8 = 0xDD;

/// Fixed-size byte region owned by a single ring buffer.
pub struct ByteStore {
    map: MmapMut,
}

impl ByteStore {
    /// Maps `capacity` bytes of anonymous memory.
    ///
    /// Mapping failures surface as [`MqError::OutOfMemory`].
    pub fn allocate(capacity: usize) -> MqResult<Self> {
        if capacity == 0 {
            return Err(MqError::InvalidArgument("store capacity must be non-zero"));
        }

        let map = MmapMut::map_anon(capacity).map_err(|err| {
            tracing::debug!(capacity, %err, "anonymous mapping failed");
            MqError::OutOfMemory { size: capacity }
        })?;

        Ok(Self { map })
    }

    /// Capacity in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Poisons `range` in debug builds. No-op in release.
    #[inline]
    pub fn mark_free(&mut self, range: Range<usize>) {
        if cfg!(debug_assertions) {
            self.map[range].fill(POISON);
        }
    }

    /// Asserts (debug builds only) that every byte in `range` is poisoned.
    #[inline]
    pub fn check_free(&self, range: Range<usize>) {
        if cfg!(debug_assertions) {
            let start = range.start;
            if let Some(pos) = self.map[range].iter().position(|&b| b != POISON) {
                panic!("ring store overwrite of live byte at offset {}", start + pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zero_rejected() {
        assert!(matches!(
            ByteStore::allocate(0),
            Err(MqError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_store_basic() {
        let mut store = ByteStore::allocate(4096).unwrap();
        assert_eq!(store.len(), 4096);

        store.as_mut_slice()[..5].copy_from_slice(b"Hello");
        assert_eq!(&store.as_slice()[..5], b"Hello");
    }

    #[test]
    fn test_mark_then_check_free() {
        let mut store = ByteStore::allocate(64).unwrap();
        store.mark_free(0..64);
        store.check_free(0..64);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "overwrite of live byte")]
    fn test_check_free_detects_live_bytes() {
        let mut store = ByteStore::allocate(64).unwrap();
        store.mark_free(0..64);
        store.as_mut_slice()[10] = 1;
        store.check_free(8..16);
    }
}
