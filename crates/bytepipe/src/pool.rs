//! Reusable storage for owned segments.

use std::sync::Mutex;

/// Pool of byte buffers backing owned segments.
///
/// Promotion and preservation copy producer bytes into owned storage; those
/// buffers come from here and return here when the last reference to a
/// segment is gone, so a long-lived channel settles into a steady state with
/// no per-write allocations on the copying path.
///
/// A pool is injected at channel construction
/// ([`channel_with_pool`](crate::channel_with_pool)) and may be shared
/// between channels.
#[derive(Debug)]
pub struct SegmentPool {
    slabs: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    min_capacity: usize,
}

impl SegmentPool {
    /// Creates a pool retaining up to `max_retained` buffers of at least
    /// `min_capacity` bytes each.
    pub fn new(max_retained: usize, min_capacity: usize) -> Self {
        Self {
            slabs: Mutex::new(Vec::with_capacity(max_retained)),
            max_retained,
            min_capacity,
        }
    }

    /// Takes an empty buffer with capacity for at least `len` bytes.
    ///
    /// Returns `(buffer, reused)` where `reused` is true when the buffer came
    /// from the pool rather than a fresh allocation.
    pub(crate) fn rent(&self, len: usize) -> (Vec<u8>, bool) {
        let mut slabs = self.slabs.lock().unwrap();
        if let Some(idx) = slabs.iter().position(|slab| slab.capacity() >= len) {
            return (slabs.swap_remove(idx), true);
        }
        drop(slabs);

        (Vec::with_capacity(len.max(self.min_capacity)), false)
    }

    /// Returns a buffer to the pool, or drops it if the pool is full.
    pub(crate) fn give(&self, mut slab: Vec<u8>) {
        slab.clear();
        let mut slabs = self.slabs.lock().unwrap();
        if slabs.len() < self.max_retained {
            slabs.push(slab);
        }
    }

    /// Number of buffers currently held for reuse.
    pub fn retained(&self) -> usize {
        self.slabs.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rent_allocates_when_empty() {
        let pool = SegmentPool::new(4, 64);
        let (slab, reused) = pool.rent(16);
        assert!(!reused);
        assert!(slab.capacity() >= 64);
        assert!(slab.is_empty());
    }

    #[test]
    fn test_round_trip_reuses_storage() {
        let pool = SegmentPool::new(4, 64);
        let (mut slab, _) = pool.rent(16);
        slab.extend_from_slice(b"scratch");
        pool.give(slab);
        assert_eq!(pool.retained(), 1);

        let (slab, reused) = pool.rent(16);
        assert!(reused);
        assert!(slab.is_empty());
        assert_eq!(pool.retained(), 0);
    }

    #[test]
    fn test_retention_limit() {
        let pool = SegmentPool::new(1, 8);
        pool.give(Vec::with_capacity(8));
        pool.give(Vec::with_capacity(8));
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn test_rent_skips_undersized_slabs() {
        let pool = SegmentPool::new(4, 8);
        pool.give(Vec::with_capacity(8));
        let (slab, reused) = pool.rent(1024);
        assert!(!reused);
        assert!(slab.capacity() >= 1024);
    }
}
