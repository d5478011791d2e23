//! Segment chain nodes and the views that read through them.
//!
//! A segment is one contiguous region of bytes published by a single producer
//! write. Its storage is *borrowed* (a pointer into memory the producer owns
//! for the duration of its write frame) until the channel *promotes* it,
//! copying the region into pooled, channel-owned storage, or releases it.
//! The node allocation itself is the chain-link identity: cursors and views
//! hold the node, and promotion rewrites only the storage behind it, so they
//! stay valid across the copy.
//!
//! Every data access goes through [`ByteView`], which revalidates the node's
//! storage on each call. Access to a released region fails with
//! [`ChannelError::UseAfterRelease`]; it never dereferences freed memory.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::ChannelError;
use crate::metrics::Metrics;
use crate::pool::SegmentPool;

/// Backing storage of one segment.
#[derive(Debug)]
enum Storage {
    /// Region owned by the producer's live write frame.
    Borrowed { ptr: *const u8, len: usize },
    /// Channel-owned copy, drawn from the segment pool.
    Owned(Vec<u8>),
    /// Storage handed back; data access fails deterministically.
    Released,
}

/// Outcome of a promotion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Promotion {
    /// Borrowed bytes were copied into owned storage.
    Copied,
    /// The segment was already owned; nothing to do.
    AlreadyOwned,
    /// The storage was already released (fully consumed and trimmed).
    Released,
}

/// One node of the singly-linked segment chain.
pub(crate) struct SegmentNode {
    /// Absolute stream offset of the region's first byte.
    base: u64,
    /// First free byte index within the region (fixed at publication).
    write_end: usize,
    /// First unread byte index within the region.
    read_start: AtomicUsize,
    /// Live preservations of this segment.
    refcount: AtomicUsize,
    /// Set when chain maintenance unlinks the node; plain views into a
    /// trimmed node fail, preserved views do not.
    trimmed: AtomicBool,
    /// Guards the borrowed→owned→released storage transitions against
    /// concurrent view reads.
    storage: RwLock<Storage>,
    next: Mutex<Option<Arc<SegmentNode>>>,
}

// Safety: the Borrowed pointer is only dereferenced under the storage read
// lock while the variant is still Borrowed. The variant leaves Borrowed
// (under the write lock) when the producer's write frame ends, and the frame
// holds a shared borrow of the region for its whole scope, so the pointee is
// live and unaliased-for-writes whenever it is read.
unsafe impl Send for SegmentNode {}
unsafe impl Sync for SegmentNode {}

impl SegmentNode {
    /// Creates a node borrowing the producer's region.
    pub(crate) fn borrowed(base: u64, region: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            base,
            write_end: region.len(),
            read_start: AtomicUsize::new(0),
            refcount: AtomicUsize::new(0),
            trimmed: AtomicBool::new(false),
            storage: RwLock::new(Storage::Borrowed {
                ptr: region.as_ptr(),
                len: region.len(),
            }),
            next: Mutex::new(None),
        })
    }

    #[inline]
    pub(crate) fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub(crate) fn write_end(&self) -> usize {
        self.write_end
    }

    /// Absolute stream offset one past the region's last byte.
    #[inline]
    pub(crate) fn end_position(&self) -> u64 {
        self.base + self.write_end as u64
    }

    #[inline]
    pub(crate) fn read_start(&self) -> usize {
        self.read_start.load(Ordering::Relaxed)
    }

    pub(crate) fn set_read_start(&self, read_start: usize) {
        self.read_start.store(read_start, Ordering::Relaxed);
    }

    pub(crate) fn next(&self) -> Option<Arc<SegmentNode>> {
        self.next.lock().unwrap().clone()
    }

    pub(crate) fn set_next(&self, node: Arc<SegmentNode>) {
        *self.next.lock().unwrap() = Some(node);
    }

    pub(crate) fn is_owned(&self) -> bool {
        matches!(&*self.storage.read().unwrap(), Storage::Owned(_))
    }

    #[inline]
    pub(crate) fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }

    pub(crate) fn incref(&self) {
        self.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one preservation. Frees the storage once the node has also been
    /// trimmed out of the chain.
    pub(crate) fn decref(&self, pool: &SegmentPool, metrics: &Metrics) {
        if self.refcount.fetch_sub(1, Ordering::AcqRel) == 1
            && self.trimmed.load(Ordering::Acquire)
        {
            self.release_storage(pool, metrics);
        }
    }

    pub(crate) fn mark_trimmed(&self) {
        self.trimmed.store(true, Ordering::Release);
    }

    /// Copies borrowed bytes into pooled owned storage, in place.
    ///
    /// The full `[0, write_end)` region is copied at unchanged offsets, so
    /// cursors and views keep their positions without rebasing.
    pub(crate) fn promote(&self, pool: &SegmentPool, metrics: &Metrics) -> Promotion {
        let mut storage = self.storage.write().unwrap();
        match &*storage {
            Storage::Borrowed { ptr, len } => {
                let (mut slab, reused) = pool.rent(*len);
                // Safety: see the Send/Sync rationale above. The variant is
                // still Borrowed, so the producer's region is live.
                slab.extend_from_slice(unsafe { std::slice::from_raw_parts(*ptr, *len) });
                *storage = Storage::Owned(slab);
                if reused {
                    metrics.record_segment_reused();
                }
                metrics.record_promotion();
                Promotion::Copied
            }
            Storage::Owned(_) => Promotion::AlreadyOwned,
            Storage::Released => Promotion::Released,
        }
    }

    /// Frees the storage: owned buffers return to the pool, borrowed regions
    /// are forgotten. Idempotent.
    pub(crate) fn release_storage(&self, pool: &SegmentPool, metrics: &Metrics) {
        let mut storage = self.storage.write().unwrap();
        if let Storage::Owned(slab) = std::mem::replace(&mut *storage, Storage::Released) {
            pool.give(slab);
            metrics.record_segment_reclaimed();
        }
    }

    /// Runs `f` over `[start, end)` of the region.
    ///
    /// Fails with `UseAfterRelease` when the storage has been released, or
    /// when the node was trimmed past and the caller does not hold a
    /// preservation.
    pub(crate) fn with_bytes<R>(
        &self,
        start: usize,
        end: usize,
        preserved: bool,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, ChannelError> {
        if !preserved && self.trimmed.load(Ordering::Acquire) {
            return Err(ChannelError::UseAfterRelease);
        }

        let storage = self.storage.read().unwrap();
        let region: &[u8] = match &*storage {
            // Safety: see the Send/Sync rationale above.
            Storage::Borrowed { ptr, len } => unsafe { std::slice::from_raw_parts(*ptr, *len) },
            Storage::Owned(slab) => slab.as_slice(),
            Storage::Released => return Err(ChannelError::UseAfterRelease),
        };

        debug_assert!(start <= end && end <= region.len());
        Ok(f(&region[start..end]))
    }
}

impl fmt::Debug for SegmentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentNode")
            .field("base", &self.base)
            .field("write_end", &self.write_end)
            .field("read_start", &self.read_start())
            .field("refcount", &self.refcount())
            .finish_non_exhaustive()
    }
}

/// A validated window into one segment's bytes.
///
/// Views are cheap handles: they hold the segment node, not the bytes, and
/// revalidate the node on every access. After the backing region is released
/// (the producer's write frame ended without promotion, the consumer
/// acknowledged past the segment, or a preserved handle was released) every
/// access fails with [`ChannelError::UseAfterRelease`].
#[derive(Clone)]
pub struct ByteView {
    node: Arc<SegmentNode>,
    start: usize,
    end: usize,
    preserved: bool,
}

impl ByteView {
    pub(crate) fn new(node: Arc<SegmentNode>, start: usize, end: usize, preserved: bool) -> Self {
        debug_assert!(start <= end && end <= node.write_end());
        Self {
            node,
            start,
            end,
            preserved,
        }
    }

    /// Number of bytes the view spans.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the view spans no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Reads one byte.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; use [`len`](Self::len) first.
    pub fn byte_at(&self, index: usize) -> Result<u8, ChannelError> {
        assert!(index < self.len(), "byte index out of range");
        self.with_bytes(|bytes| bytes[index])
    }

    /// Runs `f` over the viewed bytes without copying them.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, ChannelError> {
        self.node.with_bytes(self.start, self.end, self.preserved, f)
    }

    /// Materializes the viewed bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, ChannelError> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// Copies into `dst`, returning how many bytes were copied.
    pub fn copy_to(&self, dst: &mut [u8]) -> Result<usize, ChannelError> {
        self.with_bytes(|bytes| {
            let n = bytes.len().min(dst.len());
            dst[..n].copy_from_slice(&bytes[..n]);
            n
        })
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("position", &(self.node.base() + self.start as u64))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_env() -> (SegmentPool, Metrics) {
        (SegmentPool::new(4, 16), Metrics::new(true))
    }

    #[test]
    fn test_borrowed_read_through_view() {
        let region = *b"hello";
        let node = SegmentNode::borrowed(0, &region);
        let view = ByteView::new(Arc::clone(&node), 0, 5, false);
        assert_eq!(view.to_vec().unwrap(), b"hello");
        assert_eq!(view.byte_at(1).unwrap(), b'e');
    }

    #[test]
    fn test_promotion_keeps_offsets() {
        let (pool, metrics) = test_env();
        let region = *b"hello world";
        let node = SegmentNode::borrowed(0, &region);
        let view = ByteView::new(Arc::clone(&node), 6, 11, false);

        assert_eq!(node.promote(&pool, &metrics), Promotion::Copied);
        assert_eq!(node.promote(&pool, &metrics), Promotion::AlreadyOwned);
        assert_eq!(view.to_vec().unwrap(), b"world");
        assert_eq!(metrics.snapshot().promotions, 1);
    }

    #[test]
    fn test_release_fails_access() {
        let (pool, metrics) = test_env();
        let region = *b"gone";
        let node = SegmentNode::borrowed(0, &region);
        let view = ByteView::new(Arc::clone(&node), 0, 4, false);

        node.release_storage(&pool, &metrics);
        assert_eq!(view.to_vec(), Err(ChannelError::UseAfterRelease));
    }

    #[test]
    fn test_trimmed_node_rejects_plain_views_only() {
        let (pool, metrics) = test_env();
        let region = *b"kept";
        let node = SegmentNode::borrowed(0, &region);
        node.promote(&pool, &metrics);
        node.incref();
        node.mark_trimmed();

        let plain = ByteView::new(Arc::clone(&node), 0, 4, false);
        let preserved = ByteView::new(Arc::clone(&node), 0, 4, true);
        assert_eq!(plain.to_vec(), Err(ChannelError::UseAfterRelease));
        assert_eq!(preserved.to_vec().unwrap(), b"kept");

        node.decref(&pool, &metrics);
        assert_eq!(preserved.to_vec(), Err(ChannelError::UseAfterRelease));
        assert_eq!(pool.retained(), 1);
    }
}
