//! Producer handle and the write frame.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::channel::Shared;
use crate::error::ChannelError;
use crate::metrics::MetricsSnapshot;
use crate::segment::SegmentNode;

/// Producer handle for publishing byte regions into the channel.
///
/// # Note
///
/// `ByteWriter` does NOT implement `Clone`. This is intentional: the channel
/// is single-producer, and a second writer would break the write-frame
/// protocol that makes borrowed regions safe to expose to the consumer.
pub struct ByteWriter {
    shared: Arc<Shared>,
}

impl ByteWriter {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Publishes a region of the producer's own memory for the duration of
    /// the scope.
    ///
    /// Inside the scope the region is visible to the consumer as a borrowed
    /// segment, with zero copies. The scope's end is the *release point*: if the
    /// consumer has acknowledged past the region by then, its bytes were
    /// moved through the channel without ever being copied; anything still
    /// live is promoted into channel-owned storage first. The region borrow
    /// lasts exactly as long as the scope, so the producer cannot touch the
    /// memory again before release.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut scratch = [0u8; 4096];
    /// let n = source.read(&mut scratch)?;
    /// writer.write(&scratch[..n], |frame| {
    ///     frame.flush()?;
    ///     // optional: give a concurrent consumer a moment to drain the
    ///     // region in place before the release copy
    ///     frame.wait_drained();
    ///     Ok(())
    /// })?;
    /// // released: scratch may be reused
    /// ```
    pub fn write<R, F>(&mut self, region: &[u8], scope: F) -> Result<R, ChannelError>
    where
        F: FnOnce(&mut WriteFrame<'_>) -> Result<R, ChannelError>,
    {
        let node = self.shared.begin_write(region)?;
        let mut frame = WriteFrame {
            shared: &self.shared,
            node,
            flushed: false,
        };
        scope(&mut frame)
        // The frame drops here, on success, error, and unwind alike, and
        // runs promotion-or-unlink for the region.
    }

    /// Writes and flushes in one step, releasing immediately.
    ///
    /// The copying slow path: any byte the consumer has not already
    /// acknowledged is promoted at once. Convenient when the producer does
    /// not keep the region alive.
    pub fn write_through(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.write(bytes, |frame| frame.flush())
    }

    /// Signals end-of-stream, or a fault when `error` is given.
    ///
    /// A fault is terminal: once the consumer drains the already-published
    /// bytes, every read surfaces [`ChannelError::ProducerFault`].
    pub fn complete(&mut self, error: Option<&str>) -> Result<(), ChannelError> {
        self.shared.writer_complete(error)
    }

    /// Published bytes the consumer has not yet acknowledged.
    pub fn unread_bytes(&self) -> u64 {
        let frontier = self.shared.frontier.load(Ordering::Acquire);
        frontier - self.shared.consumed_pos.load(Ordering::Acquire)
    }

    /// Snapshot of the channel counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

/// A scoped handle over one published region.
///
/// Obtained inside [`ByteWriter::write`]. Dropping the frame is the
/// producer's release point.
pub struct WriteFrame<'c> {
    shared: &'c Arc<Shared>,
    node: Arc<SegmentNode>,
    flushed: bool,
}

impl WriteFrame<'_> {
    /// Publishes the region to the consumer, waking a suspended read.
    /// Idempotent.
    pub fn flush(&mut self) -> Result<(), ChannelError> {
        if self.flushed {
            return Ok(());
        }
        self.shared.flush(&self.node)?;
        self.flushed = true;
        Ok(())
    }

    /// Returns `true` once the region has been published.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Bytes this frame publishes.
    pub fn written(&self) -> usize {
        self.node.write_end()
    }

    /// Briefly spins for a concurrent consumer to acknowledge past this
    /// region, so release can take the no-copy path.
    ///
    /// Returns `true` if the region was fully consumed. Bounded: gives up
    /// after a short spin-then-yield sequence rather than parking the
    /// producer.
    pub fn wait_drained(&self) -> bool {
        if !self.flushed {
            return false;
        }
        let target = self.node.end_position();
        for step in 0..16u32 {
            if self.shared.consumed_pos.load(Ordering::Acquire) >= target {
                return true;
            }
            if step < 6 {
                for _ in 0..(1u32 << step) {
                    std::hint::spin_loop();
                }
            } else {
                std::thread::yield_now();
            }
        }
        self.shared.consumed_pos.load(Ordering::Acquire) >= target
    }
}

impl Drop for WriteFrame<'_> {
    fn drop(&mut self) {
        if self.flushed {
            self.shared.release_frame(&self.node);
        } else {
            self.shared.abandon_write();
        }
    }
}
