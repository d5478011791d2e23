//! Readable and preserved buffer views over the segment chain.

use std::fmt;
use std::sync::Arc;

use crate::channel::Shared;
use crate::cursor::Cursor;
use crate::error::ChannelError;
use crate::segment::{ByteView, Promotion, SegmentNode};

/// A view spanning `[start, end)` over the segment chain, delivered by a
/// read.
///
/// The buffer does not own bytes; it walks the chain. Slicing narrows the
/// span without copying, [`to_vec`](Self::to_vec) materializes it, and
/// [`preserve`](Self::preserve) extends the span's lifetime past the
/// producer's write frame.
///
/// A buffer stays cheap to clone and to hold, but its *data* is only
/// guaranteed accessible until the consumer acknowledges past it; later
/// access fails with [`ChannelError::UseAfterRelease`].
#[derive(Clone)]
pub struct ReadableBuffer {
    shared: Arc<Shared>,
    start: Cursor,
    end: Cursor,
    preserved: bool,
}

impl ReadableBuffer {
    pub(crate) fn new(shared: Arc<Shared>, start: Cursor, end: Cursor, preserved: bool) -> Self {
        debug_assert!(start.position() <= end.position());
        Self {
            shared,
            start,
            end,
            preserved,
        }
    }

    /// Cursor at the first unread byte.
    pub fn start(&self) -> Cursor {
        self.start.clone()
    }

    /// Cursor one past the last readable byte.
    pub fn end(&self) -> Cursor {
        self.end.clone()
    }

    /// Number of readable bytes.
    pub fn len(&self) -> usize {
        self.start.distance_to(&self.end) as usize
    }

    /// Returns `true` if the buffer spans no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View over the prefix held by the first segment, or `None` if the
    /// buffer is empty.
    pub fn first(&self) -> Option<ByteView> {
        self.segments().next()
    }

    /// Iterates the buffer one segment view at a time, in stream order.
    pub fn segments(&self) -> SegmentIter {
        SegmentIter {
            node: self.start.node().cloned(),
            offset: self.start.offset(),
            end_position: self.end.position(),
            preserved: self.preserved,
        }
    }

    /// Narrows to `[from, to)`. Both cursors must lie within this buffer.
    pub fn slice(&self, from: &Cursor, to: &Cursor) -> Result<ReadableBuffer, ChannelError> {
        if from.position() < self.start.position()
            || to.position() > self.end.position()
            || from.position() > to.position()
        {
            return Err(ChannelError::invalid_advance("slice out of range"));
        }
        Ok(ReadableBuffer::new(
            Arc::clone(&self.shared),
            from.clone(),
            to.clone(),
            self.preserved,
        ))
    }

    /// Narrows to `len` bytes starting `offset` bytes into the buffer.
    pub fn slice_at(&self, offset: usize, len: usize) -> Result<ReadableBuffer, ChannelError> {
        if offset + len > self.len() {
            return Err(ChannelError::invalid_advance("slice out of range"));
        }
        let from = self.start.seek(offset)?;
        let to = from.seek(len)?;
        self.slice(&from, &to)
    }

    /// Materializes the span into a contiguous vector.
    pub fn to_vec(&self) -> Result<Vec<u8>, ChannelError> {
        let mut out = Vec::with_capacity(self.len());
        for view in self.segments() {
            view.with_bytes(|bytes| out.extend_from_slice(bytes))?;
        }
        Ok(out)
    }

    /// Extends the span's lifetime past the producer's write frame.
    ///
    /// Every borrowed segment the span touches is promoted in place (its
    /// bytes copied once into channel-owned storage) and every touched
    /// segment's preservation count is incremented. The returned handle keeps
    /// the bytes readable until it is released.
    pub fn preserve(&self) -> Result<PreservedBuffer, ChannelError> {
        let end_position = self.end.position();
        let mut node = if self.is_empty() {
            None
        } else {
            self.start.node().cloned()
        };
        let mut touched: Vec<Arc<SegmentNode>> = Vec::new();

        while let Some(cur) = node {
            if cur.base() >= end_position {
                break;
            }
            if cur.promote(&self.shared.pool, &self.shared.metrics) == Promotion::Released {
                // Roll back the increments already taken.
                for taken in &touched {
                    taken.decref(&self.shared.pool, &self.shared.metrics);
                }
                return Err(ChannelError::UseAfterRelease);
            }
            cur.incref();
            node = cur.next();
            touched.push(cur);
        }

        self.shared.metrics.record_preserve();
        Ok(PreservedBuffer {
            shared: Arc::clone(&self.shared),
            start: self.start.clone(),
            end: self.end.clone(),
            nodes: touched,
            released: false,
        })
    }
}

impl fmt::Debug for ReadableBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableBuffer")
            .field("start", &self.start.position())
            .field("end", &self.end.position())
            .finish()
    }
}

/// Iterator over a buffer's per-segment views.
pub struct SegmentIter {
    node: Option<Arc<SegmentNode>>,
    offset: usize,
    end_position: u64,
    preserved: bool,
}

impl Iterator for SegmentIter {
    type Item = ByteView;

    fn next(&mut self) -> Option<ByteView> {
        loop {
            let node = self.node.take()?;
            let position = node.base() + self.offset as u64;
            if position >= self.end_position {
                return None;
            }
            let limit = (self.end_position - node.base()).min(node.write_end() as u64) as usize;
            let view = ByteView::new(Arc::clone(&node), self.offset, limit, self.preserved);
            self.offset = 0;
            self.node = node.next();
            if !view.is_empty() {
                return Some(view);
            }
        }
    }
}

/// A scoped handle keeping a preserved byte range alive past the producer's
/// write frame.
///
/// Release is mandatory and idempotent; it also runs on drop. After release,
/// access through [`buffer`](Self::buffer) or previously-taken views fails
/// with [`ChannelError::UseAfterRelease`]. Leaking the handle leaks the
/// preserved storage but does not corrupt the channel.
pub struct PreservedBuffer {
    shared: Arc<Shared>,
    start: Cursor,
    end: Cursor,
    nodes: Vec<Arc<SegmentNode>>,
    released: bool,
}

impl PreservedBuffer {
    /// The preserved span. Fails once the handle has been released.
    pub fn buffer(&self) -> Result<ReadableBuffer, ChannelError> {
        if self.released {
            return Err(ChannelError::UseAfterRelease);
        }
        Ok(ReadableBuffer::new(
            Arc::clone(&self.shared),
            self.start.clone(),
            self.end.clone(),
            true,
        ))
    }

    /// Number of preserved bytes.
    pub fn len(&self) -> usize {
        self.start.distance_to(&self.end) as usize
    }

    /// Returns `true` if the preserved span is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the preservation increments. Idempotent; also runs on drop.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for node in self.nodes.drain(..) {
            node.decref(&self.shared.pool, &self.shared.metrics);
        }
    }
}

impl Drop for PreservedBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PreservedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreservedBuffer")
            .field("start", &self.start.position())
            .field("end", &self.end.position())
            .field("released", &self.released)
            .finish()
    }
}
