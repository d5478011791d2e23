//! Opaque positions inside the segment chain.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::Arc;

use crate::error::ChannelError;
use crate::segment::SegmentNode;

/// An opaque position inside the buffer chain: a segment plus a byte offset
/// within it.
///
/// Cursors are obtained from [`ReadableBuffer`](crate::ReadableBuffer)
/// endpoints and moved forward with [`seek`](Self::seek). Equality is
/// structural (same segment, same offset); ordering compares stream
/// positions and is only meaningful between cursors of the same channel.
#[derive(Clone)]
pub struct Cursor {
    node: Option<Arc<SegmentNode>>,
    offset: usize,
    position: u64,
}

impl Cursor {
    pub(crate) fn at(node: Arc<SegmentNode>, offset: usize) -> Self {
        debug_assert!(offset <= node.write_end());
        let position = node.base() + offset as u64;
        Self {
            node: Some(node),
            offset,
            position,
        }
    }

    /// A position with no segment behind it: the channel origin, or the
    /// frontier of a fully-drained chain.
    pub(crate) fn detached(position: u64) -> Self {
        Self {
            node: None,
            offset: 0,
            position,
        }
    }

    /// Absolute stream offset of this position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes from `self` forward to `later`, or 0 if `later` precedes it.
    pub fn distance_to(&self, later: &Cursor) -> u64 {
        later.position.saturating_sub(self.position)
    }

    /// Returns a cursor `n` bytes forward, walking segment boundaries.
    ///
    /// Fails with `InvalidAdvance` when `n` reaches past the written end of
    /// the chain.
    pub fn seek(&self, n: usize) -> Result<Cursor, ChannelError> {
        if n == 0 {
            return Ok(self.clone());
        }

        let mut remaining = n;
        let mut node = match &self.node {
            Some(node) => Arc::clone(node),
            None => return Err(ChannelError::invalid_advance("seek past the written end")),
        };
        let mut offset = self.offset;

        loop {
            let available = node.write_end() - offset;
            if remaining <= available {
                return Ok(Cursor::at(node, offset + remaining));
            }
            remaining -= available;
            let next = node
                .next()
                .ok_or(ChannelError::invalid_advance("seek past the written end"))?;
            node = next;
            offset = 0;
        }
    }

    pub(crate) fn node(&self) -> Option<&Arc<SegmentNode>> {
        self.node.as_ref()
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && match (&self.node, &other.node) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => self.position == other.position,
                _ => false,
            }
    }
}

impl Eq for Cursor {}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.position.cmp(&other.position))
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position)
            .field("offset", &self.offset)
            .finish()
    }
}
