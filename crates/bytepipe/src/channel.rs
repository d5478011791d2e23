//! Channel construction and the shared producer/consumer state machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crossbeam_utils::CachePadded;

use crate::buffer::ReadableBuffer;
use crate::cancel::{CancelSignal, CancelState};
use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::ChannelError;
use crate::invariants::{
    debug_assert_cursor_order, debug_assert_monotonic_consumed, debug_assert_nonempty_read,
    debug_assert_promoted_before_release,
};
use crate::metrics::Metrics;
use crate::pool::SegmentPool;
use crate::reader::{ByteReader, ReadResult};
use crate::segment::SegmentNode;
use crate::writer::ByteWriter;

/// Creates a new channel.
///
/// Returns the producer and consumer handles. Neither handle is `Clone`:
/// the channel is strictly single-producer, single-consumer, and the
/// handles enforce that at compile time.
///
/// # Example
///
/// ```ignore
/// use bytepipe_rs::{channel, Config};
///
/// let (mut writer, mut reader) = channel(Config::default());
///
/// writer.write(b"hello", |frame| frame.flush())?;
/// writer.complete(None)?;
///
/// let result = reader.read().await?;
/// assert_eq!(result.buffer.to_vec()?, b"hello");
/// reader.advance(result.buffer.end())?;
/// ```
pub fn channel(config: Config) -> (ByteWriter, ByteReader) {
    channel_with_cancel(config, CancelSignal::new())
}

/// Creates a channel wired to an externally-created cancellation signal.
pub fn channel_with_cancel(config: Config, cancel: CancelSignal) -> (ByteWriter, ByteReader) {
    let pool = Arc::new(SegmentPool::new(config.pool_retain, config.segment_capacity));
    channel_with_pool(config, pool, cancel)
}

/// Creates a channel drawing owned segment storage from an injected pool.
///
/// The pool may be shared between channels.
pub fn channel_with_pool(
    config: Config,
    pool: Arc<SegmentPool>,
    cancel: CancelSignal,
) -> (ByteWriter, ByteReader) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            state: State::Idle,
            writing: false,
            head: None,
            tail: None,
            consumed: Cursor::detached(0),
            examined: 0,
            frontier: 0,
            writer_done: false,
            reader_done: false,
            fault: None,
            waker: None,
        }),
        pool,
        metrics: Metrics::new(config.enable_metrics),
        cancel: cancel.state(),
        frontier: CachePadded::new(AtomicU64::new(0)),
        consumed_pos: CachePadded::new(AtomicU64::new(0)),
    });

    (
        ByteWriter::new(Arc::clone(&shared)),
        ByteReader::new(shared),
    )
}

/// Read-protocol state.
///
/// Write progress is tracked orthogonally (`Inner::writing`): the producer
/// and consumer run as distinct tasks, so a write frame can be open while
/// the consumer sits in any read state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// No unread bytes beyond the examined cursor, no read pending.
    Idle,
    /// Unread bytes are available past the examined cursor.
    Readable,
    /// A read is suspended waiting for data, completion, or cancellation.
    Reading,
    /// A read was delivered and has not been acknowledged.
    WaitingForAdvance,
    /// The writer completed and every byte has been consumed.
    Completed,
    /// The writer completed with an error; terminal.
    Faulted,
}

pub(crate) struct Inner {
    state: State,
    /// A write frame is open (between `write` entry and its flush or abandon).
    writing: bool,
    head: Option<Arc<SegmentNode>>,
    tail: Option<Arc<SegmentNode>>,
    /// First byte the consumer has not committed past. Always normalized to
    /// the surviving head segment.
    consumed: Cursor,
    /// Position up to which the consumer has looked; arms the next read.
    examined: u64,
    /// Published write frontier.
    frontier: u64,
    writer_done: bool,
    reader_done: bool,
    fault: Option<Arc<str>>,
    /// The single suspended read, if any.
    waker: Option<Waker>,
}

pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    pub(crate) pool: Arc<SegmentPool>,
    pub(crate) metrics: Metrics,
    pub(crate) cancel: Arc<CancelState>,
    /// Mirror of `Inner::frontier` for lock-free introspection.
    pub(crate) frontier: CachePadded<AtomicU64>,
    /// Mirror of the acknowledged consumed position.
    pub(crate) consumed_pos: CachePadded<AtomicU64>,
}

impl Shared {
    // ---------------------------------------------------------------------
    // PRODUCER SIDE
    // ---------------------------------------------------------------------

    /// Opens a write frame over the producer's region.
    pub(crate) fn begin_write(
        &self,
        region: &[u8],
    ) -> Result<Arc<SegmentNode>, ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.writer_done || inner.reader_done {
            return Err(ChannelError::Closed);
        }
        debug_assert!(!inner.writing, "a write frame is already open");
        inner.writing = true;
        self.metrics.record_write();
        Ok(SegmentNode::borrowed(inner.frontier, region))
    }

    /// Publishes the frame's region: links it into the chain, moves the
    /// frontier, and wakes a suspended read.
    pub(crate) fn flush(&self, node: &Arc<SegmentNode>) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reader_done {
            inner.writing = false;
            return Err(ChannelError::Closed);
        }

        match inner.tail.take() {
            Some(tail) => {
                tail.set_next(Arc::clone(node));
                inner.tail = Some(Arc::clone(node));
            }
            None => {
                inner.head = Some(Arc::clone(node));
                inner.tail = Some(Arc::clone(node));
                // The consumed cursor was detached while the chain was empty;
                // rebind it to the new head.
                if inner.consumed.node().is_none() {
                    debug_assert_eq!(inner.consumed.position(), node.base());
                    inner.consumed = Cursor::at(Arc::clone(node), 0);
                }
            }
        }

        let len = node.write_end() as u64;
        inner.frontier += len;
        inner.writing = false;
        // Bytes are linked above (under the lock) before the frontier is
        // published here.
        self.frontier.store(inner.frontier, Ordering::Release);
        if len > 0 {
            if inner.state == State::Idle {
                inner.state = State::Readable;
            }
            if let Some(waker) = inner.waker.take() {
                waker.wake();
            }
        }
        self.metrics.record_flush();
        Ok(())
    }

    /// Discards a frame that was never flushed.
    pub(crate) fn abandon_write(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.writing = false;
    }

    /// The producer release point: runs when a write frame is dropped.
    ///
    /// Bytes the consumer already committed past need no copy; that is the
    /// unowned fast path. Anything still live is promoted into owned storage
    /// before the producer regains the right to touch its region.
    pub(crate) fn release_frame(&self, node: &Arc<SegmentNode>) {
        let inner = self.inner.lock().unwrap();
        if inner.consumed.position() >= node.end_position() {
            debug_assert_promoted_before_release!(node.refcount(), node.is_owned());
            if node.refcount() == 0 {
                node.release_storage(&self.pool, &self.metrics);
            }
        } else {
            node.promote(&self.pool, &self.metrics);
        }
    }

    /// Marks the producer side complete, optionally with a fault.
    pub(crate) fn writer_complete(&self, error: Option<&str>) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.writer_done || inner.reader_done {
            return Err(ChannelError::Closed);
        }
        inner.writer_done = true;
        inner.fault = error.map(Arc::from);
        if let Some(waker) = inner.waker.take() {
            waker.wake();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // CONSUMER SIDE
    // ---------------------------------------------------------------------

    /// Acknowledges the outstanding read.
    pub(crate) fn advance_to(
        &self,
        consumed: &Cursor,
        examined: &Cursor,
    ) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reader_done {
            return Err(ChannelError::Closed);
        }
        match inner.state {
            State::WaitingForAdvance | State::Completed | State::Faulted => {}
            _ => {
                return Err(ChannelError::invalid_advance(
                    "no unacknowledged read to advance",
                ))
            }
        }

        let old = inner.consumed.position();
        let consumed_pos = consumed.position();
        let examined_pos = examined.position();
        if consumed_pos < old {
            return Err(ChannelError::invalid_advance("consumed cursor moved backward"));
        }
        if examined_pos < consumed_pos {
            return Err(ChannelError::invalid_advance("examined cursor precedes consumed"));
        }
        if examined_pos > inner.frontier {
            return Err(ChannelError::invalid_advance("examined cursor past the written end"));
        }
        debug_assert_monotonic_consumed!(old, consumed_pos);

        // Chain maintenance: unlink every segment wholly before `consumed`.
        while let Some(head) = inner.head.clone() {
            if consumed_pos < head.end_position() {
                break;
            }
            let next = head.next();
            head.mark_trimmed();
            if head.refcount() == 0 {
                head.release_storage(&self.pool, &self.metrics);
            }
            inner.head = next;
        }
        if inner.head.is_none() {
            inner.tail = None;
        }

        inner.consumed = match &inner.head {
            Some(head) => {
                let offset = (consumed_pos - head.base()) as usize;
                head.set_read_start(offset);
                Cursor::at(Arc::clone(head), offset)
            }
            None => Cursor::detached(consumed_pos),
        };
        inner.examined = examined_pos;
        self.consumed_pos.store(consumed_pos, Ordering::Release);
        debug_assert_cursor_order!(consumed_pos, examined_pos, inner.frontier);

        inner.state = settle_state(&inner);
        self.metrics.record_advance();
        Ok(())
    }

    /// Tears down the consumer side and drops the chain.
    pub(crate) fn reader_complete(&self, error: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.reader_done {
            return;
        }
        inner.reader_done = true;
        if inner.fault.is_none() {
            inner.fault = error.map(Arc::from);
        }

        let mut node = inner.head.take();
        inner.tail = None;
        while let Some(cur) = node {
            cur.mark_trimmed();
            if cur.refcount() == 0 {
                cur.release_storage(&self.pool, &self.metrics);
            }
            node = cur.next();
        }
        inner.state = if inner.fault.is_some() {
            State::Faulted
        } else {
            State::Completed
        };
    }
}

/// Polls the consumer's read protocol.
///
/// Resumes exactly when new bytes exist past the examined cursor, the
/// producer completed, or cancellation is pending, and never otherwise.
pub(crate) fn poll_read(
    shared: &Arc<Shared>,
    cx: &mut Context<'_>,
) -> Poll<Result<ReadResult, ChannelError>> {
    let mut inner = shared.inner.lock().unwrap();

    if inner.reader_done {
        return Poll::Ready(Err(ChannelError::Closed));
    }
    match inner.state {
        State::WaitingForAdvance => {
            return Poll::Ready(Err(ChannelError::ReadWithoutAdvance));
        }
        State::Faulted => {
            let reason = inner.fault.clone().unwrap_or_else(|| Arc::from("unknown fault"));
            return Poll::Ready(Err(ChannelError::ProducerFault { reason }));
        }
        _ => {}
    }

    // Cancellation is consumed by exactly one resumption; the signal must be
    // re-armed to fire again.
    if shared.cancel.take() {
        return Poll::Ready(Ok(deliver(shared, &mut inner, true)));
    }

    if inner.frontier > inner.examined || inner.writer_done {
        // A fault surfaces once every already-buffered byte is consumed.
        if inner.writer_done && inner.consumed.position() == inner.frontier {
            if let Some(reason) = inner.fault.clone() {
                inner.state = State::Faulted;
                return Poll::Ready(Err(ChannelError::ProducerFault { reason }));
            }
        }
        return Poll::Ready(Ok(deliver(shared, &mut inner, false)));
    }

    inner.waker = Some(cx.waker().clone());
    shared.cancel.register(cx.waker());
    inner.state = State::Reading;
    Poll::Pending
}

/// Builds the result for a resuming read and arms the acknowledgment gate.
fn deliver(shared: &Arc<Shared>, inner: &mut Inner, cancelled: bool) -> ReadResult {
    let start = inner.consumed.clone();
    let end = match &inner.tail {
        Some(tail) => Cursor::at(Arc::clone(tail), tail.write_end()),
        None => Cursor::detached(inner.frontier),
    };
    let buffer = ReadableBuffer::new(Arc::clone(shared), start, end, false);

    let completed = inner.writer_done && buffer.is_empty() && inner.fault.is_none();
    inner.state = if completed {
        State::Completed
    } else {
        State::WaitingForAdvance
    };
    debug_assert_nonempty_read!(buffer.len(), completed, cancelled);
    shared.metrics.record_read();

    ReadResult {
        buffer,
        is_completed: completed,
        is_cancelled: cancelled,
    }
}

fn settle_state(inner: &Inner) -> State {
    let drained = inner.consumed.position() == inner.frontier;
    if inner.writer_done && drained {
        if inner.fault.is_some() {
            State::Faulted
        } else {
            State::Completed
        }
    } else if inner.frontier > inner.examined {
        State::Readable
    } else {
        State::Idle
    }
}
