//! Consumer handle and the read future.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::buffer::ReadableBuffer;
use crate::cancel::CancelSignal;
use crate::channel::{self, Shared};
use crate::cursor::Cursor;
use crate::error::ChannelError;
use crate::metrics::MetricsSnapshot;

/// What a completed read delivers.
#[derive(Debug)]
pub struct ReadResult {
    /// Every unacknowledged byte currently in the channel.
    pub buffer: ReadableBuffer,
    /// The producer completed and the buffer holds nothing; no further data
    /// will ever arrive.
    pub is_completed: bool,
    /// Cancellation was observed by this resumption (and consumed by it).
    pub is_cancelled: bool,
}

/// Consumer handle implementing the examined/consumed read protocol.
///
/// The protocol is strict request/acknowledge: every delivered read must be
/// acknowledged with [`advance`](Self::advance) (or
/// [`advance_to`](Self::advance_to)) before the next read starts.
///
/// # Note
///
/// `ByteReader` does NOT implement `Clone`; the channel is single-consumer.
///
/// # Example
///
/// ```ignore
/// loop {
///     let result = reader.read().await?;
///     for view in result.buffer.segments() {
///         view.with_bytes(|bytes| process(bytes))?;
///     }
///     reader.advance(result.buffer.end())?;
///     if result.is_completed || result.is_cancelled {
///         break;
///     }
/// }
/// ```
pub struct ByteReader {
    shared: Arc<Shared>,
}

impl ByteReader {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Awaits the next readable buffer.
    ///
    /// Resumes when bytes exist past the previously examined position, when
    /// the producer completes, or when cancellation fires, and not
    /// otherwise. Fails with [`ChannelError::ReadWithoutAdvance`] if the
    /// previous read was not acknowledged.
    pub fn read(&mut self) -> ReadFuture<'_> {
        ReadFuture { reader: self }
    }

    /// Poll-level read primitive; [`read`](Self::read) delegates here.
    ///
    /// Exposed so adapters can drive the protocol from their own futures and
    /// streams.
    pub fn poll_read(&mut self, cx: &mut Context<'_>) -> Poll<Result<ReadResult, ChannelError>> {
        channel::poll_read(&self.shared, cx)
    }

    /// Acknowledges the outstanding read: everything before `consumed` is
    /// committed and may be freed, and the examined position is set to the
    /// same cursor.
    pub fn advance(&mut self, consumed: Cursor) -> Result<(), ChannelError> {
        self.shared.advance_to(&consumed, &consumed)
    }

    /// Acknowledges with distinct consumed and examined cursors.
    ///
    /// Consuming little while examining far is how a consumer searching for
    /// a delimiter avoids being rewoken until strictly more data arrives.
    /// Requires `consumed ≤ examined ≤ buffer end`.
    pub fn advance_to(&mut self, consumed: Cursor, examined: Cursor) -> Result<(), ChannelError> {
        self.shared.advance_to(&consumed, &examined)
    }

    /// Tears down the consumer side. Producer operations afterwards fail
    /// with [`ChannelError::Closed`].
    pub fn complete(&mut self, error: Option<&str>) {
        self.shared.reader_complete(error);
    }

    /// A cloneable signal that cancels the current (or next) read.
    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::from_state(Arc::clone(&self.shared.cancel))
    }

    /// Published bytes not yet acknowledged.
    pub fn unread_bytes(&self) -> u64 {
        let frontier = self.shared.frontier.load(Ordering::Acquire);
        frontier - self.shared.consumed_pos.load(Ordering::Acquire)
    }

    /// Snapshot of the channel counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

/// Future returned by [`ByteReader::read`].
pub struct ReadFuture<'a> {
    reader: &'a mut ByteReader,
}

impl Future for ReadFuture<'_> {
    type Output = Result<ReadResult, ChannelError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().reader.poll_read(cx)
    }
}
