//! Consumer-side chunk stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytepipe_rs::{ByteReader, ChannelError};
use futures_core::Stream;
use pin_project_lite::pin_project;

pin_project! {
    /// `Stream` of owned chunks over a channel reader.
    ///
    /// Each delivered buffer is materialized and fully acknowledged before
    /// the chunk is yielded, so the stream never leaves a read outstanding.
    /// The stream ends after the producer completes; cancellation ends it
    /// after yielding whatever bytes were present. A producer fault is
    /// yielded once as the final `Err` item.
    ///
    /// This adapter copies by construction. Consumers that want the
    /// zero-copy path drive [`ByteReader`] directly.
    pub struct ChunkStream {
        reader: ByteReader,
        done: bool,
    }
}

impl ChunkStream {
    /// Wraps a channel reader.
    pub fn new(reader: ByteReader) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    /// Unwraps the underlying reader.
    pub fn into_inner(self) -> ByteReader {
        self.reader
    }
}

impl Stream for ChunkStream {
    type Item = Result<Vec<u8>, ChannelError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        let result = match this.reader.poll_read(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(err)) => {
                *this.done = true;
                return Poll::Ready(Some(Err(err)));
            }
            Poll::Ready(Ok(result)) => result,
        };

        let chunk = match result.buffer.to_vec() {
            Ok(chunk) => chunk,
            Err(err) => {
                *this.done = true;
                return Poll::Ready(Some(Err(err)));
            }
        };
        if let Err(err) = this.reader.advance(result.buffer.end()) {
            *this.done = true;
            return Poll::Ready(Some(Err(err)));
        }

        if result.is_completed || result.is_cancelled {
            *this.done = true;
        }
        if chunk.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Ready(Some(Ok(chunk)))
        }
    }
}
