//! Drives the producer side of a channel from a push-style byte source.

use std::io;

use bytepipe_rs::ByteWriter;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::PumpError;

/// Moves every chunk the source yields into the channel, then completes it.
///
/// Each chunk is published through one write frame that is flushed and
/// released before the next chunk is awaited, so unconsumed bytes are
/// promoted once into pooled channel-owned storage per chunk. This adapter
/// copies by construction, like [`ChunkStream`](crate::ChunkStream) on the
/// consumer side: a frame cannot be held open across an await of this
/// function's caller without risking its release never running. Producers
/// that want the in-place fast path drive
/// [`ByteWriter::write`](bytepipe_rs::ByteWriter::write) from their own
/// scope instead. A source error is forwarded to the consumer as a producer
/// fault before this function returns it.
///
/// Returns the total number of bytes published.
///
/// # Example
///
/// ```ignore
/// let (writer, reader) = channel(Config::default());
/// let source = futures::stream::iter(chunks.into_iter().map(Ok));
/// let published = pump(source, writer).await?;
/// ```
pub async fn pump<S, B>(mut source: S, mut writer: ByteWriter) -> Result<u64, PumpError>
where
    S: Stream<Item = io::Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut total = 0u64;

    while let Some(item) = source.next().await {
        match item {
            Ok(chunk) => {
                let bytes = chunk.as_ref();
                writer.write(bytes, |frame| frame.flush())?;
                total += bytes.len() as u64;
            }
            Err(err) => {
                let reason = err.to_string();
                writer.complete(Some(&reason))?;
                return Err(PumpError::Source(err));
            }
        }
    }

    writer.complete(None)?;
    Ok(total)
}
