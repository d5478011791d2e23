//! BytePipe - Zero-Copy SPSC Byte Channel
//!
//! A single-producer single-consumer asynchronous byte pipe built around an
//! *unowned-buffer* read protocol: the producer publishes transient regions
//! of its own memory, and the consumer reads them in place. A region is only
//! copied when something still needs it at the moment the producer takes its
//! memory back.
//!
//! # Key Features
//!
//! - Borrowed write frames: producer memory crosses the channel with zero
//!   copies on the fast path
//! - Examined/consumed cursor acknowledgment (partial consumption without
//!   re-wakes until strictly more data arrives)
//! - Preservation: one-time copy that extends a buffer range's lifetime past
//!   the producer's write frame
//! - Pooled owned-segment storage, injected at construction
//! - Single-waiter suspension over `std::task`, no runtime dependency
//! - Re-armable cancellation observed through the read result, not an error
//!
//! # Example
//!
//! ```ignore
//! use bytepipe_rs::{channel, Config};
//!
//! let (mut writer, mut reader) = channel(Config::default());
//!
//! // Producer: publish a region of its own scratch memory
//! let scratch = *b"hello world";
//! writer.write(&scratch, |frame| frame.flush())?;
//! writer.complete(None)?;
//!
//! // Consumer: read, process in place, acknowledge
//! let result = reader.read().await?;
//! result.buffer.first().unwrap().with_bytes(|bytes| {
//!     println!("got {} bytes", bytes.len());
//! })?;
//! reader.advance(result.buffer.end())?;
//! ```

mod buffer;
mod cancel;
mod channel;
mod config;
mod cursor;
mod error;
mod invariants;
mod metrics;
mod pool;
mod reader;
mod segment;
mod writer;

pub use buffer::{PreservedBuffer, ReadableBuffer, SegmentIter};
pub use cancel::CancelSignal;
pub use channel::{channel, channel_with_cancel, channel_with_pool};
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_MEMORY_CONFIG};
pub use cursor::Cursor;
pub use error::ChannelError;
pub use metrics::MetricsSnapshot;
pub use pool::SegmentPool;
pub use reader::{ByteReader, ReadFuture, ReadResult};
pub use segment::ByteView;
pub use writer::{ByteWriter, WriteFrame};
