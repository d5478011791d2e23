//! Async Source/Consumer Adapters for bytepipe-rs
//!
//! This crate connects the channel to the `futures` ecosystem on both ends:
//!
//! - [`pump`] drives the producer side from any push-style byte source (a
//!   [`futures_core::Stream`] of chunks), publishing each chunk through a
//!   write frame that is released before the next chunk is awaited, and
//!   forwarding source failures as channel faults.
//! - [`ChunkStream`] exposes the consumer side as a `Stream` of owned chunks
//!   for callers that want combinator-style consumption.
//!
//! Both adapters copy by construction (one promotion per pumped chunk, one
//! materialization per yielded chunk); zero-copy producers and consumers
//! drive [`ByteWriter`](bytepipe_rs::ByteWriter) and
//! [`ByteReader`](bytepipe_rs::ByteReader) directly.
//!
//! # Example
//!
//! ```ignore
//! use bytepipe_rs::{channel, Config};
//! use bytepipe_stream::{pump, ChunkStream, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (writer, reader) = channel(Config::default());
//!
//!     let source = futures::stream::iter(vec![
//!         Ok(b"hello ".to_vec()),
//!         Ok(b"world".to_vec()),
//!     ]);
//!     tokio::spawn(pump(source, writer));
//!
//!     let mut chunks = ChunkStream::new(reader);
//!     while let Some(chunk) = chunks.next().await {
//!         println!("got {} bytes", chunk.unwrap().len());
//!     }
//! }
//! ```

mod chunk;
mod error;
mod pump;

pub use chunk::ChunkStream;
pub use error::PumpError;
pub use pump::pump;

// Re-export useful stream combinators
pub use futures_util::StreamExt;
