//! Error types for adapter operations.

use std::io;

use bytepipe_rs::ChannelError;
use thiserror::Error;

/// Errors from driving the channel off an external byte source.
#[derive(Debug, Error)]
pub enum PumpError {
    /// The source stream failed. The failure was also forwarded into the
    /// channel as a producer fault, so the consumer observes it too.
    #[error("source failed: {0}")]
    Source(io::Error),

    /// The channel rejected a producer operation.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl PumpError {
    /// Returns `true` if the failure originated in the source rather than
    /// the channel.
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
