//! Error types for channel operations.

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the channel at the read, advance, or write call sites.
///
/// Cancellation is intentionally not an error: it is reported through
/// [`ReadResult::is_cancelled`](crate::ReadResult) and a consumer that wants
/// to observe it as a failure converts it at its own boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A read was started while a prior read is still unacknowledged.
    #[error("Cannot Read until the previous read has been acknowledged by calling Advance")]
    ReadWithoutAdvance,

    /// Cursor arguments out of order, past the written end, or before the
    /// channel origin.
    #[error("invalid advance: {reason}")]
    InvalidAdvance {
        /// What the cursor check rejected.
        reason: &'static str,
    },

    /// Data access through a view whose backing segment has been released.
    ///
    /// This covers views into producer-owned regions after the producer's
    /// write frame ended, views into segments already acknowledged past, and
    /// preserved buffers after their release.
    #[error("buffer accessed after its backing segment was released")]
    UseAfterRelease,

    /// The producer completed the channel with an error. Terminal: every
    /// subsequent read surfaces the same fault once buffered bytes drain.
    #[error("producer fault: {reason}")]
    ProducerFault {
        /// The reason the producer supplied to `complete`.
        reason: Arc<str>,
    },

    /// The channel has been completed by one of its sides.
    #[error("channel is closed")]
    Closed,
}

impl ChannelError {
    /// Returns `true` if this error indicates the channel is permanently
    /// unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ProducerFault { .. } | Self::Closed)
    }

    pub(crate) fn invalid_advance(reason: &'static str) -> Self {
        Self::InvalidAdvance { reason }
    }
}
