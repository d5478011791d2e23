//! Cancellation signaling for the consumer side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Waker;

/// Shared cancellation state between signal handles and the channel.
#[derive(Debug)]
pub(crate) struct CancelState {
    /// Set by `cancel()`, consumed by the read that observes it.
    armed: AtomicBool,
    /// Waker of a suspended read, woken when cancellation fires.
    waker: Mutex<Option<Waker>>,
}

impl CancelState {
    pub(crate) fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            waker: Mutex::new(None),
        }
    }

    /// Arms cancellation and wakes a suspended read if there is one.
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::Release);
        if let Some(waker) = self.waker.lock().unwrap().take() {
            waker.wake();
        }
    }

    /// Consumes a pending arm. Returns `true` at most once per `arm()`.
    #[inline]
    pub(crate) fn take(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn register(&self, waker: &Waker) {
        *self.waker.lock().unwrap() = Some(waker.clone());
    }
}

/// A cloneable handle that cancels the next (or current) read.
///
/// One signal is created implicitly by [`channel`](crate::channel) and is
/// retrievable from the reader; alternatively an externally-created signal
/// can be injected with [`channel_with_cancel`](crate::channel_with_cancel)
/// so that cancellation can be triggered from anywhere in the application.
///
/// Cancellation is level-consumed: `cancel()` arms the signal, exactly one
/// read resumes with `is_cancelled = true`, and the arm is spent. Calling
/// `cancel()` again re-arms it.
///
/// # Example
///
/// ```ignore
/// let (writer, mut reader) = channel(Config::default());
/// let signal = reader.cancel_signal();
///
/// // Trigger cancellation from another task or thread
/// std::thread::spawn(move || signal.cancel());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    state: Arc<CancelState>,
}

impl CancelSignal {
    /// Creates a signal not yet attached to any channel.
    pub fn new() -> Self {
        Self {
            state: Arc::new(CancelState::new()),
        }
    }

    /// Arms cancellation. The current (or next) read resumes exactly once
    /// with `is_cancelled = true`.
    pub fn cancel(&self) {
        self.state.arm();
    }

    /// Returns `true` if cancellation is armed and not yet observed.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_armed()
    }

    pub(crate) fn from_state(state: Arc<CancelState>) -> Self {
        Self { state }
    }

    pub(crate) fn state(&self) -> Arc<CancelState> {
        Arc::clone(&self.state)
    }
}

impl Default for CancelState {
    fn default() -> Self {
        Self::new()
    }
}
