//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use bytepipe_rs::{ByteReader, ChannelError, ReadResult};

/// A waker that does nothing; tests re-poll explicitly.
pub fn noop_waker() -> Waker {
    const VTABLE: RawWakerVTable = RawWakerVTable::new(|_| RAW, |_| {}, |_| {}, |_| {});
    const RAW: RawWaker = RawWaker::new(std::ptr::null(), &VTABLE);
    // Safety: every vtable entry is a no-op over a null pointer.
    unsafe { Waker::from_raw(RAW) }
}

/// Polls the reader once without an executor.
pub fn poll_read_once(reader: &mut ByteReader) -> Poll<Result<ReadResult, ChannelError>> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    reader.poll_read(&mut cx)
}

/// Busy-polls until the read resumes. Only for tests where another thread
/// (or prior setup) guarantees progress.
pub fn read_busy(reader: &mut ByteReader) -> Result<ReadResult, ChannelError> {
    loop {
        match poll_read_once(reader) {
            Poll::Ready(result) => return result,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}
