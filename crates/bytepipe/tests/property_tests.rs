//! Property-based tests for the byte-stream identity and the cursor
//! protocol.
//!
//! Coverage:
//! - Concatenating the bytes consumed across all reads equals the
//!   concatenation of all producer writes, for arbitrary chunkings and
//!   arbitrary consume step sizes.
//! - Cursor-order violations are always rejected.

mod common;

use bytepipe_rs::{channel, ChannelError, Config};
use common::read_busy;
use proptest::prelude::*;

proptest! {
    /// Any interleaving of writes and partial consumes moves every byte
    /// through the channel exactly once, in order.
    #[test]
    fn prop_consumed_bytes_equal_written_bytes(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16),
        consume_steps in prop::collection::vec(1usize..64, 1..32),
    ) {
        let (mut writer, mut reader) = channel(Config::default());

        let mut expected = Vec::new();
        for chunk in &chunks {
            writer.write_through(chunk).unwrap();
            expected.extend_from_slice(chunk);
        }
        writer.complete(None).unwrap();

        let mut out = Vec::new();
        let mut steps = consume_steps.iter().cycle();
        loop {
            let result = read_busy(&mut reader).unwrap();
            if result.is_completed {
                prop_assert!(result.buffer.is_empty());
                break;
            }
            prop_assert!(!result.buffer.is_empty());
            let take = (*steps.next().unwrap()).min(result.buffer.len());
            let taken = result.buffer.slice_at(0, take).unwrap();
            out.extend_from_slice(&taken.to_vec().unwrap());
            let consumed = result.buffer.start().seek(take).unwrap();
            reader.advance(consumed).unwrap();
        }

        prop_assert_eq!(out, expected);
    }

    /// Write-read-acknowledge cycles round-trip every chunk unchanged.
    #[test]
    fn prop_interleaved_roundtrip(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..12),
    ) {
        let (mut writer, mut reader) = channel(Config::default());

        let mut expected = Vec::new();
        let mut out = Vec::new();
        for chunk in &chunks {
            writer.write_through(chunk).unwrap();
            expected.extend_from_slice(chunk);

            let result = read_busy(&mut reader).unwrap();
            out.extend_from_slice(&result.buffer.to_vec().unwrap());
            reader.advance(result.buffer.end()).unwrap();
        }

        prop_assert_eq!(out, expected);
    }

    /// An examined cursor strictly before the consumed cursor is always an
    /// invalid acknowledgment.
    #[test]
    fn prop_examined_before_consumed_rejected(
        len in 2usize..32,
        split in 0usize..64,
    ) {
        let (mut writer, mut reader) = channel(Config::default());
        let data = vec![0x5A; len];
        writer.write_through(&data).unwrap();

        let result = read_busy(&mut reader).unwrap();
        let split = split % (len - 1);
        let consumed = result.buffer.start().seek(split + 1).unwrap();
        let examined = result.buffer.start().seek(split).unwrap();

        let rejected = matches!(
            reader.advance_to(consumed, examined),
            Err(ChannelError::InvalidAdvance { .. })
        );
        prop_assert!(rejected);

        // The channel is still usable after the rejection.
        reader.advance(result.buffer.end()).unwrap();
    }

    /// The consumed cursor can never move backward, whatever cursors the
    /// consumer saved from earlier reads.
    #[test]
    fn prop_consumed_cursor_monotonic(
        first in 1usize..16,
        second in 1usize..16,
    ) {
        let (mut writer, mut reader) = channel(Config::default());
        writer.write_through(&vec![1u8; first]).unwrap();

        let result = read_busy(&mut reader).unwrap();
        let stale = result.buffer.start();
        reader.advance(result.buffer.end()).unwrap();

        writer.write_through(&vec![2u8; second]).unwrap();
        let result = read_busy(&mut reader).unwrap();
        let rejected = matches!(
            reader.advance(stale),
            Err(ChannelError::InvalidAdvance { .. })
        );
        prop_assert!(rejected);
        reader.advance(result.buffer.end()).unwrap();
    }
}
