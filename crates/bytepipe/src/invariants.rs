//! Debug assertion macros for the channel's cursor and read-protocol
//! invariants.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds.

// =============================================================================
// INV-CURSOR-01: Cursor Ordering
// "consumed ≤ examined ≤ write frontier"
// =============================================================================

/// Assert the cursor ordering after every acknowledgment.
macro_rules! debug_assert_cursor_order {
    ($consumed:expr, $examined:expr, $frontier:expr) => {
        debug_assert!(
            $consumed <= $examined && $examined <= $frontier,
            "INV-CURSOR-01 violated: consumed {} / examined {} / frontier {} out of order",
            $consumed,
            $examined,
            $frontier
        )
    };
}

// =============================================================================
// INV-CURSOR-02: Consumed Monotonicity
// "the consumed cursor never moves backward across successive advances"
// =============================================================================

/// Assert that an acknowledgment did not move the consumed cursor backward.
macro_rules! debug_assert_monotonic_consumed {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-CURSOR-02 violated: consumed cursor moved backward ({} -> {})",
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-SEG-01: Promotion Before Release
// "at producer release, a segment with live preservations is already owned"
// =============================================================================

/// Assert that a still-referenced segment was promoted before the producer's
/// write frame ended.
macro_rules! debug_assert_promoted_before_release {
    ($refcount:expr, $is_owned:expr) => {
        debug_assert!(
            $refcount == 0 || $is_owned,
            "INV-SEG-01 violated: segment released with {} live preservations but not owned",
            $refcount
        )
    };
}

// =============================================================================
// INV-READ-01: Non-Empty Delivery
// "a read never resumes empty unless it reports completion or cancellation"
// =============================================================================

/// Assert that a delivered read result carries data, completion, or
/// cancellation.
macro_rules! debug_assert_nonempty_read {
    ($len:expr, $completed:expr, $cancelled:expr) => {
        debug_assert!(
            $len > 0 || $completed || $cancelled,
            "INV-READ-01 violated: empty read delivered without completion or cancellation"
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_cursor_order;
pub(crate) use debug_assert_monotonic_consumed;
pub(crate) use debug_assert_nonempty_read;
pub(crate) use debug_assert_promoted_before_release;
