use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for monitoring channel behavior.
///
/// All counters are no-ops unless enabled through
/// [`Config::enable_metrics`](crate::Config).
#[derive(Debug)]
pub(crate) struct Metrics {
    enabled: bool,
    writes: AtomicU64,
    flushes: AtomicU64,
    reads: AtomicU64,
    advances: AtomicU64,
    promotions: AtomicU64,
    preserves: AtomicU64,
    segments_reused: AtomicU64,
    segments_reclaimed: AtomicU64,
}

impl Metrics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            writes: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            advances: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            preserves: AtomicU64::new(0),
            segments_reused: AtomicU64::new(0),
            segments_reclaimed: AtomicU64::new(0),
        }
    }

    #[inline]
    fn bump(&self, counter: &AtomicU64) {
        if self.enabled {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.bump(&self.writes);
    }

    #[inline]
    pub(crate) fn record_flush(&self) {
        self.bump(&self.flushes);
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.bump(&self.reads);
    }

    #[inline]
    pub(crate) fn record_advance(&self) {
        self.bump(&self.advances);
    }

    #[inline]
    pub(crate) fn record_promotion(&self) {
        self.bump(&self.promotions);
    }

    #[inline]
    pub(crate) fn record_preserve(&self) {
        self.bump(&self.preserves);
    }

    #[inline]
    pub(crate) fn record_segment_reused(&self) {
        self.bump(&self.segments_reused);
    }

    #[inline]
    pub(crate) fn record_segment_reclaimed(&self) {
        self.bump(&self.segments_reclaimed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            advances: self.advances.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            preserves: self.preserves.load(Ordering::Relaxed),
            segments_reused: self.segments_reused.load(Ordering::Relaxed),
            segments_reclaimed: self.segments_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of the channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Write frames opened by the producer.
    pub writes: u64,
    /// Flushes that published bytes to the consumer.
    pub flushes: u64,
    /// Reads delivered to the consumer.
    pub reads: u64,
    /// Acknowledgments received from the consumer.
    pub advances: u64,
    /// Borrowed segments copied into owned storage.
    pub promotions: u64,
    /// Preserve operations taken on readable buffers.
    pub preserves: u64,
    /// Owned segment allocations served from the pool.
    pub segments_reused: u64,
    /// Owned segment buffers returned to the pool.
    pub segments_reclaimed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_stay_zero() {
        let metrics = Metrics::new(false);
        metrics.record_write();
        metrics.record_read();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_enabled_metrics_count() {
        let metrics = Metrics::new(true);
        metrics.record_write();
        metrics.record_write();
        metrics.record_flush();
        let snap = metrics.snapshot();
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.flushes, 1);
        assert_eq!(snap.reads, 0);
    }
}
