/// Configuration for the channel.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Byte capacity newly allocated owned segments start with, and the
    /// minimum capacity of pooled storage (default: 4096)
    pub segment_capacity: usize,
    /// Maximum number of owned segment buffers the pool retains for reuse
    pub pool_retain: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `segment_capacity` is 0 or greater than 16 MiB (runaway
    /// promotion copies are almost certainly a bug in the caller).
    pub const fn new(segment_capacity: usize, pool_retain: usize, enable_metrics: bool) -> Self {
        assert!(
            segment_capacity > 0 && segment_capacity <= 16 * 1024 * 1024,
            "segment_capacity must be between 1 byte and 16 MiB"
        );

        Self {
            segment_capacity,
            pool_retain,
            enable_metrics,
        }
    }

    /// Sets the owned segment capacity.
    pub const fn with_segment_capacity(mut self, capacity: usize) -> Self {
        self.segment_capacity = capacity;
        self
    }

    /// Sets the pool retention limit.
    pub const fn with_pool_retain(mut self, retain: usize) -> Self {
        self.pool_retain = retain;
        self
    }

    /// Enables metrics collection.
    pub const fn with_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segment_capacity: 4096,
            pool_retain: 16,
            enable_metrics: false,
        }
    }
}

/// Low memory configuration (512-byte segments, minimal pooling)
pub const LOW_MEMORY_CONFIG: Config = Config::new(512, 2, false);

/// High throughput configuration (64 KiB segments, deep pool)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(64 * 1024, 64, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.segment_capacity, 4096);
        assert_eq!(config.pool_retain, 16);
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::default().with_segment_capacity(128).with_metrics();
        assert_eq!(config.segment_capacity, 128);
        assert!(config.enable_metrics);
    }

    #[test]
    #[should_panic(expected = "segment_capacity")]
    fn test_zero_segment_capacity_rejected() {
        let _ = Config::new(0, 4, false);
    }
}
