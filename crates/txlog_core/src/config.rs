//! Transaction log configuration.

/// Configuration consumed by the log reader and the pruning engine.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base name of transaction log files; version `N` lives in `<base>.N`.
    pub base_name: String,

    /// Base name of checkpoint log files.
    pub checkpoint_base_name: String,

    /// Retention policy, parsed by [`crate::ThresholdConfig::parse`].
    pub retention_policy: String,

    /// Number of checkpoint files to keep when pruning.
    pub checkpoint_keep_count: usize,

    /// Maximum number of parsed segment headers to cache.
    pub header_cache_capacity: usize,

    /// Maximum number of transaction positions to cache.
    pub metadata_cache_capacity: usize,

    /// Size of the read-ahead buffer used by log readers.
    pub read_ahead_size: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_name: "transaction.log".to_string(),
            checkpoint_base_name: "checkpoint.log".to_string(),
            retention_policy: "2 days".to_string(),
            checkpoint_keep_count: 3,
            header_cache_capacity: 1_000,
            metadata_cache_capacity: 100_000,
            read_ahead_size: 64 * 1024, // 64 KB
        }
    }
}

impl LogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transaction log base name.
    #[must_use]
    pub fn base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = name.into();
        self
    }

    /// Sets the checkpoint log base name.
    #[must_use]
    pub fn checkpoint_base_name(mut self, name: impl Into<String>) -> Self {
        self.checkpoint_base_name = name.into();
        self
    }

    /// Sets the retention policy string.
    #[must_use]
    pub fn retention_policy(mut self, policy: impl Into<String>) -> Self {
        self.retention_policy = policy.into();
        self
    }

    /// Sets how many checkpoint files survive pruning.
    #[must_use]
    pub const fn checkpoint_keep_count(mut self, count: usize) -> Self {
        self.checkpoint_keep_count = count;
        self
    }

    /// Sets the header cache capacity.
    #[must_use]
    pub const fn header_cache_capacity(mut self, capacity: usize) -> Self {
        self.header_cache_capacity = capacity;
        self
    }

    /// Sets the transaction metadata cache capacity.
    #[must_use]
    pub const fn metadata_cache_capacity(mut self, capacity: usize) -> Self {
        self.metadata_cache_capacity = capacity;
        self
    }

    /// Sets the read-ahead buffer size.
    #[must_use]
    pub const fn read_ahead_size(mut self, size: usize) -> Self {
        self.read_ahead_size = size;
        self
    }
}
