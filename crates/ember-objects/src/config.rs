use std::time::Duration;

/// Configuration for the object manager.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Number of hash-index buckets (rounded up to a power of two).
    pub hash_buckets: usize,
    /// When `true`, the log cleaner is never started. Useful for
    /// deterministic recovery benchmarks and debugging.
    pub disable_cleaner: bool,
    /// Backup service locators. Sessions to all of them are primed on
    /// the first write so a later recovery does not pay connection
    /// setup inside its timed path.
    pub backup_locators: Vec<String>,
    /// How long the tombstone sweeper sleeps when it finds nothing to do.
    pub sweeper_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hash_buckets: 1024,
            disable_cleaner: false,
            backup_locators: Vec::new(),
            sweeper_interval: Duration::from_millis(10),
        }
    }
}
