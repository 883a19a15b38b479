/// Errors produced by the log subsystem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// The log has reached its segment limit. Callers should retry once
    /// the cleaner has reclaimed space.
    #[error("log is out of space")]
    OutOfSpace,

    /// A single entry exceeds what any segment can hold.
    #[error("entry of {bytes} bytes exceeds segment capacity {capacity}")]
    EntryTooLarge { bytes: usize, capacity: usize },

    /// The side log was already committed; no further appends allowed.
    #[error("side log already committed")]
    SideLogCommitted,
}

/// Convenience alias used throughout the log crate.
pub type Result<T> = std::result::Result<T, LogError>;
