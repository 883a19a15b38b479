/// Protocol outcomes of object operations.
///
/// These are normal request results, not faults: a conditional write
/// that loses its race reports `WrongVersion` with the version it lost
/// to, so the caller can re-read and retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The key's tablet is not owned by this server, or is owned but
    /// not in a serving state.
    #[error("tablet is not owned by this server or not serving")]
    UnknownTablet,

    /// No live object exists under the key.
    #[error("object does not exist")]
    DoesntExist,

    /// An object exists and the caller required that none did.
    #[error("object already exists at version {current}")]
    Exists { current: u64 },

    /// The object's version failed the caller's condition.
    #[error("conditional check failed against current version {current}")]
    WrongVersion { current: u64 },

    /// The log is out of space. Transient: the cleaner reclaims space
    /// in the background; reissue the operation.
    #[error("log is out of space, retry")]
    Retry,
}
