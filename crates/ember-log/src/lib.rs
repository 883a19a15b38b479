//! Append-only segmented in-memory log for Emberstore.
//!
//! Provides typed, timestamped, checksummed entries addressed by opaque
//! [`LogReference`]s; atomic vector append; a version high-water mark
//! ([`Log::allocate_version`] / [`Log::raise_safe_version`]); side logs
//! for staging replayed recovery data; and a cleaner that evacuates
//! sealed segments through a [`CleanupSink`] owned by the entry owner.

pub mod cleaner;
pub mod entry;
pub mod error;
pub mod log;
pub mod replica;
pub mod segment;
pub mod side;

pub use cleaner::{CleanupSink, EntryRelocator};
pub use entry::{AppendRecord, EntryKind, LogReference};
pub use error::LogError;
pub use log::{Log, LogConfig};
pub use replica::ReplicaManager;
pub use segment::{RecoveredEntry, RecoverySegment, SegmentIterator};
pub use side::SideLog;
