//! Foundation types for Emberstore.
//!
//! This crate provides the key, record, and timestamp types shared by the
//! log, index, tablet, and object-manager crates. Every other member of
//! the workspace depends on `ember-types`.
//!
//! # Key Types
//!
//! - [`Key`] — `(table id, key bytes)` pair with a deterministic 64-bit
//!   fingerprint used for bucket and tablet placement
//! - [`ObjectRecord`] — a versioned, timestamped key-value entry
//! - [`TombstoneRecord`] — a delete marker naming the segment that held
//!   the object it obsoletes
//! - [`SafeVersionRecord`] — the version high-water mark persisted so
//!   brand-new keys never reuse a pre-crash version

pub mod error;
pub mod key;
pub mod record;
pub mod time;

pub use error::TypeError;
pub use key::Key;
pub use record::{ObjectRecord, SafeVersionRecord, TombstoneRecord};
pub use time::seconds_timestamp;
