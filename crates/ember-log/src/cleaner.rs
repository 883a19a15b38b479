//! The cleaning seam between the log and the object manager.
//!
//! The log owns segment lifetime; the object manager owns the meaning of
//! the entries inside them. When the cleaner evacuates a segment it must
//! ask the object manager, per live entry, whether the entry is still
//! needed and where its new home is recorded. That callback runs through
//! [`CleanupSink`], held weakly to break the log/manager ownership cycle.

use bytes::Bytes;

use crate::entry::{EntryKind, LogReference};
use crate::log::Log;

/// Callbacks the cleaner makes into the entry owner.
pub trait CleanupSink: Send + Sync {
    /// Decide whether `old` is still live and, if so, copy it through
    /// `relocator` and repoint any metadata at the new location before
    /// returning.
    fn relocate(&self, kind: EntryKind, old: &Bytes, relocator: &mut EntryRelocator<'_>);

    /// Creation timestamp embedded in the entry, or 0 for kinds that
    /// carry none. Used for age-based cleaning policy.
    fn timestamp(&self, kind: EntryKind, payload: &Bytes) -> u32;
}

/// Copies one live entry out of a segment being evacuated.
///
/// A relocator that was never asked to append marks the entry as no
/// longer wanted. A failed append (out of space) aborts the cleaning
/// pass; the cleaner retries after space is reclaimed elsewhere.
pub struct EntryRelocator<'a> {
    log: &'a Log,
    new_reference: Option<LogReference>,
    failed: bool,
}

impl<'a> EntryRelocator<'a> {
    /// A relocator that copies into `log`. The cleaner builds one per
    /// live entry; sink implementations can build their own to exercise
    /// relocation directly.
    pub fn new(log: &'a Log) -> Self {
        Self {
            log,
            new_reference: None,
            failed: false,
        }
    }

    /// Copy the entry to a fresh location. Returns false (and records
    /// the failure) if the log has no room.
    pub fn append(&mut self, kind: EntryKind, payload: &Bytes, timestamp: u32) -> bool {
        // Deep copy: the new location must have its own canonical
        // address, since the index-vs-log pointer comparison is what
        // identifies an entry as current.
        let copied = Bytes::from(payload.to_vec());
        match self.log.append(kind, timestamp, copied) {
            Ok(reference) => {
                self.new_reference = Some(reference);
                true
            }
            Err(_) => {
                self.failed = true;
                false
            }
        }
    }

    /// Where the entry now lives, if it was relocated.
    pub fn new_reference(&self) -> Option<LogReference> {
        self.new_reference
    }

    /// True if the entry was copied to a new location.
    pub fn relocated(&self) -> bool {
        self.new_reference.is_some()
    }

    /// True if an append was attempted and the log was out of space.
    pub fn failed(&self) -> bool {
        self.failed
    }
}
