//! Side logs: metadata-isolated staging for segment replay.
//!
//! Replayed entries must be dereferenceable immediately (the hash index
//! points at them while replay is still running) but must not become
//! cleaning candidates until the recovery that produced them commits.
//! A side log appends into its own segments of the shared pool and
//! flips them into the cleanable set on commit.

use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::entry::{AppendRecord, EntryKind, LogReference};
use crate::error::{LogError, Result};
use crate::log::Log;

struct SideState {
    head: Option<u64>,
    segments: Vec<u64>,
    committed: bool,
}

/// A staging handle over the shared log.
pub struct SideLog {
    log: Arc<Log>,
    inner: Mutex<SideState>,
}

impl SideLog {
    pub fn new(log: Arc<Log>) -> Self {
        Self {
            log,
            inner: Mutex::new(SideState {
                head: None,
                segments: Vec::new(),
                committed: false,
            }),
        }
    }

    /// Append into a side-owned segment.
    pub fn append(
        &self,
        kind: EntryKind,
        timestamp: u32,
        payload: impl Into<Bytes>,
    ) -> Result<LogReference> {
        let mut inner = self.inner.lock().expect("side log poisoned");
        if inner.committed {
            return Err(LogError::SideLogCommitted);
        }
        let record = AppendRecord::new(kind, timestamp, payload);
        let before = inner.head;
        let reference = self.log.append_side(&mut inner.head, &record)?;
        if inner.head != before {
            if let Some(id) = inner.head {
                inner.segments.push(id);
            }
        }
        Ok(reference)
    }

    /// Free an entry through the shared log. Replay uses this to drop
    /// the superseded entry once a newer-version replacement lands.
    pub fn free(&self, reference: LogReference) {
        self.log.free(reference);
    }

    /// Commit: the side segments join the cleanable set. Further
    /// appends fail.
    pub fn commit(&self) {
        let mut inner = self.inner.lock().expect("side log poisoned");
        if inner.committed {
            return;
        }
        inner.committed = true;
        self.log.commit_side(&inner.segments);
    }

    /// Segments staged by this side log so far.
    pub fn segments(&self) -> Vec<u64> {
        self.inner.lock().expect("side log poisoned").segments.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogConfig;
    use std::time::Duration;

    fn small_log() -> Arc<Log> {
        Log::new(LogConfig {
            segment_bytes: 64,
            max_segments: 8,
            cleaner_interval: Duration::from_millis(5),
        })
    }

    #[test]
    fn side_appends_are_dereferenceable_before_commit() {
        let log = small_log();
        let side = SideLog::new(Arc::clone(&log));
        let reference = side.append(EntryKind::Object, 1, vec![1u8; 10]).unwrap();

        let (kind, bytes) = log.get_entry(reference).unwrap();
        assert_eq!(kind, EntryKind::Object);
        assert_eq!(bytes.len(), 10);
    }

    #[test]
    fn side_segments_are_separate_from_the_head() {
        let log = small_log();
        let side = SideLog::new(Arc::clone(&log));
        let main_ref = log.append(EntryKind::Object, 1, vec![1u8; 10]).unwrap();
        let side_ref = side.append(EntryKind::Object, 1, vec![2u8; 10]).unwrap();
        assert_ne!(log.segment_of(main_ref), log.segment_of(side_ref));
    }

    #[test]
    fn append_after_commit_fails() {
        let log = small_log();
        let side = SideLog::new(Arc::clone(&log));
        side.append(EntryKind::Object, 1, vec![1u8; 10]).unwrap();
        side.commit();
        assert_eq!(
            side.append(EntryKind::Object, 2, vec![2u8; 10]),
            Err(LogError::SideLogCommitted)
        );
    }

    #[test]
    fn commit_makes_side_segments_cleanable() {
        use crate::cleaner::{CleanupSink, EntryRelocator};
        use std::sync::Weak;

        struct DropAllSink;
        impl CleanupSink for DropAllSink {
            fn relocate(
                &self,
                _kind: EntryKind,
                _old: &Bytes,
                _relocator: &mut EntryRelocator<'_>,
            ) {
            }
            fn timestamp(&self, _kind: EntryKind, _payload: &Bytes) -> u32 {
                0
            }
        }

        let log = small_log();
        let sink = Arc::new(DropAllSink);
        log.register_cleanup_sink(Arc::downgrade(&sink) as Weak<dyn CleanupSink>);

        let side = SideLog::new(Arc::clone(&log));
        let a = side.append(EntryKind::Object, 1, vec![1u8; 20]).unwrap();
        side.append(EntryKind::Object, 1, vec![2u8; 20]).unwrap();
        side.free(a);
        let staged = log.segment_of(a);

        // Uncommitted side segments are never cleaning candidates.
        assert!(!log.clean_once());
        assert!(log.segment_exists(staged));

        side.commit();
        assert!(log.clean_once());
        assert!(!log.segment_exists(staged));
    }
}
