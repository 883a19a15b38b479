//! Process-wide operation counters.
//!
//! Writers submit deltas at operation boundaries. Segment replay in
//! particular aggregates into a local [`ReplayTally`] and merges once
//! per segment; the counters here are atomics and paying for them per
//! replayed entry would dominate replay time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Locally aggregated counts for one `replay_segment` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplayTally {
    pub entries: u64,
    pub entry_bytes: u64,
    pub objects_appended: u64,
    pub objects_discarded: u64,
    pub tombstones_appended: u64,
    pub tombstones_discarded: u64,
    pub safe_versions_recovered: u64,
    pub safe_versions_discarded: u64,
}

/// The per-process accumulator. Lives as long as the object manager.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    writes: AtomicU64,
    reads: AtomicU64,
    removes: AtomicU64,
    replay_entries: AtomicU64,
    replay_entry_bytes: AtomicU64,
    objects_appended: AtomicU64,
    objects_discarded: AtomicU64,
    tombstones_appended: AtomicU64,
    tombstones_discarded: AtomicU64,
    safe_versions_recovered: AtomicU64,
    safe_versions_discarded: AtomicU64,
}

impl StoreMetrics {
    pub(crate) fn note_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn merge_replay(&self, tally: &ReplayTally) {
        self.replay_entries.fetch_add(tally.entries, Ordering::Relaxed);
        self.replay_entry_bytes
            .fetch_add(tally.entry_bytes, Ordering::Relaxed);
        self.objects_appended
            .fetch_add(tally.objects_appended, Ordering::Relaxed);
        self.objects_discarded
            .fetch_add(tally.objects_discarded, Ordering::Relaxed);
        self.tombstones_appended
            .fetch_add(tally.tombstones_appended, Ordering::Relaxed);
        self.tombstones_discarded
            .fetch_add(tally.tombstones_discarded, Ordering::Relaxed);
        self.safe_versions_recovered
            .fetch_add(tally.safe_versions_recovered, Ordering::Relaxed);
        self.safe_versions_discarded
            .fetch_add(tally.safe_versions_discarded, Ordering::Relaxed);
    }

    /// A coherent-enough copy for reporting and assertions.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            replay_entries: self.replay_entries.load(Ordering::Relaxed),
            replay_entry_bytes: self.replay_entry_bytes.load(Ordering::Relaxed),
            objects_appended: self.objects_appended.load(Ordering::Relaxed),
            objects_discarded: self.objects_discarded.load(Ordering::Relaxed),
            tombstones_appended: self.tombstones_appended.load(Ordering::Relaxed),
            tombstones_discarded: self.tombstones_discarded.load(Ordering::Relaxed),
            safe_versions_recovered: self.safe_versions_recovered.load(Ordering::Relaxed),
            safe_versions_discarded: self.safe_versions_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value snapshot of [`StoreMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub writes: u64,
    pub reads: u64,
    pub removes: u64,
    pub replay_entries: u64,
    pub replay_entry_bytes: u64,
    pub objects_appended: u64,
    pub objects_discarded: u64,
    pub tombstones_appended: u64,
    pub tombstones_discarded: u64,
    pub safe_versions_recovered: u64,
    pub safe_versions_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_tally_merges_once() {
        let metrics = StoreMetrics::default();
        let tally = ReplayTally {
            entries: 3,
            entry_bytes: 120,
            objects_appended: 2,
            objects_discarded: 1,
            ..Default::default()
        };
        metrics.merge_replay(&tally);
        metrics.merge_replay(&tally);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.replay_entries, 6);
        assert_eq!(snapshot.replay_entry_bytes, 240);
        assert_eq!(snapshot.objects_appended, 4);
        assert_eq!(snapshot.objects_discarded, 2);
    }

    #[test]
    fn operation_counters() {
        let metrics = StoreMetrics::default();
        metrics.note_write();
        metrics.note_write();
        metrics.note_read();
        metrics.note_remove();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.writes, 2);
        assert_eq!(snapshot.reads, 1);
        assert_eq!(snapshot.removes, 1);
    }
}
