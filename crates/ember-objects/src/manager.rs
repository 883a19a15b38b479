//! The object manager: ties the log, the hash index, and the tablet
//! table together into linearizable single-key operations, and rebuilds
//! live state from replayed segments during recovery and migration.
//!
//! Concurrency discipline: every operation that reads or mutates an
//! index binding holds that key's bucket lock for the whole critical
//! section, including the log append that installs the new reference.
//! At most one bucket lock is ever held at a time; the log's internal
//! lock nests inside it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;
use tracing::{debug, warn};

use ember_index::{BucketGuard, HashIndex};
use ember_log::{
    AppendRecord, CleanupSink, EntryKind, EntryRelocator, Log, LogReference, RecoveredEntry,
    SegmentIterator, SideLog,
};
use ember_tablet::{TabletState, TabletTable};
use ember_types::{seconds_timestamp, Key, ObjectRecord, SafeVersionRecord, TombstoneRecord};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::metrics::{ReplayTally, StoreMetrics};
use crate::reject::RejectRules;
use crate::sweeper::{spawn_sweeper, SweeperHandle};

/// Pump the replica manager after this many replayed bytes so backup
/// pipelines keep flowing during long replays.
const REPLICA_TICK_BYTES: usize = 50_000;

/// The resolved state of a key's index binding: the entry it points to,
/// dereferenced and decoded far enough to know its kind and version.
struct Binding {
    kind: EntryKind,
    payload: Bytes,
    version: u64,
    reference: LogReference,
}

/// Bumps the replay-return counter on every exit path of
/// `replay_segment`; the tombstone sweeper compares this counter across
/// passes to detect quiescence.
struct ReturnCounter<'a>(&'a AtomicU64);

impl Drop for ReturnCounter<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// The object manager.
pub struct ObjectManager {
    config: StoreConfig,
    log: Arc<Log>,
    index: HashIndex,
    tablets: Arc<TabletTable>,
    metrics: StoreMetrics,
    any_writes: AtomicBool,
    replay_returns: AtomicU64,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl ObjectManager {
    pub fn new(config: StoreConfig, log: Arc<Log>, tablets: Arc<TabletTable>) -> Arc<Self> {
        let index = HashIndex::new(config.hash_buckets);
        Arc::new(Self {
            config,
            log,
            index,
            tablets,
            metrics: StoreMetrics::default(),
            any_writes: AtomicBool::new(false),
            replay_returns: AtomicU64::new(0),
            sweeper: Mutex::new(None),
        })
    }

    /// Start background machinery: the backup failure monitor, the log
    /// cleaner (unless disabled by configuration), and the tombstone
    /// sweeper. Idempotent.
    pub fn start(self: &Arc<Self>) {
        self.log.replica().start_failure_monitor();
        self.log
            .register_cleanup_sink(Arc::downgrade(self) as Weak<dyn CleanupSink>);
        if !self.config.disable_cleaner {
            self.log.enable_cleaner();
        }
        let mut sweeper = self.sweeper.lock().expect("sweeper slot poisoned");
        if sweeper.is_none() {
            *sweeper = Some(spawn_sweeper(self, self.config.sweeper_interval));
        }
    }

    /// Stop background machinery and wait for it. Idempotent.
    pub fn stop(&self) {
        self.log.replica().halt_failure_monitor();
        self.log.halt_cleaner();
        if let Some(mut handle) = self.sweeper.lock().expect("sweeper slot poisoned").take() {
            handle.stop();
        }
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    pub fn log(&self) -> &Arc<Log> {
        &self.log
    }

    pub fn tablets(&self) -> &Arc<TabletTable> {
        &self.tablets
    }

    /// Number of completed `replay_segment` calls, counting every exit
    /// path. The tombstone sweeper keys its quiescence check off this.
    pub fn replay_returns(&self) -> u64 {
        self.replay_returns.load(Ordering::SeqCst)
    }

    pub(crate) fn num_index_buckets(&self) -> usize {
        self.index.num_buckets()
    }

    /// Passive probe of a key's binding kind, for assertions that must
    /// not disturb the index.
    #[cfg(test)]
    pub(crate) fn binding_kind(&self, key: &Key) -> Option<EntryKind> {
        let mut bucket = self.index.lock_bucket(key.fingerprint());
        self.lookup_binding(&mut bucket, key).map(|b| b.kind)
    }

    // =================================================================
    // Single-key operations
    // =================================================================

    /// Write an object, replacing any previous one under the key.
    ///
    /// On success returns the new version, strictly greater than every
    /// version previously committed for this key. The write is not
    /// durable until [`sync`](Self::sync); callers batch writes and
    /// sync once.
    ///
    /// If the write replaces an existing object, the new object and the
    /// tombstone over the old one are appended as a single atomic batch:
    /// a backup never sees an uncovered rewrite.
    pub fn write(
        &self,
        key: &Key,
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<u64, StoreError> {
        self.warm_up_on_first_write();

        let mut bucket = self.index.lock_bucket(key.fingerprint());

        match self.tablets.tablet_for(key) {
            Some(tablet) if tablet.state == TabletState::Normal => {}
            _ => return Err(StoreError::UnknownTablet),
        }

        let mut current = self.lookup_binding(&mut bucket, key);
        if let Some(binding) = &current {
            if binding.kind == EntryKind::Tombstone {
                // A leftover from replay; the tablet is serving, so the
                // tombstone has done its job. Drop the binding (the
                // cleaner reclaims the entry) and treat the key as new.
                self.remove_binding(&mut bucket, key);
                current = None;
            }
        }
        let current_version = current.as_ref().map(|b| b.version);

        if let Some(rules) = rules {
            rules.check(current_version)?;
        }

        // Existing keys advance their own version chain; brand-new keys
        // draw from the log so they always clear the safe-version mark.
        let new_version = match current_version {
            Some(version) => version + 1,
            None => self.log.allocate_version(),
        };
        let timestamp = seconds_timestamp();
        let object = ObjectRecord::new(key, value, new_version, timestamp);
        let object_payload =
            Bytes::from(object.encode().expect("object record encodes"));

        let mut records = Vec::with_capacity(2);
        records.push(AppendRecord::new(
            EntryKind::Object,
            timestamp,
            object_payload,
        ));
        if let Some(binding) = &current {
            let prior = ObjectRecord::decode(&binding.payload)
                .expect("indexed object entry decodes");
            let tombstone = TombstoneRecord::for_object(
                &prior,
                self.log.segment_of(binding.reference),
                timestamp,
            );
            records.push(AppendRecord::new(
                EntryKind::Tombstone,
                timestamp,
                Bytes::from(tombstone.encode().expect("tombstone record encodes")),
            ));
        }

        let references = self
            .log
            .append_batch(&records)
            .map_err(|_| StoreError::Retry)?;

        self.replace_binding(&mut bucket, key, references[0]);
        if let Some(binding) = &current {
            // The tombstone keeps the old object covered on backups
            // until cleaning; the primary copy is garbage now.
            self.log.free(binding.reference);
        }

        self.tablets.increment_write_count(key);
        self.metrics.note_write();
        Ok(new_version)
    }

    /// Read the object under a key.
    pub fn read(
        &self,
        key: &Key,
        rules: Option<&RejectRules>,
    ) -> Result<(Vec<u8>, u64), StoreError> {
        let mut bucket = self.index.lock_bucket(key.fingerprint());

        match self.tablets.tablet_for(key) {
            Some(tablet) if tablet.state == TabletState::Normal => {}
            _ => return Err(StoreError::UnknownTablet),
        }

        let binding = self
            .lookup_binding(&mut bucket, key)
            .filter(|b| b.kind == EntryKind::Object)
            .ok_or(StoreError::DoesntExist)?;

        if let Some(rules) = rules {
            rules.check(Some(binding.version))?;
        }

        let object =
            ObjectRecord::decode(&binding.payload).expect("indexed object entry decodes");
        self.tablets.increment_read_count(key);
        self.metrics.note_read();
        Ok((object.value, binding.version))
    }

    /// Remove the object under a key.
    ///
    /// Unlike `write`, remove is a durability barrier: the tombstone is
    /// synced to backups before this returns, and the safe-version mark
    /// is raised past the removed version so the key's version chain can
    /// never run backwards, even if the key is next written after a
    /// crash that loses this server's memory.
    ///
    /// Removing an absent key is not an error unless reject rules make
    /// it one; the returned version is `None` in that case.
    pub fn remove(
        &self,
        key: &Key,
        rules: Option<&RejectRules>,
    ) -> Result<Option<u64>, StoreError> {
        let mut bucket = self.index.lock_bucket(key.fingerprint());

        match self.tablets.tablet_for(key) {
            Some(tablet) if tablet.state == TabletState::Normal => {}
            _ => return Err(StoreError::UnknownTablet),
        }

        let binding = self
            .lookup_binding(&mut bucket, key)
            .filter(|b| b.kind == EntryKind::Object);
        let Some(binding) = binding else {
            if let Some(rules) = rules {
                rules.check(None)?;
            }
            return Ok(None);
        };

        if let Some(rules) = rules {
            rules.check(Some(binding.version))?;
        }

        let object =
            ObjectRecord::decode(&binding.payload).expect("indexed object entry decodes");
        let timestamp = seconds_timestamp();
        let tombstone =
            TombstoneRecord::for_object(&object, self.log.segment_of(binding.reference), timestamp);

        self.log
            .append(
                EntryKind::Tombstone,
                timestamp,
                tombstone.encode().expect("tombstone record encodes"),
            )
            .map_err(|_| StoreError::Retry)?;
        self.log.sync();

        self.log.raise_safe_version(object.version + 1);
        self.log.free(binding.reference);
        self.remove_binding(&mut bucket, key);
        self.metrics.note_remove();
        Ok(Some(object.version))
    }

    /// Durability barrier for previously issued writes.
    pub fn sync(&self) {
        self.log.sync();
    }

    // =================================================================
    // Segment replay
    // =================================================================

    /// Replay a recovery segment into `side_log`, reconciling each entry
    /// against the index so the highest version wins regardless of the
    /// order segments arrive in.
    ///
    /// The tablets covered by the segment must already be in the
    /// `Recovering` state; tombstones are transiently indexed during
    /// replay and purged once the covering tablet leaves that state.
    pub fn replay_segment(
        &self,
        side_log: &SideLog,
        mut it: SegmentIterator<'_>,
    ) -> Result<(), StoreError> {
        let _returns = ReturnCounter(&self.replay_returns);
        let mut tally = ReplayTally::default();
        let mut bytes_since_tick = 0usize;

        while !it.is_done() {
            // Warm the next entry's bucket while working on this one.
            if let Some(next) = it.peek_next() {
                if let Some(fingerprint) = recovered_fingerprint(next) {
                    self.index.prefetch_bucket(fingerprint);
                }
            }

            let Some(entry) = it.current() else { break };

            if bytes_since_tick > REPLICA_TICK_BYTES {
                bytes_since_tick = 0;
                self.log.replica().proceed();
            }
            bytes_since_tick += entry.len();

            tally.entries += 1;
            tally.entry_bytes += entry.len() as u64;

            match entry.kind {
                EntryKind::Object => self.replay_object(side_log, entry, &mut tally)?,
                EntryKind::Tombstone => self.replay_tombstone(side_log, entry, &mut tally)?,
                EntryKind::SafeVersion => {
                    self.replay_safe_version(side_log, entry, &mut tally)?
                }
            }

            it.advance();
        }

        self.metrics.merge_replay(&tally);
        Ok(())
    }

    fn replay_object(
        &self,
        side_log: &SideLog,
        entry: &RecoveredEntry,
        tally: &mut ReplayTally,
    ) -> Result<(), StoreError> {
        let Ok(record) = ObjectRecord::decode(&entry.payload) else {
            warn!("undecodable object entry in recovery segment, discarding");
            tally.objects_discarded += 1;
            return Ok(());
        };
        if !entry.verify_checksum() {
            warn!(key = %record.key(), version = record.version,
                "bad object checksum during replay");
        }

        let key = record.key();
        let mut bucket = self.index.lock_bucket(key.fingerprint());

        let current = self.lookup_binding(&mut bucket, &key);
        // Whatever is installed, an incoming object must beat it: one
        // past the installed object's version, or one past the deletion
        // a tombstone records.
        let min_successor = current.as_ref().map(|b| b.version + 1).unwrap_or(0);

        if record.version < min_successor {
            tally.objects_discarded += 1;
            return Ok(());
        }

        let new_reference = side_log
            .append(EntryKind::Object, entry.timestamp, entry.payload.clone())
            .map_err(|_| StoreError::Retry)?;
        self.replace_binding(&mut bucket, &key, new_reference);
        tally.objects_appended += 1;

        if let Some(binding) = current {
            if binding.kind == EntryKind::Object {
                side_log.free(binding.reference);
            }
        }
        Ok(())
    }

    fn replay_tombstone(
        &self,
        side_log: &SideLog,
        entry: &RecoveredEntry,
        tally: &mut ReplayTally,
    ) -> Result<(), StoreError> {
        let Ok(record) = TombstoneRecord::decode(&entry.payload) else {
            warn!("undecodable tombstone entry in recovery segment, discarding");
            tally.tombstones_discarded += 1;
            return Ok(());
        };
        if !entry.verify_checksum() {
            warn!(key = %record.key(), version = record.object_version,
                "bad tombstone checksum during replay");
        }

        let key = record.key();
        let mut bucket = self.index.lock_bucket(key.fingerprint());

        let current = self.lookup_binding(&mut bucket, &key);
        // Asymmetric on purpose: a tombstone at the same version as the
        // installed object is that object's delete marker and must win,
        // while one tombstone only supersedes another at a strictly
        // higher version.
        let min_successor = match &current {
            None => 0,
            Some(binding) if binding.kind == EntryKind::Tombstone => binding.version + 1,
            Some(binding) => binding.version,
        };

        if record.object_version < min_successor {
            tally.tombstones_discarded += 1;
            return Ok(());
        }

        let new_reference = side_log
            .append(EntryKind::Tombstone, entry.timestamp, entry.payload.clone())
            .map_err(|_| StoreError::Retry)?;
        self.replace_binding(&mut bucket, &key, new_reference);
        tally.tombstones_appended += 1;

        if let Some(binding) = current {
            if binding.kind == EntryKind::Object {
                side_log.free(binding.reference);
            }
        }
        Ok(())
    }

    fn replay_safe_version(
        &self,
        side_log: &SideLog,
        entry: &RecoveredEntry,
        tally: &mut ReplayTally,
    ) -> Result<(), StoreError> {
        let Ok(record) = SafeVersionRecord::decode(&entry.payload) else {
            warn!("undecodable safe-version entry in recovery segment, discarding");
            tally.safe_versions_discarded += 1;
            return Ok(());
        };
        if !entry.verify_checksum() {
            warn!(safe_version = record.safe_version,
                "bad safe-version checksum during replay");
        }

        // Copied forward unconditionally: every partition of the failed
        // master's log carries one, and a crashed recovery may replay
        // the same data again.
        side_log
            .append(EntryKind::SafeVersion, entry.timestamp, entry.payload.clone())
            .map_err(|_| StoreError::Retry)?;

        if self.log.raise_safe_version(record.safe_version) {
            tally.safe_versions_recovered += 1;
            debug!(safe_version = record.safe_version, "safe version recovered");
        } else {
            tally.safe_versions_discarded += 1;
            debug!(safe_version = record.safe_version, "safe version discarded");
        }
        Ok(())
    }

    // =================================================================
    // Scanners
    // =================================================================

    /// Erase and free every object binding whose key belongs to no
    /// tablet owned by this server. Run after an aborted recovery to
    /// collect half-installed state.
    pub fn remove_orphaned_objects(&self) {
        for bucket_index in 0..self.index.num_buckets() {
            let mut bucket = self.index.lock_bucket_at(bucket_index);
            let mut candidates = bucket.candidates();
            while !candidates.is_done() {
                let reference = LogReference::from_raw(candidates.reference());
                let orphaned = match self.log.get_entry(reference) {
                    Some((EntryKind::Object, payload)) => {
                        let record = ObjectRecord::decode(&payload)
                            .expect("indexed object entry decodes");
                        self.tablets.tablet_for(&record.key()).is_none()
                    }
                    _ => false,
                };
                if orphaned {
                    debug!(reference = reference.to_raw(), "removing orphaned object");
                    candidates.remove();
                    self.log.free(reference);
                } else {
                    candidates.advance();
                }
            }
        }
    }

    /// Synchronously purge every stale replay tombstone from the index,
    /// returning how many bindings were dropped. The background sweeper
    /// does the same work incrementally; this is for callers that need
    /// the index clean before proceeding.
    pub fn remove_tombstones(&self) -> usize {
        (0..self.index.num_buckets())
            .map(|bucket_index| self.sweep_bucket(bucket_index))
            .sum()
    }

    /// Purge stale replay tombstones from one bucket. A tombstone
    /// binding is stale once its tablet is gone or has left the
    /// `Recovering` state: no further replay can arrive for it, so it
    /// has nothing left to suppress.
    ///
    /// The underlying log entries are not freed here; the cleaner
    /// retires them once the segments they name stop existing.
    pub(crate) fn sweep_bucket(&self, bucket_index: usize) -> usize {
        let mut purged = 0;
        let mut bucket = self.index.lock_bucket_at(bucket_index);
        let mut candidates = bucket.candidates();
        while !candidates.is_done() {
            let reference = LogReference::from_raw(candidates.reference());
            let stale = match self.log.get_entry(reference) {
                Some((EntryKind::Tombstone, payload)) => {
                    let record = TombstoneRecord::decode(&payload)
                        .expect("indexed tombstone entry decodes");
                    match self.tablets.tablet_for(&record.key()) {
                        None => true,
                        Some(tablet) => tablet.state != TabletState::Recovering,
                    }
                }
                _ => false,
            };
            if stale {
                candidates.remove();
                purged += 1;
            } else {
                candidates.advance();
            }
        }
        purged
    }

    // =================================================================
    // Index primitives (bucket lock held via the guard)
    // =================================================================

    /// Find the binding for `key`, dereferencing each candidate in the
    /// bucket through the log to compare stored keys. During replay the
    /// result may be a tombstone; in steady state it is always an
    /// object.
    fn lookup_binding(&self, bucket: &mut BucketGuard<'_>, key: &Key) -> Option<Binding> {
        let mut candidates = bucket.candidates();
        while !candidates.is_done() {
            let reference = LogReference::from_raw(candidates.reference());
            if let Some((kind, payload)) = self.log.get_entry(reference) {
                if let Some((candidate_key, version)) = binding_key_and_version(kind, &payload) {
                    if candidate_key == *key {
                        return Some(Binding {
                            kind,
                            payload,
                            version,
                            reference,
                        });
                    }
                }
            }
            candidates.advance();
        }
        None
    }

    /// Point `key`'s binding at `new_reference`, rewriting the existing
    /// candidate in place or inserting a fresh one. Returns whether a
    /// candidate already existed. Never frees log storage.
    fn replace_binding(
        &self,
        bucket: &mut BucketGuard<'_>,
        key: &Key,
        new_reference: LogReference,
    ) -> bool {
        let mut candidates = bucket.candidates();
        while !candidates.is_done() {
            let reference = LogReference::from_raw(candidates.reference());
            if let Some((kind, payload)) = self.log.get_entry(reference) {
                if let Some((candidate_key, _)) = binding_key_and_version(kind, &payload) {
                    if candidate_key == *key {
                        candidates.set_reference(new_reference.to_raw());
                        return true;
                    }
                }
            }
            candidates.advance();
        }
        bucket.insert(new_reference.to_raw());
        false
    }

    /// Erase `key`'s binding. Returns whether one was found. Never
    /// frees log storage.
    fn remove_binding(&self, bucket: &mut BucketGuard<'_>, key: &Key) -> bool {
        let mut candidates = bucket.candidates();
        while !candidates.is_done() {
            let reference = LogReference::from_raw(candidates.reference());
            if let Some((kind, payload)) = self.log.get_entry(reference) {
                if let Some((candidate_key, _)) = binding_key_and_version(kind, &payload) {
                    if candidate_key == *key {
                        candidates.remove();
                        return true;
                    }
                }
            }
            candidates.advance();
        }
        false
    }

    // =================================================================
    // Cleaner callbacks
    // =================================================================

    fn relocate_object(&self, old: &Bytes, relocator: &mut EntryRelocator<'_>) {
        let record = ObjectRecord::decode(old).expect("cleaned object entry decodes");
        let key = record.key();
        let mut bucket = self.index.lock_bucket(key.fingerprint());

        if self.tablets.tablet_for(&key).is_none() {
            // The tablet left this server; the object is garbage no
            // matter what the index says.
            self.remove_binding(&mut bucket, &key);
            return;
        }

        if let Some(current) = self.lookup_binding(&mut bucket, &key) {
            // Identity by address: any replace since cleaning began
            // produced a different stored allocation.
            let still_this_entry = current.kind == EntryKind::Object
                && current.payload.as_ptr() == old.as_ptr();
            if still_this_entry {
                if !relocator.append(EntryKind::Object, old, record.timestamp) {
                    // Out of space; the cleaner retries this segment.
                    return;
                }
                let new_reference = relocator
                    .new_reference()
                    .expect("successful relocation has a reference");
                self.replace_binding(&mut bucket, &key, new_reference);
            }
        }
    }

    fn relocate_tombstone(&self, old: &Bytes, relocator: &mut EntryRelocator<'_>) {
        let record = TombstoneRecord::decode(old).expect("cleaned tombstone entry decodes");

        // A tombstone is live exactly as long as the segment holding the
        // object it deletes still exists. Not indexed in steady state,
        // so no binding update either way.
        if self.log.segment_exists(record.segment_id) {
            let _ = relocator.append(EntryKind::Tombstone, old, record.timestamp);
        }
    }

    // =================================================================
    // Lifecycle details
    // =================================================================

    /// The first write primes sessions to every configured backup so
    /// connection setup never lands inside a later recovery's timed
    /// path.
    fn warm_up_on_first_write(&self) {
        if self.any_writes.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.config.backup_locators.is_empty() {
            self.log.replica().prime_sessions(&self.config.backup_locators);
        }
    }
}

impl CleanupSink for ObjectManager {
    fn relocate(&self, kind: EntryKind, old: &Bytes, relocator: &mut EntryRelocator<'_>) {
        match kind {
            EntryKind::Object => self.relocate_object(old, relocator),
            EntryKind::Tombstone => self.relocate_tombstone(old, relocator),
            // The high-water mark is always live; carry it forward.
            EntryKind::SafeVersion => {
                let _ = relocator.append(EntryKind::SafeVersion, old, 0);
            }
        }
    }

    fn timestamp(&self, kind: EntryKind, payload: &Bytes) -> u32 {
        match kind {
            EntryKind::Object => ObjectRecord::decode(payload)
                .map(|r| r.timestamp)
                .unwrap_or(0),
            EntryKind::Tombstone => TombstoneRecord::decode(payload)
                .map(|r| r.timestamp)
                .unwrap_or(0),
            EntryKind::SafeVersion => 0,
        }
    }
}

impl Drop for ObjectManager {
    fn drop(&mut self) {
        // Signal without joining: the last Arc may be dropped by the
        // sweeper thread itself, and a thread cannot join itself. The
        // sweeper holds only a Weak and exits on its next poll.
        if let Some(handle) = self.sweeper.lock().expect("sweeper slot poisoned").take() {
            handle.signal();
        }
    }
}

/// Decode just enough of an indexed entry to learn its key and version.
/// Safe-version entries carry neither and are never indexed.
fn binding_key_and_version(kind: EntryKind, payload: &Bytes) -> Option<(Key, u64)> {
    match kind {
        EntryKind::Object => {
            let record = ObjectRecord::decode(payload).expect("indexed object entry decodes");
            Some((record.key(), record.version))
        }
        EntryKind::Tombstone => {
            let record =
                TombstoneRecord::decode(payload).expect("indexed tombstone entry decodes");
            Some((record.key(), record.object_version))
        }
        EntryKind::SafeVersion => None,
    }
}

/// Fingerprint of the key embedded in a recovered entry, for bucket
/// prefetching. Entries without keys (or that fail to decode) are
/// skipped.
fn recovered_fingerprint(entry: &RecoveredEntry) -> Option<u64> {
    match entry.kind {
        EntryKind::Object => ObjectRecord::decode(&entry.payload)
            .ok()
            .map(|r| r.key().fingerprint()),
        EntryKind::Tombstone => TombstoneRecord::decode(&entry.payload)
            .ok()
            .map(|r| r.key().fingerprint()),
        EntryKind::SafeVersion => None,
    }
}
