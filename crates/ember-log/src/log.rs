//! The append-only, segmented, in-memory log.
//!
//! Entries are typed, timestamped, and checksummed. Storage is a pool of
//! fixed-capacity segments: appends go to an open head segment, which is
//! sealed and replaced when it fills. Sealed segments are candidates for
//! cleaning; a fully evacuated segment is reclaimed and its id stops
//! existing, which is exactly the signal tombstone retirement keys off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::cleaner::{CleanupSink, EntryRelocator};
use crate::entry::{AppendRecord, EntryKind, LogReference};
use crate::error::{LogError, Result};
use crate::replica::ReplicaManager;
use crate::segment::Segment;

/// Configuration for the log.
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Payload capacity of one segment, in bytes.
    pub segment_bytes: usize,
    /// Maximum number of live segments. Appends that would exceed this
    /// fail with [`LogError::OutOfSpace`] until the cleaner reclaims.
    pub max_segments: usize,
    /// How long the cleaner thread sleeps between passes.
    pub cleaner_interval: Duration,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            segment_bytes: 1024 * 1024,
            max_segments: 64,
            cleaner_interval: Duration::from_millis(50),
        }
    }
}

struct LogState {
    segments: HashMap<u64, Segment>,
    head: u64,
    next_segment_id: u64,
}

/// The log. Shared via `Arc` between request handlers, the cleaner
/// thread, and side logs.
pub struct Log {
    config: LogConfig,
    state: Mutex<LogState>,
    safe_version: AtomicU64,
    unsynced: AtomicU64,
    syncs: AtomicU64,
    sink: RwLock<Option<Weak<dyn CleanupSink>>>,
    cleaner_running: Arc<AtomicBool>,
    cleaner: Mutex<Option<JoinHandle<()>>>,
    clean_gate: Mutex<()>,
    replica: Arc<ReplicaManager>,
}

impl Log {
    pub fn new(config: LogConfig) -> Arc<Self> {
        let mut segments = HashMap::new();
        segments.insert(1, Segment::new(1, false));
        Arc::new(Self {
            config,
            state: Mutex::new(LogState {
                segments,
                head: 1,
                next_segment_id: 2,
            }),
            safe_version: AtomicU64::new(0),
            unsynced: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
            sink: RwLock::new(None),
            cleaner_running: Arc::new(AtomicBool::new(false)),
            cleaner: Mutex::new(None),
            clean_gate: Mutex::new(()),
            replica: Arc::new(ReplicaManager::new()),
        })
    }

    /// The replication stub owned by this log.
    pub fn replica(&self) -> &Arc<ReplicaManager> {
        &self.replica
    }

    // -----------------------------------------------------------------
    // Appending
    // -----------------------------------------------------------------

    /// Append a batch of records as a unit: every record lands in the
    /// same segment, or the call fails with nothing written. This is
    /// what makes a paired object+tombstone write atomic with respect to
    /// backups.
    pub fn append_batch(&self, records: &[AppendRecord]) -> Result<Vec<LogReference>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let total: usize = records.iter().map(|r| r.payload.len()).sum();
        if total > self.config.segment_bytes {
            return Err(LogError::EntryTooLarge {
                bytes: total,
                capacity: self.config.segment_bytes,
            });
        }

        let mut state = self.state.lock().expect("log state poisoned");
        let target = self.segment_with_room(&mut state, total, false, None)?;
        let segment = state
            .segments
            .get_mut(&target)
            .expect("target segment exists");

        let references = records
            .iter()
            .map(|record| {
                let slot = segment.push(record.kind, record.timestamp, record.payload.clone());
                LogReference::new(target, slot)
            })
            .collect();
        self.unsynced.fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(references)
    }

    /// Append a single record.
    pub fn append(
        &self,
        kind: EntryKind,
        timestamp: u32,
        payload: impl Into<Bytes>,
    ) -> Result<LogReference> {
        let mut references =
            self.append_batch(&[AppendRecord::new(kind, timestamp, payload)])?;
        Ok(references.remove(0))
    }

    /// Append on behalf of a side log: records go into side-owned
    /// segments that the cleaner ignores until committed.
    pub(crate) fn append_side(
        &self,
        side_head: &mut Option<u64>,
        record: &AppendRecord,
    ) -> Result<LogReference> {
        if record.payload.len() > self.config.segment_bytes {
            return Err(LogError::EntryTooLarge {
                bytes: record.payload.len(),
                capacity: self.config.segment_bytes,
            });
        }
        let mut state = self.state.lock().expect("log state poisoned");
        let target = self.segment_with_room(&mut state, record.payload.len(), true, *side_head)?;
        *side_head = Some(target);
        let segment = state
            .segments
            .get_mut(&target)
            .expect("target segment exists");
        let slot = segment.push(record.kind, record.timestamp, record.payload.clone());
        self.unsynced.fetch_add(1, Ordering::Relaxed);
        Ok(LogReference::new(target, slot))
    }

    /// Pick (or open) the segment a `needed`-byte append should go to.
    fn segment_with_room(
        &self,
        state: &mut LogState,
        needed: usize,
        side: bool,
        side_head: Option<u64>,
    ) -> Result<u64> {
        let current = if side { side_head } else { Some(state.head) };
        if let Some(id) = current {
            if let Some(segment) = state.segments.get(&id) {
                if segment.bytes_used + needed <= self.config.segment_bytes {
                    return Ok(id);
                }
            }
        }

        if state.segments.len() >= self.config.max_segments {
            return Err(LogError::OutOfSpace);
        }
        let id = state.next_segment_id;
        state.next_segment_id += 1;
        if let Some(old) = current {
            if let Some(segment) = state.segments.get_mut(&old) {
                segment.sealed = true;
            }
        }
        state.segments.insert(id, Segment::new(id, side));
        if !side {
            state.head = id;
        }
        debug!(segment = id, side, "opened segment");
        Ok(id)
    }

    /// Fold committed side segments into the cleanable set.
    pub(crate) fn commit_side(&self, segment_ids: &[u64]) {
        let mut state = self.state.lock().expect("log state poisoned");
        for id in segment_ids {
            if let Some(segment) = state.segments.get_mut(id) {
                segment.side = false;
                segment.sealed = true;
            }
        }
    }

    // -----------------------------------------------------------------
    // Reading, freeing, durability
    // -----------------------------------------------------------------

    /// Dereference an entry. Returns the stored payload as a `Bytes`
    /// slice sharing the stored allocation, so the same entry always
    /// dereferences to the same address until it is relocated. The
    /// cleaner's liveness check depends on this.
    pub fn get_entry(&self, reference: LogReference) -> Option<(EntryKind, Bytes)> {
        let state = self.state.lock().expect("log state poisoned");
        let segment = state.segments.get(&reference.segment_id())?;
        let slot = segment.slots.get(reference.slot())?;
        if slot.freed {
            return None;
        }
        debug_assert_eq!(
            crc32fast::hash(&slot.payload),
            slot.crc,
            "stored entry failed integrity check"
        );
        Some((slot.kind, slot.payload.clone()))
    }

    /// Drop an entry. Its storage is reclaimed when the segment is
    /// cleaned; `get_entry` stops returning it immediately.
    pub fn free(&self, reference: LogReference) {
        let mut state = self.state.lock().expect("log state poisoned");
        if let Some(segment) = state.segments.get_mut(&reference.segment_id()) {
            if let Some(slot) = segment.slots.get_mut(reference.slot()) {
                if !slot.freed {
                    slot.freed = true;
                    segment.freed_bytes += slot.payload.len();
                }
            }
        }
    }

    /// Durability barrier: flush pending appends to backups.
    pub fn sync(&self) {
        self.unsynced.store(0, Ordering::Relaxed);
        self.syncs.fetch_add(1, Ordering::Relaxed);
    }

    /// Appends since the last `sync`.
    pub fn unsynced_appends(&self) -> u64 {
        self.unsynced.load(Ordering::Relaxed)
    }

    /// Number of `sync` barriers so far.
    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    /// Whether the segment is still live (not yet reclaimed by the
    /// cleaner). Tombstones are needed exactly as long as the segment
    /// they name exists.
    pub fn segment_exists(&self, segment_id: u64) -> bool {
        let state = self.state.lock().expect("log state poisoned");
        state.segments.contains_key(&segment_id)
    }

    /// The segment holding the referenced entry.
    pub fn segment_of(&self, reference: LogReference) -> u64 {
        reference.segment_id()
    }

    // -----------------------------------------------------------------
    // Safe version
    // -----------------------------------------------------------------

    /// Current version high-water mark.
    pub fn safe_version(&self) -> u64 {
        self.safe_version.load(Ordering::SeqCst)
    }

    /// Allocate a version for a never-before-seen key: strictly above
    /// the high-water mark, and advances it.
    pub fn allocate_version(&self) -> u64 {
        self.safe_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Raise the high-water mark to at least `version`. Returns whether
    /// it actually advanced.
    pub fn raise_safe_version(&self, version: u64) -> bool {
        self.safe_version.fetch_max(version, Ordering::SeqCst) < version
    }

    // -----------------------------------------------------------------
    // Cleaning
    // -----------------------------------------------------------------

    /// Register the entry owner the cleaner calls back into. Held weakly:
    /// the owner owns the log, not the other way around.
    pub fn register_cleanup_sink(&self, sink: Weak<dyn CleanupSink>) {
        *self.sink.write().expect("sink lock poisoned") = Some(sink);
    }

    /// Start the background cleaner thread. Idempotent.
    pub fn enable_cleaner(self: &Arc<Self>) {
        if self.cleaner_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let log = Arc::downgrade(self);
        let running = Arc::clone(&self.cleaner_running);
        let interval = self.config.cleaner_interval;
        let handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let Some(log) = log.upgrade() else {
                    break;
                };
                log.clean_once();
                drop(log);
                std::thread::sleep(interval);
            }
        });
        *self.cleaner.lock().expect("cleaner lock poisoned") = Some(handle);
    }

    /// Stop the cleaner thread and wait for it. Idempotent.
    pub fn halt_cleaner(&self) {
        self.cleaner_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.cleaner.lock().expect("cleaner lock poisoned").take() {
            let _ = handle.join();
        }
    }

    /// Run one cleaning pass: pick the sealed segment with the most
    /// freed bytes, offer each live entry to the cleanup sink, and
    /// reclaim the segment once evacuated. Returns whether a segment
    /// was reclaimed.
    ///
    /// The pass aborts (for a later retry) if any relocation fails for
    /// lack of space.
    pub fn clean_once(&self) -> bool {
        let _gate = self.clean_gate.lock().expect("clean gate poisoned");

        let sink = {
            let slot = self.sink.read().expect("sink lock poisoned");
            match slot.as_ref().and_then(Weak::upgrade) {
                Some(sink) => sink,
                None => return false,
            }
        };

        // Snapshot the candidate's live entries, then release the state
        // lock: the sink will take bucket locks and re-enter the log.
        let (candidate, live) = {
            let state = self.state.lock().expect("log state poisoned");
            let candidate = state
                .segments
                .values()
                .filter(|s| s.sealed && !s.side && s.freed_bytes > 0)
                .max_by_key(|s| s.freed_bytes);
            match candidate {
                Some(segment) => {
                    let live: Vec<(EntryKind, Bytes)> = segment
                        .live_slots()
                        .map(|slot| (slot.kind, slot.payload.clone()))
                        .collect();
                    (segment.id, live)
                }
                None => return false,
            }
        };

        for (kind, payload) in live {
            let mut relocator = EntryRelocator::new(self);
            sink.relocate(kind, &payload, &mut relocator);
            if relocator.failed() {
                return false;
            }
        }

        let mut state = self.state.lock().expect("log state poisoned");
        state.segments.remove(&candidate);
        debug!(segment = candidate, "reclaimed segment");
        true
    }

    /// Live segment count, for capacity monitoring.
    pub fn segment_count(&self) -> usize {
        let state = self.state.lock().expect("log state poisoned");
        state.segments.len()
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        // Signal without joining: the last Arc may be dropped by the
        // cleaner thread itself, and a thread cannot join itself. The
        // cleaner holds only a Weak and exits on its next wakeup.
        self.cleaner_running.store(false, Ordering::SeqCst);
        drop(self.cleaner.lock().expect("cleaner lock poisoned").take());
        self.replica.halt_failure_monitor();
    }
}
