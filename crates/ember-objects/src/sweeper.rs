//! Background tombstone sweeper.
//!
//! Replay leaves tombstones in the hash index so later-arriving,
//! older-version objects stay suppressed. Once recovery is over those
//! bindings are dead weight. The sweeper retires them cooperatively:
//! one bucket per poll, bounded work per invocation, and no work at all
//! while nothing has been replayed since the last full pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::manager::ObjectManager;

/// Outcome of one sweeper poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// A bucket was processed.
    Swept,
    /// Nothing has been replayed since the last full pass began.
    Quiescent,
    /// The object manager is gone; the sweeper should exit.
    Detached,
}

/// Incremental scanner that purges stale replay tombstones.
pub struct TombstoneSweeper {
    manager: Weak<ObjectManager>,
    current_bucket: usize,
    passes: u64,
    last_replay_returns: u64,
}

impl TombstoneSweeper {
    pub fn new(manager: &Arc<ObjectManager>) -> Self {
        debug!("starting background tombstone sweeper");
        Self {
            manager: Arc::downgrade(manager),
            current_bucket: 0,
            passes: 0,
            last_replay_returns: 0,
        }
    }

    /// Process at most one bucket and yield.
    ///
    /// At the start of a pass the current replay-return count is
    /// recorded; if it has not moved since the previous pass began
    /// there is nothing new to collect and the poll is skipped. A
    /// recovery issues many replay calls but finishes far faster than
    /// one full pass here, so at worst the index is traversed one extra
    /// time per recovery.
    pub fn poll(&mut self) -> SweepOutcome {
        let Some(manager) = self.manager.upgrade() else {
            return SweepOutcome::Detached;
        };

        if self.current_bucket == 0 {
            let returns = manager.replay_returns();
            if returns == self.last_replay_returns {
                return SweepOutcome::Quiescent;
            }
            self.last_replay_returns = returns;
        }

        manager.sweep_bucket(self.current_bucket);

        self.current_bucket += 1;
        if self.current_bucket == manager.num_index_buckets() {
            debug!(pass = self.passes, "tombstone sweep completed pass");
            self.current_bucket = 0;
            self.passes += 1;
        }
        SweepOutcome::Swept
    }

    /// Completed full passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

/// Handle to the sweeper thread, owned by the object manager.
pub(crate) struct SweeperHandle {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the thread and wait for it.
    pub(crate) fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Stop the thread without waiting. For drop paths that may run on
    /// the sweeper thread itself.
    pub(crate) fn signal(mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.handle.take();
    }
}

/// Spawn the sweeper thread. It holds the manager weakly, so it exits
/// (deregisters itself) as soon as the manager is dropped, and idles at
/// `interval` whenever the index is quiescent.
pub(crate) fn spawn_sweeper(manager: &Arc<ObjectManager>, interval: Duration) -> SweeperHandle {
    let mut sweeper = TombstoneSweeper::new(manager);
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let handle = std::thread::spawn(move || {
        while flag.load(Ordering::SeqCst) {
            match sweeper.poll() {
                SweepOutcome::Swept => std::thread::yield_now(),
                SweepOutcome::Quiescent => std::thread::sleep(interval),
                SweepOutcome::Detached => break,
            }
        }
    });
    SweeperHandle {
        running,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ember_log::{EntryKind, Log, LogConfig, RecoverySegment, SideLog};
    use ember_tablet::{TabletState, TabletTable};
    use ember_types::{Key, TombstoneRecord};

    use crate::config::StoreConfig;

    const TABLE: u64 = 1;

    fn setup() -> (Arc<ObjectManager>, Arc<TabletTable>) {
        let tablets = Arc::new(TabletTable::new());
        tablets
            .add_tablet(TABLE, 0, u64::MAX, TabletState::Normal)
            .unwrap();
        let config = StoreConfig {
            hash_buckets: 8,
            disable_cleaner: true,
            sweeper_interval: Duration::from_millis(1),
            ..Default::default()
        };
        let log = Log::new(LogConfig::default());
        let manager = ObjectManager::new(config, log, Arc::clone(&tablets));
        (manager, tablets)
    }

    fn replay_one_tombstone(manager: &Arc<ObjectManager>, tablets: &TabletTable) -> Key {
        tablets
            .set_state(TABLE, 0, u64::MAX, TabletState::Recovering)
            .unwrap();
        let side_log = SideLog::new(Arc::clone(manager.log()));
        let tombstone = TombstoneRecord {
            table_id: TABLE,
            key: b"gone".to_vec(),
            object_version: 3,
            segment_id: 999,
            timestamp: 100,
        }
        .encode()
        .unwrap();
        let mut segment = RecoverySegment::new();
        segment.push(EntryKind::Tombstone, 100, tombstone);
        manager.replay_segment(&side_log, segment.iter()).unwrap();
        Key::new(TABLE, b"gone".to_vec())
    }

    #[test]
    fn sweeper_is_quiescent_before_any_replay() {
        let (manager, _tablets) = setup();
        let mut sweeper = TombstoneSweeper::new(&manager);
        assert_eq!(sweeper.poll(), SweepOutcome::Quiescent);
        assert_eq!(sweeper.passes(), 0);
    }

    #[test]
    fn one_extra_pass_after_replay_then_idle() {
        let (manager, tablets) = setup();
        let gone = replay_one_tombstone(&manager, &tablets);
        tablets
            .set_state(TABLE, 0, u64::MAX, TabletState::Normal)
            .unwrap();

        let mut sweeper = TombstoneSweeper::new(&manager);
        let buckets = manager.num_index_buckets();
        for _ in 0..buckets {
            assert_eq!(sweeper.poll(), SweepOutcome::Swept);
        }
        assert_eq!(sweeper.passes(), 1);

        // The pass collected the replay leftovers.
        assert!(manager.binding_kind(&gone).is_none());

        // No replay since the pass began: the sweeper idles.
        assert_eq!(sweeper.poll(), SweepOutcome::Quiescent);
    }

    #[test]
    fn active_recoveries_are_not_disturbed() {
        let (manager, tablets) = setup();
        let gone = replay_one_tombstone(&manager, &tablets);
        // Tablet still RECOVERING: the sweep runs but purges nothing.
        let mut sweeper = TombstoneSweeper::new(&manager);
        for _ in 0..manager.num_index_buckets() {
            assert_eq!(sweeper.poll(), SweepOutcome::Swept);
        }
        assert_eq!(manager.binding_kind(&gone), Some(EntryKind::Tombstone));

        tablets
            .set_state(TABLE, 0, u64::MAX, TabletState::Normal)
            .unwrap();
        assert_eq!(manager.remove_tombstones(), 1);
    }

    #[test]
    fn sweeper_detaches_when_the_manager_is_gone() {
        let (manager, _tablets) = setup();
        let mut sweeper = TombstoneSweeper::new(&manager);
        drop(manager);
        assert_eq!(sweeper.poll(), SweepOutcome::Detached);
    }

    #[test]
    fn background_sweeper_collects_after_recovery() {
        let (manager, tablets) = setup();
        let gone = replay_one_tombstone(&manager, &tablets);
        tablets
            .set_state(TABLE, 0, u64::MAX, TabletState::Normal)
            .unwrap();

        manager.start();
        // The background thread owns the pass; wait for it to collect.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while manager.binding_kind(&gone).is_some() {
            assert!(
                std::time::Instant::now() < deadline,
                "sweeper never collected the replay tombstone"
            );
            std::thread::sleep(Duration::from_millis(5));
        }
        manager.stop();
    }
}
