use std::sync::RwLock;

use ember_types::Key;

/// Serving state of a tablet on this server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TabletState {
    /// Serving reads and writes.
    Normal,
    /// Being rebuilt from replayed log segments; not serving.
    Recovering,
    /// Assigned but not yet loaded; not serving.
    NotReady,
}

/// Snapshot of one tablet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tablet {
    pub table_id: u64,
    pub start_hash: u64,
    pub end_hash: u64,
    pub state: TabletState,
    pub read_count: u64,
    pub write_count: u64,
}

impl Tablet {
    fn covers(&self, table_id: u64, hash: u64) -> bool {
        self.table_id == table_id && self.start_hash <= hash && hash <= self.end_hash
    }

    fn overlaps(&self, table_id: u64, start_hash: u64, end_hash: u64) -> bool {
        self.table_id == table_id && self.start_hash <= end_hash && start_hash <= self.end_hash
    }
}

/// Errors produced by tablet-table mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabletError {
    #[error("tablet overlaps an existing tablet of table {table_id}")]
    Overlap { table_id: u64 },

    #[error("no tablet of table {table_id} covering [{start_hash:#x}, {end_hash:#x}]")]
    NotFound {
        table_id: u64,
        start_hash: u64,
        end_hash: u64,
    },
}

/// The authoritative record of which key ranges this server owns.
pub struct TabletTable {
    tablets: RwLock<Vec<Tablet>>,
}

impl TabletTable {
    pub fn new() -> Self {
        Self {
            tablets: RwLock::new(Vec::new()),
        }
    }

    /// Add a tablet covering `[start_hash, end_hash]` of `table_id`.
    /// Rejects ranges overlapping an existing tablet of the same table.
    pub fn add_tablet(
        &self,
        table_id: u64,
        start_hash: u64,
        end_hash: u64,
        state: TabletState,
    ) -> Result<(), TabletError> {
        let mut tablets = self.tablets.write().expect("tablet table poisoned");
        if tablets
            .iter()
            .any(|t| t.overlaps(table_id, start_hash, end_hash))
        {
            return Err(TabletError::Overlap { table_id });
        }
        tablets.push(Tablet {
            table_id,
            start_hash,
            end_hash,
            state,
            read_count: 0,
            write_count: 0,
        });
        Ok(())
    }

    /// Drop the tablet with exactly this range.
    pub fn remove_tablet(
        &self,
        table_id: u64,
        start_hash: u64,
        end_hash: u64,
    ) -> Result<Tablet, TabletError> {
        let mut tablets = self.tablets.write().expect("tablet table poisoned");
        let pos = tablets
            .iter()
            .position(|t| {
                t.table_id == table_id && t.start_hash == start_hash && t.end_hash == end_hash
            })
            .ok_or(TabletError::NotFound {
                table_id,
                start_hash,
                end_hash,
            })?;
        Ok(tablets.swap_remove(pos))
    }

    /// Change the state of the tablet with exactly this range.
    pub fn set_state(
        &self,
        table_id: u64,
        start_hash: u64,
        end_hash: u64,
        state: TabletState,
    ) -> Result<(), TabletError> {
        let mut tablets = self.tablets.write().expect("tablet table poisoned");
        let tablet = tablets
            .iter_mut()
            .find(|t| {
                t.table_id == table_id && t.start_hash == start_hash && t.end_hash == end_hash
            })
            .ok_or(TabletError::NotFound {
                table_id,
                start_hash,
                end_hash,
            })?;
        tablet.state = state;
        Ok(())
    }

    /// The tablet covering a (table, fingerprint) position, if owned.
    pub fn get_tablet(&self, table_id: u64, hash: u64) -> Option<Tablet> {
        let tablets = self.tablets.read().expect("tablet table poisoned");
        tablets.iter().find(|t| t.covers(table_id, hash)).cloned()
    }

    /// The tablet covering a key, if owned.
    pub fn tablet_for(&self, key: &Key) -> Option<Tablet> {
        self.get_tablet(key.table_id(), key.fingerprint())
    }

    pub fn increment_read_count(&self, key: &Key) {
        let mut tablets = self.tablets.write().expect("tablet table poisoned");
        let (table_id, hash) = (key.table_id(), key.fingerprint());
        if let Some(tablet) = tablets.iter_mut().find(|t| t.covers(table_id, hash)) {
            tablet.read_count += 1;
        }
    }

    pub fn increment_write_count(&self, key: &Key) {
        let mut tablets = self.tablets.write().expect("tablet table poisoned");
        let (table_id, hash) = (key.table_id(), key.fingerprint());
        if let Some(tablet) = tablets.iter_mut().find(|t| t.covers(table_id, hash)) {
            tablet.write_count += 1;
        }
    }

    /// Snapshot of all owned tablets.
    pub fn tablets(&self) -> Vec<Tablet> {
        self.tablets.read().expect("tablet table poisoned").clone()
    }
}

impl Default for TabletTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_range_table() -> TabletTable {
        let table = TabletTable::new();
        table
            .add_tablet(1, 0, u64::MAX, TabletState::Normal)
            .unwrap();
        table
    }

    #[test]
    fn add_and_cover() {
        let table = full_range_table();
        let key = Key::new(1, b"anything".to_vec());
        let tablet = table.tablet_for(&key).unwrap();
        assert_eq!(tablet.state, TabletState::Normal);
        assert!(table.tablet_for(&Key::new(2, b"anything".to_vec())).is_none());
    }

    #[test]
    fn overlap_is_rejected() {
        let table = TabletTable::new();
        table.add_tablet(1, 0, 100, TabletState::Normal).unwrap();
        assert_eq!(
            table.add_tablet(1, 100, 200, TabletState::Normal),
            Err(TabletError::Overlap { table_id: 1 })
        );
        // Same range in a different table is fine.
        table.add_tablet(2, 0, 100, TabletState::Normal).unwrap();
    }

    #[test]
    fn set_state_transitions() {
        let table = full_range_table();
        table
            .set_state(1, 0, u64::MAX, TabletState::Recovering)
            .unwrap();
        let key = Key::new(1, b"k".to_vec());
        assert_eq!(table.tablet_for(&key).unwrap().state, TabletState::Recovering);

        assert!(matches!(
            table.set_state(9, 0, u64::MAX, TabletState::Normal),
            Err(TabletError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_tablet_drops_coverage() {
        let table = full_range_table();
        table.remove_tablet(1, 0, u64::MAX).unwrap();
        assert!(table.tablet_for(&Key::new(1, b"k".to_vec())).is_none());
    }

    #[test]
    fn counters_track_per_tablet() {
        let table = full_range_table();
        let key = Key::new(1, b"k".to_vec());
        table.increment_write_count(&key);
        table.increment_write_count(&key);
        table.increment_read_count(&key);

        let tablet = table.tablet_for(&key).unwrap();
        assert_eq!(tablet.write_count, 2);
        assert_eq!(tablet.read_count, 1);
    }
}
