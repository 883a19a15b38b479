use bytes::Bytes;

/// The typed entry kinds the log stores. Payload layouts live in
/// `ember-types`; the log treats them as opaque bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Object,
    Tombstone,
    SafeVersion,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryKind::Object => "object",
            EntryKind::Tombstone => "tombstone",
            EntryKind::SafeVersion => "safe-version",
        };
        f.write_str(s)
    }
}

/// One record submitted to an append call.
#[derive(Clone, Debug)]
pub struct AppendRecord {
    pub kind: EntryKind,
    pub timestamp: u32,
    pub payload: Bytes,
}

impl AppendRecord {
    pub fn new(kind: EntryKind, timestamp: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            timestamp,
            payload: payload.into(),
        }
    }
}

/// Opaque reference to an entry in the log.
///
/// The packing (segment id in the high bits, slot in the low 24) is a
/// log-internal detail; everything outside this crate round-trips the
/// raw `u64` through [`to_raw`](LogReference::to_raw) and
/// [`from_raw`](LogReference::from_raw).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LogReference(u64);

const SLOT_BITS: u32 = 24;
const SLOT_MASK: u64 = (1 << SLOT_BITS) - 1;

impl LogReference {
    pub(crate) fn new(segment_id: u64, slot: usize) -> Self {
        debug_assert!((slot as u64) <= SLOT_MASK);
        Self((segment_id << SLOT_BITS) | (slot as u64 & SLOT_MASK))
    }

    pub(crate) fn segment_id(self) -> u64 {
        self.0 >> SLOT_BITS
    }

    pub(crate) fn slot(self) -> usize {
        (self.0 & SLOT_MASK) as usize
    }

    /// The raw integer form stored in the hash index.
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Rebuild a reference from its raw integer form.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_packs_segment_and_slot() {
        let reference = LogReference::new(42, 7);
        assert_eq!(reference.segment_id(), 42);
        assert_eq!(reference.slot(), 7);
        assert_eq!(LogReference::from_raw(reference.to_raw()), reference);
    }

    #[test]
    fn entry_kind_display() {
        assert_eq!(EntryKind::Tombstone.to_string(), "tombstone");
    }
}
