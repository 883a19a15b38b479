//! Record payloads stored in the log.
//!
//! The log itself treats payloads as opaque bytes; these are the three
//! payload layouts the object manager reads back out. All are encoded
//! with bincode. Integrity checksums are framed by the log, not here.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::Key;

/// A live key-value entry.
///
/// `version` is per-key monotonic; `timestamp` is wall-clock seconds at
/// write time and is what the log cleaner uses for age-based segment
/// selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub table_id: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub version: u64,
    pub timestamp: u32,
}

impl ObjectRecord {
    pub fn new(key: &Key, value: impl Into<Vec<u8>>, version: u64, timestamp: u32) -> Self {
        Self {
            table_id: key.table_id(),
            key: key.bytes().to_vec(),
            value: value.into(),
            version,
            timestamp,
        }
    }

    /// The key this object is stored under.
    pub fn key(&self) -> Key {
        Key::new(self.table_id, self.key.clone())
    }

    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        bincode::deserialize(bytes).map_err(|e| TypeError::Codec(e.to_string()))
    }
}

/// A delete marker covering a prior object.
///
/// `segment_id` names the log segment that held the object this
/// tombstone obsoletes; the tombstone is only needed while that segment
/// still exists (a crashed backup could otherwise resurrect the object).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TombstoneRecord {
    pub table_id: u64,
    pub key: Vec<u8>,
    pub object_version: u64,
    pub segment_id: u64,
    pub timestamp: u32,
}

impl TombstoneRecord {
    /// Build the tombstone that obsoletes `object`, which lives in log
    /// segment `segment_id`.
    pub fn for_object(object: &ObjectRecord, segment_id: u64, timestamp: u32) -> Self {
        Self {
            table_id: object.table_id,
            key: object.key.clone(),
            object_version: object.version,
            segment_id,
            timestamp,
        }
    }

    /// The key of the object this tombstone covers.
    pub fn key(&self) -> Key {
        Key::new(self.table_id, self.key.clone())
    }

    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        bincode::deserialize(bytes).map_err(|e| TypeError::Codec(e.to_string()))
    }
}

/// The persisted version high-water mark.
///
/// Replayed during recovery so versions handed to never-before-seen keys
/// strictly exceed every version assigned before the crash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeVersionRecord {
    pub safe_version: u64,
}

impl SafeVersionRecord {
    pub fn new(safe_version: u64) -> Self {
        Self { safe_version }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        bincode::deserialize(bytes).map_err(|e| TypeError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_record_roundtrip() {
        let key = Key::new(3, b"cursor".to_vec());
        let record = ObjectRecord::new(&key, b"payload".to_vec(), 9, 12345);
        let encoded = record.encode().unwrap();
        let decoded = ObjectRecord::decode(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.key(), key);
    }

    #[test]
    fn tombstone_covers_its_object() {
        let key = Key::new(3, b"cursor".to_vec());
        let object = ObjectRecord::new(&key, b"payload".to_vec(), 9, 12345);
        let tomb = TombstoneRecord::for_object(&object, 17, 12346);

        assert_eq!(tomb.key(), key);
        assert_eq!(tomb.object_version, 9);
        assert_eq!(tomb.segment_id, 17);

        let decoded = TombstoneRecord::decode(&tomb.encode().unwrap()).unwrap();
        assert_eq!(decoded, tomb);
    }

    #[test]
    fn safe_version_roundtrip() {
        let record = SafeVersionRecord::new(88);
        let decoded = SafeVersionRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded.safe_version, 88);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            ObjectRecord::decode(&[0xde, 0xad]),
            Err(TypeError::Codec(_))
        ));
    }
}
