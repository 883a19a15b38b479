use serde::{Deserialize, Serialize};

/// Domain tag for key fingerprinting. Separated from content hashes so a
/// key can never collide with a payload digest.
const KEY_DOMAIN: &[u8] = b"ember-key-v1:";

/// A key within a table: `(table id, uninterpreted key bytes)`.
///
/// Equality is bytewise. The [`fingerprint`](Key::fingerprint) positions
/// the key in the 64-bit hash space used by both the hash index (bucket
/// selection) and the tablet table (ownership ranges).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    table_id: u64,
    key: Vec<u8>,
}

impl Key {
    /// Create a key from a table id and raw key bytes.
    pub fn new(table_id: u64, key: impl Into<Vec<u8>>) -> Self {
        Self {
            table_id,
            key: key.into(),
        }
    }

    /// The table this key belongs to.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// The raw key bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.key
    }

    /// Deterministic 64-bit fingerprint of this key.
    ///
    /// First 8 little-endian bytes of a domain-separated BLAKE3 hash over
    /// `table_id || key`. Stable across processes and restarts, which the
    /// tablet table relies on: ownership ranges are ranges of this value.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(&self.table_id.to_le_bytes());
        hasher.update(&self.key);
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/", self.table_id)?;
        match std::str::from_utf8(&self.key) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{:02x?}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = Key::new(1, b"alpha".to_vec());
        let b = Key::new(1, b"alpha".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_varies_with_table_and_bytes() {
        let a = Key::new(1, b"alpha".to_vec());
        let b = Key::new(2, b"alpha".to_vec());
        let c = Key::new(1, b"beta".to_vec());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn equality_is_bytewise() {
        let a = Key::new(7, vec![0x00, 0xff]);
        let b = Key::new(7, vec![0x00, 0xfe]);
        assert_ne!(a, b);
    }

    #[test]
    fn display_shows_table_and_key() {
        let key = Key::new(42, b"users".to_vec());
        assert_eq!(key.to_string(), "42/users");
    }
}
