use std::sync::{Mutex, MutexGuard};

/// A bucket-keyed hash index from key fingerprints to opaque `u64`
/// references.
///
/// Buckets are selected by `fingerprint & (num_buckets - 1)`; the bucket
/// count is rounded up to a power of two. Each bucket is independently
/// locked, and at most one bucket lock may be held by a caller at a
/// time; no operation here ever takes two.
pub struct HashIndex {
    buckets: Vec<Mutex<Vec<u64>>>,
    mask: u64,
}

impl HashIndex {
    /// Create an index with at least `num_buckets` buckets.
    pub fn new(num_buckets: usize) -> Self {
        let count = num_buckets.max(1).next_power_of_two();
        let buckets = (0..count).map(|_| Mutex::new(Vec::new())).collect();
        Self {
            buckets,
            mask: (count - 1) as u64,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket a fingerprint maps to.
    pub fn bucket_of(&self, fingerprint: u64) -> usize {
        (fingerprint & self.mask) as usize
    }

    /// Lock the bucket for a fingerprint. The returned guard is the
    /// bucket lock; all candidate manipulation goes through it.
    pub fn lock_bucket(&self, fingerprint: u64) -> BucketGuard<'_> {
        self.lock_bucket_at(self.bucket_of(fingerprint))
    }

    /// Lock a bucket by position. Used by full-index sweeps.
    pub fn lock_bucket_at(&self, bucket: usize) -> BucketGuard<'_> {
        BucketGuard {
            bucket,
            references: self.buckets[bucket].lock().expect("bucket lock poisoned"),
        }
    }

    /// Best-effort cache-warming hint for the bucket a fingerprint maps
    /// to. Streaming replay calls this one entry ahead of the entry it
    /// is processing.
    pub fn prefetch_bucket(&self, fingerprint: u64) {
        let bucket = self.bucket_of(fingerprint);
        std::hint::black_box(&self.buckets[bucket]);
    }
}

/// An exclusively locked bucket.
pub struct BucketGuard<'a> {
    bucket: usize,
    references: MutexGuard<'a, Vec<u64>>,
}

impl BucketGuard<'_> {
    /// Position of this bucket in the index.
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// Number of references currently in the bucket.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Add a reference to the bucket. The caller is responsible for
    /// having checked that no candidate already matches its key.
    pub fn insert(&mut self, reference: u64) {
        self.references.push(reference);
    }

    /// A cursor over the bucket's candidates, positioned at the first.
    pub fn candidates(&mut self) -> Candidates<'_> {
        Candidates {
            references: &mut *self.references,
            pos: 0,
        }
    }
}

/// Cursor over the candidate references in one locked bucket.
///
/// The index stores only references, so every candidate may or may not
/// belong to the key being sought; callers dereference each through the
/// log and compare keys themselves.
pub struct Candidates<'a> {
    references: &'a mut Vec<u64>,
    pos: usize,
}

impl Candidates<'_> {
    pub fn is_done(&self) -> bool {
        self.pos >= self.references.len()
    }

    /// The reference under the cursor.
    pub fn reference(&self) -> u64 {
        self.references[self.pos]
    }

    /// Rewrite the reference under the cursor in place.
    pub fn set_reference(&mut self, reference: u64) {
        self.references[self.pos] = reference;
    }

    /// Remove the candidate under the cursor. The cursor stays at the
    /// same position, which now holds the next candidate (if any).
    pub fn remove(&mut self) {
        self.references.swap_remove(self.pos);
    }

    pub fn advance(&mut self) {
        if self.pos < self.references.len() {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(guard: &mut BucketGuard<'_>) -> Vec<u64> {
        let mut out = Vec::new();
        let mut candidates = guard.candidates();
        while !candidates.is_done() {
            out.push(candidates.reference());
            candidates.advance();
        }
        out
    }

    #[test]
    fn bucket_count_rounds_to_power_of_two() {
        assert_eq!(HashIndex::new(5).num_buckets(), 8);
        assert_eq!(HashIndex::new(8).num_buckets(), 8);
        assert_eq!(HashIndex::new(0).num_buckets(), 1);
    }

    #[test]
    fn same_fingerprint_same_bucket() {
        let index = HashIndex::new(16);
        assert_eq!(index.bucket_of(0x1234), index.bucket_of(0x1234));
        // Fingerprints differing only above the mask share a bucket.
        assert_eq!(index.bucket_of(0x3), index.bucket_of(0x10003));
    }

    #[test]
    fn insert_and_walk_candidates() {
        let index = HashIndex::new(4);
        let mut guard = index.lock_bucket_at(0);
        guard.insert(11);
        guard.insert(22);
        assert_eq!(collect(&mut guard), vec![11, 22]);
    }

    #[test]
    fn set_reference_rewrites_in_place() {
        let index = HashIndex::new(4);
        let mut guard = index.lock_bucket_at(1);
        guard.insert(11);
        guard.insert(22);

        let mut candidates = guard.candidates();
        candidates.advance();
        candidates.set_reference(33);
        drop(candidates);

        assert_eq!(collect(&mut guard), vec![11, 33]);
    }

    #[test]
    fn remove_keeps_cursor_usable() {
        let index = HashIndex::new(4);
        let mut guard = index.lock_bucket_at(2);
        guard.insert(11);
        guard.insert(22);
        guard.insert(33);

        let mut candidates = guard.candidates();
        candidates.remove(); // removes 11; 33 swaps into its slot
        let mut seen = Vec::new();
        while !candidates.is_done() {
            seen.push(candidates.reference());
            candidates.advance();
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![22, 33]);
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn guards_on_different_buckets_do_not_block() {
        let index = HashIndex::new(4);
        let _a = index.lock_bucket_at(0);
        let _b = index.lock_bucket_at(1);
    }

    #[test]
    fn prefetch_is_harmless() {
        let index = HashIndex::new(4);
        let _guard = index.lock_bucket(7);
        // Prefetching a locked bucket must not block or mutate.
        index.prefetch_bucket(7);
    }
}
