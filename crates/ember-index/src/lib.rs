//! Bucket-keyed hash index for Emberstore.
//!
//! Maps key fingerprints to opaque `u64` log references. The index never
//! stores keys: resolving a candidate back to its key is the caller's
//! job (dereference through the log). Concurrency control is per-bucket:
//! a [`BucketGuard`] *is* the bucket lock, and every primitive that
//! touches bucket contents is a method on the guard, so holding the lock
//! is enforced by the type system rather than by convention.

pub mod index;

pub use index::{BucketGuard, Candidates, HashIndex};
