use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock seconds since the Unix epoch, truncated to 32 bits.
///
/// This is the creation timestamp carried by every object and tombstone.
/// Resolution is deliberately coarse: the cleaner only needs entry ages,
/// never ordering.
pub fn seconds_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
