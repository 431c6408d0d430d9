//! Constants shared across the counting pipeline.

/// Default seed for all hash functions.
pub const DEFAULT_SEED: u64 = 1;

/// Bytes per GiB.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Default Bloom filter error rate for the singleton-suppression engine.
pub const DEFAULT_ERROR_RATE: f64 = 1e-3;

/// Default memory budget in GiB for the external engine.
pub const DEFAULT_TARGET_MEMORY_GIB: u64 = 4;

/// Default disk budget in GiB for the external engine.
///
/// This is a ceiling, not a target: the engine picks the smallest iteration
/// count that stays under it.
pub const DEFAULT_TARGET_DISK_GIB: u64 = 25;

/// Estimated resident bytes per entry of a kmer -> u32 count table
/// (open addressing, including load-factor slack).
pub const TABLE_ENTRY_BYTES: u64 = 16;

/// Maximum supported k-mer length (fits a 128-bit rolling code).
pub const MAX_K: usize = 64;

/// Capacity of each partition-file write buffer.
pub const WRITE_BUFFER_BYTES: usize = 1024 * 1024;

/// Reads between two progress callbacks.
pub const PROGRESS_READ_INTERVAL: u64 = 100_000;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Check whether a k-mer length is supported.
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k >= 1 && k <= MAX_K
}
