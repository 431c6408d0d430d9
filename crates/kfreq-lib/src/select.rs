//! Engine selection policy
//!
//! Stateless, side-effect-free choice between the two counting engines.
//! The singleton-suppression engine is preferred while the estimated
//! distinct-k-mer table fits the memory budget; otherwise the external
//! engine takes over. The decision is monotone in the estimate.

use std::fmt;

use crate::constants::TABLE_ENTRY_BYTES;

/// The two counting engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Singleton-suppression counting (membership filter + exact table).
    Bf,
    /// Iteration-and-partition external counting.
    Dsk,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Bf => write!(f, "bf"),
            Algorithm::Dsk => write!(f, "dsk"),
        }
    }
}

/// Estimate total k-mer volume from the input size alone.
///
/// FASTQ records carry a header, the sequence line, a separator, and a
/// quality line as long as the sequence, so the sequence accounts for
/// roughly a quarter of the bytes. For inputs much longer than k the
/// window count tracks the base count.
pub fn estimate_total_kmers(input_bytes: u64, _k: usize) -> u64 {
    input_bytes / 4
}

/// Cap a k-mer volume by the size of the k-mer space.
///
/// There are at most 4^k distinct k-mers; beyond k = 32 the cap exceeds
/// u64 and never binds.
pub fn estimate_distinct(total_kmers: u64, k: usize) -> u64 {
    if k >= 32 {
        total_kmers
    } else {
        total_kmers.min(1u64 << (2 * k))
    }
}

/// Select an engine from the input byte size.
pub fn select(input_bytes: u64, k: usize, target_memory: u64) -> Algorithm {
    select_for_volume(estimate_total_kmers(input_bytes, k), k, target_memory)
}

/// Select an engine from a known (measured or estimated) k-mer volume.
pub fn select_for_volume(total_kmers: u64, k: usize, target_memory: u64) -> Algorithm {
    let distinct = estimate_distinct(total_kmers, k);
    if distinct.saturating_mul(TABLE_ENTRY_BYTES) > target_memory {
        Algorithm::Dsk
    } else {
        Algorithm::Bf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GIB;

    #[test]
    fn test_small_input_selects_bf() {
        assert_eq!(select(10 * 1024, 21, 4 * GIB), Algorithm::Bf);
    }

    #[test]
    fn test_huge_input_selects_dsk() {
        // 4 TiB of reads against a 1 GiB budget
        assert_eq!(select(4 * 1024 * GIB, 21, GIB), Algorithm::Dsk);
    }

    #[test]
    fn test_kmer_space_cap_favors_bf_for_tiny_k() {
        // 4^5 = 1024 distinct k-mers fit any sane budget no matter the
        // input size.
        assert_eq!(select(4 * 1024 * GIB, 5, GIB), Algorithm::Bf);
    }

    #[test]
    fn test_decision_is_monotone_in_volume() {
        let mem = GIB;
        let mut previous = Algorithm::Bf;
        for volume in [0, 1 << 20, 1 << 26, 1 << 32, 1 << 40] {
            let choice = select_for_volume(volume, 31, mem);
            if previous == Algorithm::Dsk {
                assert_eq!(choice, Algorithm::Dsk);
            }
            previous = choice;
        }
        assert_eq!(previous, Algorithm::Dsk);
    }

    #[test]
    fn test_estimate_distinct_caps_at_kmer_space() {
        assert_eq!(estimate_distinct(1_000_000, 3), 64);
        assert_eq!(estimate_distinct(10, 3), 10);
        assert_eq!(estimate_distinct(u64::MAX, 32), u64::MAX);
    }
}
