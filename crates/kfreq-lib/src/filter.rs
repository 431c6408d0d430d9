//! Approximate membership filter for singleton suppression
//!
//! A Bloom-class filter sized from (expected distinct insertions, error
//! rate): no false negatives, false positives with probability at most the
//! error rate while at most `capacity` distinct elements have been
//! inserted. The bit array lives in an anonymous memory map so its working
//! set participates in OS paging instead of competing with the exact table
//! for anonymous heap.
//!
//! Coordinates come from double hashing over two independently seeded
//! hashers. The filter is write-only during the build pass and read-only
//! afterwards; [`freeze`](MembershipFilter::freeze) turns any later insert
//! into an assertion failure.

use memmap2::MmapMut;
use tracing::debug;

use crate::error::{Error, Result};
use crate::hasher::DeterministicHasher;
use crate::kmer::KmerInt;

/// A fixed-size approximate set of k-mers.
pub struct MembershipFilter {
    bits: MmapMut,
    num_bits: u64,
    num_hashes: u32,
    h1: DeterministicHasher,
    h2: DeterministicHasher,
    frozen: bool,
}

impl MembershipFilter {
    /// Create a filter for `capacity` expected distinct insertions at the
    /// given error rate.
    ///
    /// # Errors
    /// `Usage` for an out-of-range error rate or zero capacity;
    /// `ResourceExhausted` if the bit array cannot be mapped.
    pub fn with_capacity(capacity: u64, error_rate: f64, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Usage("filter capacity must be >= 1".into()));
        }
        if !(error_rate > 0.0 && error_rate < 1.0) {
            return Err(Error::Usage(format!(
                "filter error rate must be in (0, 1), got {error_rate}"
            )));
        }

        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((capacity as f64) * (1.0 / error_rate).ln() / (ln2 * ln2))
            .ceil()
            .max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / capacity as f64) * ln2).round().max(1.0) as u32;

        let num_bytes = num_bits.div_ceil(8) as usize;
        let bits = MmapMut::map_anon(num_bytes).map_err(|_| Error::ResourceExhausted {
            component: "membership filter",
        })?;

        debug!(
            "Membership filter: capacity={}, {} bits ({:.1} MB), {} hash functions",
            capacity,
            num_bits,
            num_bytes as f64 / (1024.0 * 1024.0),
            num_hashes
        );

        Ok(Self {
            bits,
            num_bits,
            num_hashes,
            h1: DeterministicHasher::new(seed),
            h2: DeterministicHasher::new(seed.wrapping_add(0x9e37_79b9_7f4a_7c15)),
            frozen: false,
        })
    }

    #[inline]
    fn coordinates<W: KmerInt>(&self, kmer: W) -> (u64, u64) {
        let a = self.h1.hash_kmer(kmer);
        // Odd stride so the probe sequence walks the whole array.
        let b = self.h2.hash_kmer(kmer) | 1;
        (a, b)
    }

    /// Insert a k-mer. Must not be called after [`freeze`](Self::freeze).
    #[inline]
    pub fn insert<W: KmerInt>(&mut self, kmer: W) {
        assert!(!self.frozen, "insert into a frozen membership filter");
        let (a, b) = self.coordinates(kmer);
        for i in 0..self.num_hashes as u64 {
            let bit = a.wrapping_add(i.wrapping_mul(b)) % self.num_bits;
            self.bits[(bit / 8) as usize] |= 1 << (bit % 8);
        }
    }

    /// Test membership: always true for inserted k-mers, true with
    /// probability at most the error rate otherwise.
    #[inline]
    pub fn probably_contains<W: KmerInt>(&self, kmer: W) -> bool {
        let (a, b) = self.coordinates(kmer);
        for i in 0..self.num_hashes as u64 {
            let bit = a.wrapping_add(i.wrapping_mul(b)) % self.num_bits;
            if self.bits[(bit / 8) as usize] & (1 << (bit % 8)) == 0 {
                return false;
            }
        }
        true
    }

    /// End the write phase; later inserts are programming errors.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Size of the bit array.
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Number of hash functions probed per operation.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let mut filter = MembershipFilter::with_capacity(1000, 0.01, 1).unwrap();
        for kmer in 0..1000u64 {
            filter.insert(kmer * 7919);
        }
        filter.freeze();
        for kmer in 0..1000u64 {
            assert!(filter.probably_contains(kmer * 7919));
        }
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let mut filter = MembershipFilter::with_capacity(10_000, 0.01, 1).unwrap();
        for kmer in 0..10_000u64 {
            filter.insert(kmer);
        }
        let false_positives = (10_000..110_000u64)
            .filter(|&kmer| filter.probably_contains(kmer))
            .count();
        // 1% target; allow generous slack over 100k probes.
        assert!(
            false_positives < 3_000,
            "false positive rate too high: {false_positives}/100000"
        );
    }

    #[test]
    fn test_empty_filter_contains_nothing_much() {
        let filter = MembershipFilter::with_capacity(100, 0.001, 1).unwrap();
        let hits = (0..1000u64).filter(|&k| filter.probably_contains(k)).count();
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_sizing_validation() {
        assert!(MembershipFilter::with_capacity(0, 0.01, 1).is_err());
        assert!(MembershipFilter::with_capacity(10, 0.0, 1).is_err());
        assert!(MembershipFilter::with_capacity(10, 1.0, 1).is_err());
        assert!(MembershipFilter::with_capacity(10, 1.5, 1).is_err());
    }

    #[test]
    fn test_deterministic_across_instances() {
        let mut f1 = MembershipFilter::with_capacity(100, 0.01, 9).unwrap();
        let mut f2 = MembershipFilter::with_capacity(100, 0.01, 9).unwrap();
        for kmer in [3u64, 1, 4, 1, 5, 9, 2, 6] {
            f1.insert(kmer);
            f2.insert(kmer);
        }
        for kmer in 0..50u64 {
            assert_eq!(f1.probably_contains(kmer), f2.probably_contains(kmer));
        }
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn test_insert_after_freeze_panics() {
        let mut filter = MembershipFilter::with_capacity(10, 0.01, 1).unwrap();
        filter.freeze();
        filter.insert(42u64);
    }
}
