//! Deterministic hasher for k-mers using ahash.
//!
//! AHasher with explicit seeds gives deterministic, strong non-cryptographic
//! hashing. One seeded family serves both the membership filter (which
//! derives its coordinates from two independent seeds) and partition
//! assignment, so a run's layout is reproducible.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

use crate::kmer::KmerInt;

/// A deterministic hasher with a seeded state
#[derive(Clone)]
pub struct DeterministicHasher {
    seed: u64,
    state: RandomState,
}

impl DeterministicHasher {
    /// Create a new deterministic hasher with the given seed
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(seed, !seed, seed.rotate_left(17), !seed.rotate_left(31));
        Self { seed, state }
    }

    /// Hash a k-mer code to a u64.
    ///
    /// The code is widened to u128 first so u64 and u128 storage hash a
    /// given k-mer identically.
    #[inline]
    pub fn hash_kmer<W: KmerInt>(&self, kmer: W) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u128(kmer.to_u128());
        hasher.finish()
    }

    /// Get the seed value
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
