//! Singleton-suppression counting engine
//!
//! Two passes over the reads. Pass 1 builds a membership filter and an
//! exact table: a k-mer already in the filter goes to the table, a new one
//! goes to the filter, so k-mers occurring at least twice are guaranteed a
//! table slot while singletons stay in the filter. Pass 2 zeroes the table
//! and recounts exactly; keys ending at 1 are filter false positives and
//! are dropped. The bulk of the input (sequencing-noise singletons) never
//! costs a table entry.

use ahash::AHashMap;
use tracing::{debug, info};

use crate::config::CountConfiguration;
use crate::constants::{PROGRESS_READ_INTERVAL, TABLE_ENTRY_BYTES};
use crate::error::{Error, Result};
use crate::extract::KmerWindows;
use crate::filter::MembershipFilter;
use crate::kmer::KmerInt;
use crate::progress::ProgressSink;
use crate::reads::ReadSource;
use crate::topn::{CountEntry, TopN};

/// Two-pass membership-filter counting engine.
pub struct BfEngine {
    config: CountConfiguration,
}

impl BfEngine {
    /// Create an engine for the given configuration.
    pub fn new(config: &CountConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Count the input and return the top-N entries, best first.
    ///
    /// `expected_distinct` sizes the filter; a far-too-low value saturates
    /// the filter, floods the exact table with false positives, and makes
    /// the engine fail fast with `ResourceExhausted` once the table
    /// outgrows the memory budget.
    pub fn count<W: KmerInt>(
        &self,
        source: &dyn ReadSource,
        expected_distinct: u64,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<CountEntry<W>>> {
        let k = self.config.k;
        if k > W::MAX_K {
            return Err(Error::Usage(format!(
                "k={k} does not fit a {}-bit k-mer code",
                W::BITS
            )));
        }

        let mut filter = MembershipFilter::with_capacity(
            expected_distinct.max(1),
            self.config.error_rate,
            self.config.seed,
        )?;
        let max_table_entries = self.config.target_memory / TABLE_ENTRY_BYTES;
        let mut table: AHashMap<W, u32> = AHashMap::new();

        // Pass 1: filter build. Second and later occurrences land in the
        // exact table.
        info!("Pass 1: building membership filter...");
        progress.on_phase("filter build");
        let mut reads = 0u64;
        source.scan(&mut |read| {
            self.config.cancel.check()?;
            for kmer in KmerWindows::<W>::new(read, k) {
                if filter.probably_contains(kmer) {
                    *table.entry(kmer).or_insert(0) += 1;
                    if table.len() as u64 > max_table_entries {
                        return Err(Error::ResourceExhausted {
                            component: "singleton-suppression exact table",
                        });
                    }
                } else {
                    filter.insert(kmer);
                }
            }
            reads += 1;
            if reads % PROGRESS_READ_INTERVAL == 0 {
                progress.on_reads(reads);
            }
            Ok(())
        })?;
        filter.freeze();
        debug!("Pass 1 done: {} candidate k-mers in the table", table.len());

        // Pass 2: exact recount of the candidates only.
        info!("Pass 2: exact recount...");
        progress.on_phase("exact recount");
        for count in table.values_mut() {
            *count = 0;
        }
        let mut reads = 0u64;
        source.scan(&mut |read| {
            self.config.cancel.check()?;
            for kmer in KmerWindows::<W>::new(read, k) {
                if let Some(count) = table.get_mut(&kmer) {
                    *count += 1;
                }
            }
            reads += 1;
            if reads % PROGRESS_READ_INTERVAL == 0 {
                progress.on_reads(reads);
            }
            Ok(())
        })?;

        // Keys that recounted to 1 were admitted by filter false positives.
        let candidates = table.len();
        let mut top = TopN::new(self.config.top_n);
        for (kmer, count) in table {
            if count >= 2 {
                top.push(CountEntry { kmer, count });
            }
        }
        debug!(
            "Recount done: {} candidates, {} retained after singleton drop",
            candidates,
            top.len().min(candidates)
        );

        Ok(top.into_sorted_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::to_dna_string;
    use crate::progress::NoProgress;
    use crate::reads::SliceSource;

    fn run(reads: &[&str], k: usize, n: usize) -> Vec<(String, u32)> {
        let config = CountConfiguration::new(k, n).unwrap();
        let engine = BfEngine::new(&config).unwrap();
        let source = SliceSource::new(reads.to_vec());
        engine
            .count::<u64>(&source, 1_000, &NoProgress)
            .unwrap()
            .into_iter()
            .map(|e| (to_dna_string(e.kmer, k), e.count))
            .collect()
    }

    #[test]
    fn test_repeated_kmers_counted_exactly() {
        // AC appears 6 times, CA 4 times across the two reads.
        let result = run(&["ACACAC", "ACACAC"], 2, 4);
        assert_eq!(result, vec![("AC".into(), 6), ("CA".into(), 4)]);
    }

    #[test]
    fn test_singletons_are_dropped() {
        let result = run(&["ACGNACGT"], 3, 5);
        // ACG occurs twice; CGT only once and is suppressed.
        assert_eq!(result, vec![("ACG".into(), 2)]);
    }

    #[test]
    fn test_heavy_hitter() {
        let reads: Vec<String> = (0..1000).map(|_| "AAAAA".to_string()).collect();
        let read_refs: Vec<&str> = reads.iter().map(|s| s.as_str()).collect();
        let result = run(&read_refs, 5, 1);
        assert_eq!(result, vec![("AAAAA".into(), 1000)]);
    }

    #[test]
    fn test_tie_break_by_smaller_code() {
        // Every 3-mer of the cycle occurs exactly twice; order must follow
        // the integer codes: ACG < CGT < GTA < TAC.
        let result = run(&["ACGTACGTAC"], 3, 3);
        assert_eq!(
            result,
            vec![("ACG".into(), 2), ("CGT".into(), 2), ("GTA".into(), 2)]
        );
    }

    #[test]
    fn test_table_growth_fails_fast() {
        let config = CountConfiguration {
            target_memory: 2 * TABLE_ENTRY_BYTES,
            ..CountConfiguration::new(2, 5).unwrap()
        };
        let engine = BfEngine::new(&config).unwrap();
        // Many distinct repeated 2-mers force more than two table slots.
        let source = SliceSource::new(["ACACGTGTCACAGAGTCTC", "ACACGTGTCACAGAGTCTC"]);
        let err = engine.count::<u64>(&source, 1_000, &NoProgress).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted { .. }));
    }

    #[test]
    fn test_cancellation_observed_per_read() {
        let config = CountConfiguration::new(3, 5).unwrap();
        config.cancel.cancel();
        let engine = BfEngine::new(&config).unwrap();
        let source = SliceSource::new(["ACGTACGT"]);
        let err = engine.count::<u64>(&source, 100, &NoProgress).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let reads = ["ACGTACGTACGT", "TTGCATTGCA", "ACGTACGT"];
        assert_eq!(run(&reads, 4, 8), run(&reads, 4, 8));
    }

    #[test]
    fn test_k_too_large_for_storage() {
        let config = CountConfiguration::new(40, 5).unwrap();
        let engine = BfEngine::new(&config).unwrap();
        let source = SliceSource::new(["ACGT"]);
        assert!(matches!(
            engine.count::<u64>(&source, 100, &NoProgress),
            Err(Error::Usage(_))
        ));
    }
}
