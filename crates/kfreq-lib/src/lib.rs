// kfreq: memory-bounded top-N k-mer counting for FASTQ files
//
// Two counting engines behind one pipeline: a membership-filter engine
// that never spends a hash-table slot on a singleton, and an external
// engine that hash-partitions k-mers across disk buckets sized to a
// memory budget. K-mers are rolling 2-bit codes; no reverse-complement
// canonicalization is performed.

#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod bf;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod dsk;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod filter;
pub mod hasher;
pub mod kmer;
pub mod partition;
pub mod pipeline;
pub mod progress;
pub mod reads;
pub mod select;
pub mod topn;

// Re-export common types at crate root
pub use bf::BfEngine;
pub use cancel::CancelToken;
pub use config::CountConfiguration;
pub use dsk::{plan_layout, DskEngine, DskLayout};
pub use error::{Error, Result};
pub use extract::KmerWindows;
pub use filter::MembershipFilter;
pub use kmer::{to_dna_string, KmerInt};
pub use pipeline::{count_top_kmers, CountReport};
pub use progress::{NoProgress, ProgressSink};
pub use reads::{survey_input, FastqSource, InputSurvey, ReadSource, SliceSource};
pub use select::Algorithm;
pub use topn::{CountEntry, TopN};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
