//! Iteration-and-partition external counting engine
//!
//! K-mers are assigned to `iterations * partitions` disk buckets by a
//! single hash: the global partition id is `hash64(kmer) mod (I*P)`, the
//! iteration is `id mod I`, so one hash decides both and every k-mer is
//! written to exactly one (iteration, partition) pair. Each iteration
//! streams the reads, writes its own partitions (keeping at most one
//! iteration's files on disk, which is what the disk budget bounds), counts
//! each partition with an exact in-memory map, drains the counts into the
//! shared bounded top-N queue, and deletes its files before the next
//! iteration begins.
//!
//! Sizing follows the DSK criterion: iterations from the disk budget,
//! partitions from the memory budget, both at least 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::CountConfiguration;
use crate::constants::{PROGRESS_READ_INTERVAL, TABLE_ENTRY_BYTES};
use crate::error::{Error, Result};
use crate::extract::KmerWindows;
use crate::hasher::DeterministicHasher;
use crate::kmer::KmerInt;
use crate::partition::{iteration_dir, record_bytes, PartitionReader, PartitionWriter};
use crate::progress::ProgressSink;
use crate::reads::ReadSource;
use crate::topn::{CountEntry, TopN};

/// Bucket layout for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DskLayout {
    /// Number of iterations I.
    pub iterations: u64,
    /// Partitions per iteration P.
    pub partitions: u64,
    /// Bytes of one on-disk k-mer record.
    pub record_bytes: usize,
}

impl DskLayout {
    /// Total number of disk buckets, I * P.
    pub fn total_partitions(&self) -> u64 {
        self.iterations * self.partitions
    }
}

/// Compute the smallest layout honoring both budgets.
///
/// `total_kmers` is the k-mer volume V of the input (measured in a
/// pre-pass). Iterations bound the per-iteration disk footprint by the
/// disk budget; partitions bound one exact table by the memory budget.
pub fn plan_layout(total_kmers: u64, k: usize, target_memory: u64, target_disk: u64) -> DskLayout {
    let rec = record_bytes(k);
    let disk_bytes = total_kmers.saturating_mul(rec as u64);
    let iterations = disk_bytes.div_ceil(target_disk).max(1);

    let kmers_per_iteration = total_kmers.div_ceil(iterations).max(1);
    let table_bytes = kmers_per_iteration.saturating_mul(rec as u64 + TABLE_ENTRY_BYTES);
    let partitions = table_bytes.div_ceil(target_memory).max(1);

    DskLayout {
        iterations,
        partitions,
        record_bytes: rec,
    }
}

/// Removes the run scratch directory unless disarmed.
///
/// Covers every early return: I/O failure, partition overflow and
/// cancellation all leave no partition files behind.
struct ScratchGuard {
    dir: PathBuf,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

/// External counting engine.
pub struct DskEngine {
    config: CountConfiguration,
}

impl DskEngine {
    /// Create an engine for the given configuration.
    pub fn new(config: &CountConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Count the input and return the top-N entries, best first.
    ///
    /// `total_kmers` is the measured k-mer volume used for sizing.
    pub fn count<W: KmerInt>(
        &self,
        source: &dyn ReadSource,
        total_kmers: u64,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<CountEntry<W>>> {
        let k = self.config.k;
        if k > W::MAX_K {
            return Err(Error::Usage(format!(
                "k={k} does not fit a {}-bit k-mer code",
                W::BITS
            )));
        }

        let layout = plan_layout(
            total_kmers,
            k,
            self.config.target_memory,
            self.config.target_disk,
        );
        info!(
            "DSK layout: {} iterations x {} partitions ({}-byte records)",
            layout.iterations, layout.partitions, layout.record_bytes
        );

        let run_dir = self.create_run_dir()?;
        let _scratch = ScratchGuard {
            dir: run_dir.clone(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create thread pool: {e}")))?;

        let hasher = DeterministicHasher::new(self.config.seed);
        let mut top = TopN::new(self.config.top_n);

        for iteration in 0..layout.iterations {
            self.config.cancel.check()?;
            info!("Iteration {}/{}", iteration + 1, layout.iterations);

            let paths = self.write_iteration::<W>(source, &run_dir, &hasher, layout, iteration, progress)?;
            pool.install(|| {
                self.count_iteration::<W>(&paths, layout, iteration, &mut top, progress)
            })?;

            let dir = iteration_dir(&run_dir, iteration);
            fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }

        Ok(top.into_sorted_vec())
    }

    fn create_run_dir(&self) -> Result<PathBuf> {
        let run_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let dir = self
            .config
            .scratch_dir
            .join(format!("kfreq.run_{run_id:x}.p{}", std::process::id()));
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(dir)
    }

    /// Write phase: stream the reads, appending this iteration's k-mers to
    /// their partition files.
    fn write_iteration<W: KmerInt>(
        &self,
        source: &dyn ReadSource,
        run_dir: &Path,
        hasher: &DeterministicHasher,
        layout: DskLayout,
        iteration: u64,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<PathBuf>> {
        progress.on_phase("partition write");
        let mut writer =
            PartitionWriter::create(run_dir, iteration, layout.partitions as usize, self.config.k)?;

        let total = layout.total_partitions();
        let iterations = layout.iterations;
        let mut reads = 0u64;
        source.scan(&mut |read| {
            self.config.cancel.check()?;
            for kmer in KmerWindows::<W>::new(read, self.config.k) {
                let pid = hasher.hash_kmer(kmer) % total;
                if pid % iterations == iteration {
                    writer.write((pid / iterations) as usize, kmer)?;
                }
            }
            reads += 1;
            if reads % PROGRESS_READ_INTERVAL == 0 {
                progress.on_reads(reads);
            }
            Ok(())
        })?;

        debug!(
            "Iteration {}: {} bytes across {} partitions",
            iteration,
            writer.bytes_written(),
            layout.partitions
        );
        writer.close()
    }

    /// Count phase: exact per-partition maps, drained into the shared
    /// queue. Partitions run in parallel only while their combined
    /// projected table size stays under the memory budget, so aggregate
    /// resident bytes never exceed it.
    fn count_iteration<W: KmerInt>(
        &self,
        paths: &[PathBuf],
        layout: DskLayout,
        iteration: u64,
        top: &mut TopN<W>,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        progress.on_phase("partition count");
        let budget = self.config.target_memory;

        let mut batch: Vec<(u64, &PathBuf)> = Vec::new();
        let mut batch_bytes = 0u64;
        for (local, path) in paths.iter().enumerate() {
            self.config.cancel.check()?;
            // Global id of this bucket; its k-mers satisfy
            // hash % (I*P) == id.
            let pid = (local as u64) * layout.iterations + iteration;
            let projected = projected_table_bytes(path, layout.record_bytes)?;

            if !batch.is_empty() && batch_bytes + projected > budget {
                self.count_batch::<W>(&batch, top)?;
                batch.clear();
                batch_bytes = 0;
            }
            batch.push((pid, path));
            batch_bytes += projected;
        }
        if !batch.is_empty() {
            self.count_batch::<W>(&batch, top)?;
        }
        Ok(())
    }

    /// Count one memory-budgeted batch of partitions concurrently and
    /// funnel the results through the caller's queue.
    fn count_batch<W: KmerInt>(&self, batch: &[(u64, &PathBuf)], top: &mut TopN<W>) -> Result<()> {
        let locals: Vec<Vec<CountEntry<W>>> = batch
            .par_iter()
            .map(|&(pid, path)| {
                count_partition::<W>(
                    path,
                    pid,
                    self.config.k,
                    self.config.top_n,
                    self.config.target_memory,
                )
            })
            .collect::<Result<_>>()?;

        for entries in locals {
            for entry in entries {
                top.push(entry);
            }
        }
        Ok(())
    }
}

fn projected_table_bytes(path: &Path, record_bytes: usize) -> Result<u64> {
    let len = fs::metadata(path).map_err(|e| Error::io(path, e))?.len();
    Ok((len / record_bytes as u64).saturating_mul(TABLE_ENTRY_BYTES))
}

/// Count one partition file exactly and return its local top-N.
///
/// The map is bounded by the memory budget: if hash collisions concentrate
/// enough distinct k-mers in one partition, the count aborts with
/// `PartitionOverflow` (retryable with a larger partition count) instead
/// of thrashing.
fn count_partition<W: KmerInt>(
    path: &Path,
    partition: u64,
    k: usize,
    top_n: usize,
    target_memory: u64,
) -> Result<Vec<CountEntry<W>>> {
    let mut reader = PartitionReader::<W>::open(path, k)?;
    let max_entries = (target_memory / TABLE_ENTRY_BYTES).max(1);

    let mut counts: AHashMap<W, u32> = AHashMap::new();
    while let Some(kmer) = reader.next_kmer()? {
        *counts.entry(kmer).or_insert(0) += 1;
        if counts.len() as u64 > max_entries {
            return Err(Error::PartitionOverflow {
                partition,
                bytes: (counts.len() as u64) * TABLE_ENTRY_BYTES,
            });
        }
    }

    let mut top = TopN::new(top_n);
    for (kmer, count) in counts {
        top.push(CountEntry { kmer, count });
    }
    Ok(top.into_sorted_vec())
}
