//! Disk-resident k-mer partitions
//!
//! Append-only bucket files with fixed-width framed records: each k-mer is
//! `ceil(2k/8)` little-endian bytes, no header, nothing between records
//! (the width is known from the run parameters). Files are grouped per
//! iteration so several iterations can coexist on disk without collision,
//! and are fsync-free; closing a writer flushes its buffers.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::constants::WRITE_BUFFER_BYTES;
use crate::error::{Error, Result};
use crate::kmer::KmerInt;

/// Bytes of one partition-file record for k-mers of length `k`.
#[inline]
pub const fn record_bytes(k: usize) -> usize {
    (2 * k).div_ceil(8)
}

/// Directory holding one iteration's partition files.
pub fn iteration_dir(scratch: &Path, iteration: u64) -> PathBuf {
    scratch.join(format!("iter{iteration:04}"))
}

fn partition_path(scratch: &Path, iteration: u64, partition: usize) -> PathBuf {
    iteration_dir(scratch, iteration).join(format!("part{partition:04}.bin"))
}

/// Append-only writer over one iteration's partition files.
pub struct PartitionWriter {
    iteration: u64,
    record_bytes: usize,
    files: Vec<(PathBuf, BufWriter<File>)>,
    bytes_written: u64,
}

impl PartitionWriter {
    /// Create `partitions` empty bucket files for `iteration` under the
    /// run scratch directory.
    pub fn create(
        scratch: &Path,
        iteration: u64,
        partitions: usize,
        k: usize,
    ) -> Result<Self> {
        let dir = iteration_dir(scratch, iteration);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        let mut files = Vec::with_capacity(partitions);
        for partition in 0..partitions {
            let path = partition_path(scratch, iteration, partition);
            let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
            files.push((path, BufWriter::with_capacity(WRITE_BUFFER_BYTES, file)));
        }

        Ok(Self {
            iteration,
            record_bytes: record_bytes(k),
            files,
            bytes_written: 0,
        })
    }

    /// Append one k-mer record to partition `partition` of this iteration.
    #[inline]
    pub fn write<W: KmerInt>(&mut self, partition: usize, kmer: W) -> Result<()> {
        let mut record = [0u8; 16];
        kmer.write_le(&mut record[..self.record_bytes]);
        let (path, writer) = &mut self.files[partition];
        writer
            .write_all(&record[..self.record_bytes])
            .map_err(|e| Error::io(&*path, e))?;
        self.bytes_written += self.record_bytes as u64;
        Ok(())
    }

    /// Total record bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Iteration these files belong to.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Flush and close every file, returning their paths in partition
    /// order.
    pub fn close(self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.files.len());
        for (path, mut writer) in self.files {
            writer.flush().map_err(|e| Error::io(&path, e))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Streaming reader over one partition file.
pub struct PartitionReader<W: KmerInt> {
    path: PathBuf,
    reader: std::io::BufReader<File>,
    record_bytes: usize,
    records: u64,
    _marker: std::marker::PhantomData<W>,
}

impl<W: KmerInt> PartitionReader<W> {
    /// Open a partition file written with the same k.
    ///
    /// # Errors
    /// `Io` if the file cannot be opened or its length is not a whole
    /// number of records.
    pub fn open(path: impl AsRef<Path>, k: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let len = file.metadata().map_err(|e| Error::io(&path, e))?.len();
        let record_bytes = record_bytes(k);

        if len % record_bytes as u64 != 0 {
            return Err(Error::io(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("truncated partition file ({len} bytes, {record_bytes}-byte records)"),
                ),
            ));
        }

        Ok(Self {
            path,
            reader: std::io::BufReader::with_capacity(WRITE_BUFFER_BYTES, file),
            record_bytes,
            records: len / record_bytes as u64,
            _marker: std::marker::PhantomData,
        })
    }

    /// Number of records in the file.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Read the next k-mer, or `None` at end of file.
    pub fn next_kmer(&mut self) -> Result<Option<W>> {
        let mut record = [0u8; 16];
        let buf = &mut record[..self.record_bytes];
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(Some(W::read_le(buf))),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_bytes() {
        assert_eq!(record_bytes(3), 1);
        assert_eq!(record_bytes(4), 1);
        assert_eq!(record_bytes(5), 2);
        assert_eq!(record_bytes(31), 8);
        assert_eq!(record_bytes(32), 8);
        assert_eq!(record_bytes(33), 9);
        assert_eq!(record_bytes(64), 16);
    }

    #[test]
    fn test_roundtrip_single_partition() {
        let scratch = TempDir::new().unwrap();
        let kmers: Vec<u64> = vec![0, 1, 42, 0b011011, u32::MAX as u64];

        let mut writer = PartitionWriter::create(scratch.path(), 0, 1, 21).unwrap();
        for &kmer in &kmers {
            writer.write(0, kmer).unwrap();
        }
        let paths = writer.close().unwrap();

        let mut reader = PartitionReader::<u64>::open(&paths[0], 21).unwrap();
        assert_eq!(reader.records(), kmers.len() as u64);
        let mut read_back = Vec::new();
        while let Some(kmer) = reader.next_kmer().unwrap() {
            read_back.push(kmer);
        }
        assert_eq!(read_back, kmers);
    }

    #[test]
    fn test_roundtrip_preserves_multiset_across_partitions() {
        let scratch = TempDir::new().unwrap();
        let kmers: Vec<u64> = (0..500).map(|i| (i * i) % 997).collect();

        let mut writer = PartitionWriter::create(scratch.path(), 2, 4, 15).unwrap();
        for &kmer in &kmers {
            writer.write((kmer % 4) as usize, kmer).unwrap();
        }
        let paths = writer.close().unwrap();
        assert_eq!(paths.len(), 4);

        let mut read_back = Vec::new();
        for path in &paths {
            let mut reader = PartitionReader::<u64>::open(path, 15).unwrap();
            while let Some(kmer) = reader.next_kmer().unwrap() {
                read_back.push(kmer);
            }
        }

        let mut expected = kmers.clone();
        expected.sort_unstable();
        read_back.sort_unstable();
        assert_eq!(read_back, expected);
    }

    #[test]
    fn test_wide_kmers_roundtrip() {
        let scratch = TempDir::new().unwrap();
        let kmers: Vec<u128> = vec![0, u128::from(u64::MAX) + 12345, 1 << 100];

        let mut writer = PartitionWriter::create(scratch.path(), 0, 1, 55).unwrap();
        for &kmer in &kmers {
            writer.write(0, kmer).unwrap();
        }
        let paths = writer.close().unwrap();

        let mut reader = PartitionReader::<u128>::open(&paths[0], 55).unwrap();
        let mut read_back = Vec::new();
        while let Some(kmer) = reader.next_kmer().unwrap() {
            read_back.push(kmer);
        }
        assert_eq!(read_back, kmers);
    }

    #[test]
    fn test_iteration_index_in_path() {
        let scratch = TempDir::new().unwrap();
        let w0 = PartitionWriter::create(scratch.path(), 0, 2, 11).unwrap();
        let w1 = PartitionWriter::create(scratch.path(), 1, 2, 11).unwrap();
        let paths0 = w0.close().unwrap();
        let paths1 = w1.close().unwrap();

        // Same partition indices, disjoint files.
        assert_ne!(paths0[0], paths1[0]);
        assert!(paths0[0].to_string_lossy().contains("iter0000"));
        assert!(paths1[0].to_string_lossy().contains("iter0001"));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let scratch = TempDir::new().unwrap();
        let path = scratch.path().join("bad.bin");
        fs::write(&path, [0u8; 5]).unwrap(); // k=21 -> 6-byte records
        assert!(matches!(
            PartitionReader::<u64>::open(&path, 21),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_bytes_written_tracks_records() {
        let scratch = TempDir::new().unwrap();
        let mut writer = PartitionWriter::create(scratch.path(), 0, 2, 21).unwrap();
        for kmer in 0..10u64 {
            writer.write((kmer % 2) as usize, kmer).unwrap();
        }
        assert_eq!(writer.bytes_written(), 10 * record_bytes(21) as u64);
    }
}
