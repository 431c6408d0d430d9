//! Read sources
//!
//! A [`ReadSource`] yields the nucleotide lines of a sequencing file as a
//! lazy, finite stream via a callback, the only access pattern the engines
//! need. Each `scan` starts a fresh pass, which is how the two-pass engine
//! gets its second look at the input.

use std::fs;
use std::path::{Path, PathBuf};

use needletail::parse_fastx_file;

use crate::error::{Error, Result};
use crate::extract::count_windows;

/// A restartable stream of nucleotide reads.
pub trait ReadSource {
    /// Stream every read through `f`, in file order. An error returned by
    /// `f` aborts the pass and is propagated unchanged.
    fn scan(&self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;

    /// Size of the backing input in bytes, when known.
    fn input_bytes(&self) -> Option<u64> {
        None
    }

    /// Path of the backing file, when there is one. Used to attribute
    /// input-level errors.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// FASTQ (or FASTA) file source with transparent gzip handling.
///
/// Each `scan` re-opens the file, so a source can be streamed any number of
/// times. Only the sequence line of each record is surfaced.
#[derive(Debug)]
pub struct FastqSource {
    path: PathBuf,
}

impl FastqSource {
    /// Open a sequence file.
    ///
    /// # Errors
    /// `Io` if the file does not exist or cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::metadata(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Self { path })
    }
}

impl ReadSource for FastqSource {
    fn scan(&self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        let mut reader = parse_fastx_file(&self.path).map_err(|e| Error::InvalidFastq {
            path: self.path.clone(),
            detail: e.to_string(),
        })?;

        while let Some(record) = reader.next() {
            let record = record.map_err(|e| Error::InvalidFastq {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
            f(&record.seq())?;
        }

        Ok(())
    }

    fn input_bytes(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory source over owned reads, for tests and embedding.
pub struct SliceSource {
    reads: Vec<Vec<u8>>,
}

impl SliceSource {
    /// Wrap a set of reads.
    pub fn new<I, R>(reads: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        Self {
            reads: reads.into_iter().map(|r| r.as_ref().to_vec()).collect(),
        }
    }
}

impl ReadSource for SliceSource {
    fn scan(&self, f: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        for read in &self.reads {
            f(read)?;
        }
        Ok(())
    }

    fn input_bytes(&self) -> Option<u64> {
        Some(self.reads.iter().map(|r| r.len() as u64).sum())
    }
}

/// Exact input statistics from one streaming pre-pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSurvey {
    /// Number of reads.
    pub reads: u64,
    /// Total bases across all reads.
    pub bases: u64,
    /// Total k-mer windows the extractor will enumerate.
    pub kmers: u64,
}

/// Measure the total k-mer volume of a source.
///
/// One pass over the reads, counting the windows the extractor will emit.
/// The external engine sizes its iterations and partitions from this.
pub fn survey_input(source: &dyn ReadSource, k: usize) -> Result<InputSurvey> {
    let mut survey = InputSurvey::default();
    source.scan(&mut |read| {
        survey.reads += 1;
        survey.bases += read.len() as u64;
        survey.kmers += count_windows(read, k);
        Ok(())
    })?;
    Ok(survey)
}
