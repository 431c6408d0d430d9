//! Error type for the counting pipeline.
//!
//! Library code returns [`Error`]; CLI code wraps it in `anyhow` and maps
//! the variants to process exit codes. Errors are surfaced immediately and
//! partial results are never returned: on error the caller gets no top-N
//! and scratch files have already been removed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the counting engines and their collaborators.
#[derive(Error, Debug)]
pub enum Error {
    /// Parameter out of range or inconsistent.
    #[error("invalid parameter: {0}")]
    Usage(String),

    /// Read or write failure on the input or a partition file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File the operation failed on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The input could not be parsed as FASTA/FASTQ.
    #[error("'{path}' is not a valid FASTQ file: {detail}")]
    InvalidFastq {
        /// Offending input file.
        path: PathBuf,
        /// Parser diagnostic.
        detail: String,
    },

    /// An exact table grew past the memory budget.
    #[error("memory budget exceeded in {component}")]
    ResourceExhausted {
        /// Which table overflowed.
        component: &'static str,
    },

    /// A partition is too large to count in memory; retryable with more
    /// partitions.
    #[error("partition {partition} exceeds the memory budget ({bytes} bytes resident)")]
    PartitionOverflow {
        /// Global partition id.
        partition: u64,
        /// Observed resident table bytes when the budget was hit.
        bytes: u64,
    },

    /// Cooperative cancellation was observed.
    #[error("run cancelled")]
    Cancelled,

    /// Engine setup failed for a reason unrelated to any user parameter
    /// (thread pool construction and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;
