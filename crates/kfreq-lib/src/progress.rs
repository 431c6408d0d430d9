//! Progress reporting capability
//!
//! The engines call back into a [`ProgressSink`] every
//! [`PROGRESS_READ_INTERVAL`](crate::constants::PROGRESS_READ_INTERVAL)
//! reads and at phase boundaries. Reporting is informational only and never
//! affects control flow; the engines work unchanged with [`NoProgress`].

/// Receiver for informational progress ticks.
pub trait ProgressSink: Sync {
    /// A named phase (filter build, recount, iteration write, ...) started.
    fn on_phase(&self, _phase: &str) {}

    /// `reads` reads of the current streaming pass have been consumed.
    fn on_reads(&self, _reads: u64) {}
}

/// The no-op sink.
pub struct NoProgress;

impl ProgressSink for NoProgress {}
