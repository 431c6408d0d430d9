//! Counting pipeline orchestration
//!
//! One entry point ties the stages together: survey the input (exact
//! k-mer volume), pick an engine unless the caller forced one, run it, and
//! hand back the sorted top-N. An input with no k-mers at all is rejected
//! as invalid rather than counted to an empty result. The caller chooses
//! the k-mer storage width from k (`u64` up to k = 32, `u128` up to 64).

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::bf::BfEngine;
use crate::config::CountConfiguration;
use crate::dsk::DskEngine;
use crate::error::{Error, Result};
use crate::kmer::KmerInt;
use crate::progress::ProgressSink;
use crate::reads::{survey_input, InputSurvey, ReadSource};
use crate::select::{estimate_distinct, select_for_volume, Algorithm};
use crate::topn::CountEntry;

/// Outcome of one counting run.
#[derive(Debug, Clone)]
pub struct CountReport<W: KmerInt> {
    /// Engine that produced the result.
    pub algorithm: Algorithm,
    /// Input statistics from the pre-pass.
    pub survey: InputSurvey,
    /// Top-N entries, best first.
    pub entries: Vec<CountEntry<W>>,
}

/// Count the top-N most frequent k-mers of a read source.
pub fn count_top_kmers<W: KmerInt>(
    source: &dyn ReadSource,
    config: &CountConfiguration,
    progress: &dyn ProgressSink,
) -> Result<CountReport<W>> {
    config.validate()?;
    config.print();

    let start = Instant::now();
    progress.on_phase("input survey");
    let survey = survey_input(source, config.k)?;
    info!(
        "Surveyed {} reads, {} bases, {} {}-mers in {:.2?}",
        survey.reads,
        survey.bases,
        survey.kmers,
        config.k,
        start.elapsed()
    );

    // An input with nothing to count is a bad input, not an empty result.
    if survey.kmers == 0 {
        return Err(Error::InvalidFastq {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("<input>")),
            detail: format!("no {}-mers in the input", config.k),
        });
    }

    let algorithm = config
        .algorithm
        .unwrap_or_else(|| select_for_volume(survey.kmers, config.k, config.target_memory));
    info!("Selected algorithm: {}", algorithm);

    let start = Instant::now();
    let entries = match algorithm {
        Algorithm::Bf => {
            let expected = estimate_distinct(survey.kmers, config.k);
            BfEngine::new(config)?.count::<W>(source, expected, progress)?
        }
        Algorithm::Dsk => DskEngine::new(config)?.count::<W>(source, survey.kmers, progress)?,
    };
    info!(
        "Counted {} top entries in {:.2?}",
        entries.len(),
        start.elapsed()
    );

    Ok(CountReport {
        algorithm,
        survey,
        entries,
    })
}
