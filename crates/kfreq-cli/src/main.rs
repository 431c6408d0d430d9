use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use kfreq_lib::{
    constants::GIB, count_top_kmers, to_dna_string, Algorithm, CountConfiguration, CountReport,
    Error, FastqSource, KmerInt, NoProgress,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "kfreq")]
#[command(version = "0.1.0")]
#[command(about = "Count the N most frequent k-mers in a FASTQ file", long_about = None)]
#[command(after_help = "K-mers are counted as read; reverse complements are not merged.")]
struct Cli {
    /// Input FASTQ file (may be gzipped)
    file: PathBuf,

    /// K-mer length (1-64)
    #[arg(short, long)]
    k: usize,

    /// Number of most frequent k-mers to output
    #[arg(short, long)]
    n: usize,

    /// Membership filter error rate (bf algorithm only)
    #[arg(short, long, default_value = "0.001")]
    error_rate: f64,

    /// Target disk space in GiB (dsk algorithm only)
    #[arg(short = 'd', long, default_value = "25")]
    target_disk: u64,

    /// Target memory in GiB
    #[arg(short = 'm', long, default_value = "4")]
    target_memory: u64,

    /// Counting algorithm
    #[arg(short, long, value_enum, default_value = "auto")]
    algorithm: AlgorithmArg,

    /// Number of threads (0 = all available cores)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,

    /// Directory for partition scratch files (default: system temp dir)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Select from input size and memory budget
    Auto,
    /// Singleton-suppression counting (membership filter)
    Bf,
    /// Iteration-and-partition external counting
    Dsk,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing: use RUST_LOG if set, otherwise default by verbosity
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Map error kinds to the documented process exit codes.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::Usage(_)) => 2,
        Some(Error::Io { .. }) | Some(Error::InvalidFastq { .. }) => 3,
        Some(Error::ResourceExhausted { .. }) => 4,
        Some(Error::PartitionOverflow { .. }) => 5,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CountConfiguration {
        k: cli.k,
        top_n: cli.n,
        error_rate: cli.error_rate,
        target_memory: cli.target_memory.saturating_mul(GIB),
        target_disk: cli.target_disk.saturating_mul(GIB),
        algorithm: match cli.algorithm {
            AlgorithmArg::Auto => None,
            AlgorithmArg::Bf => Some(Algorithm::Bf),
            AlgorithmArg::Dsk => Some(Algorithm::Dsk),
        },
        num_threads: cli.threads,
        scratch_dir: cli.scratch_dir.unwrap_or_else(std::env::temp_dir),
        ..CountConfiguration::default()
    };

    let source = FastqSource::open(&cli.file)?;

    let start = Instant::now();
    if cli.k <= <u64 as KmerInt>::MAX_K {
        print_report(count_top_kmers::<u64>(&source, &config, &NoProgress)?, cli.k);
    } else {
        print_report(count_top_kmers::<u128>(&source, &config, &NoProgress)?, cli.k);
    }
    info!("Total duration: {:.2?}", start.elapsed());

    Ok(())
}

fn print_report<W: KmerInt>(report: CountReport<W>, k: usize) {
    info!(
        "{} {}-mers in the input, counted with {}",
        report.survey.kmers, k, report.algorithm
    );
    for entry in &report.entries {
        println!("{}: {}", to_dna_string(entry.kmer, k), entry.count);
    }
}
