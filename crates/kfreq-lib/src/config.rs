//! Counting run configuration
//!
//! Parameters shared by both engines: k, the size of the requested top-N,
//! the filter error rate, and the memory/disk budgets for the external
//! engine.

use std::path::PathBuf;

use crate::cancel::CancelToken;
use crate::constants::{
    DEFAULT_ERROR_RATE, DEFAULT_SEED, DEFAULT_TARGET_DISK_GIB, DEFAULT_TARGET_MEMORY_GIB, GIB,
    MAX_K,
};
use crate::error::{Error, Result};
use crate::select::Algorithm;

/// Configuration for one counting run
#[derive(Debug, Clone)]
pub struct CountConfiguration {
    /// K-mer length (1..=64)
    pub k: usize,

    /// Number of most-frequent k-mers to return
    pub top_n: usize,

    /// Membership filter error rate, in (0, 1)
    pub error_rate: f64,

    /// Memory budget in bytes for exact tables
    pub target_memory: u64,

    /// Disk budget in bytes for partition files (a ceiling, not a target)
    pub target_disk: u64,

    /// Forced engine choice; `None` lets the selector decide
    pub algorithm: Option<Algorithm>,

    /// Seed for hash functions
    pub seed: u64,

    /// Number of threads for the count phase (0 = all available cores)
    pub num_threads: usize,

    /// Directory the per-run scratch directory is created under
    pub scratch_dir: PathBuf,

    /// Cooperative cancellation flag polled by the engines
    pub cancel: CancelToken,
}

impl Default for CountConfiguration {
    fn default() -> Self {
        Self {
            k: 31,
            top_n: 25,
            error_rate: DEFAULT_ERROR_RATE,
            target_memory: DEFAULT_TARGET_MEMORY_GIB * GIB,
            target_disk: DEFAULT_TARGET_DISK_GIB * GIB,
            algorithm: None,
            seed: DEFAULT_SEED,
            num_threads: 0,
            scratch_dir: std::env::temp_dir(),
            cancel: CancelToken::new(),
        }
    }
}

impl CountConfiguration {
    /// Create a configuration for the given k and top-N
    pub fn new(k: usize, top_n: usize) -> Result<Self> {
        let config = Self {
            k,
            top_n,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::Usage("k must be >= 1".into()));
        }
        if self.k > MAX_K {
            return Err(Error::Usage(format!(
                "k must be <= {MAX_K}, got k={}",
                self.k
            )));
        }
        if self.top_n == 0 {
            return Err(Error::Usage("n must be >= 1".into()));
        }
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(Error::Usage(format!(
                "error rate must be in (0, 1), got {}",
                self.error_rate
            )));
        }
        if self.target_memory == 0 {
            return Err(Error::Usage("target memory must be >= 1 byte".into()));
        }
        if self.target_disk == 0 {
            return Err(Error::Usage("target disk must be >= 1 byte".into()));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Count Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  n = {}", self.top_n);
        tracing::debug!("  error_rate = {}", self.error_rate);
        tracing::debug!("  target_memory = {} bytes", self.target_memory);
        tracing::debug!("  target_disk = {} bytes", self.target_disk);
        match self.algorithm {
            Some(a) => tracing::info!("  algorithm = {} (forced)", a),
            None => tracing::info!("  algorithm = auto"),
        }
        tracing::debug!("  seed = {}", self.seed);
        if self.num_threads == 0 {
            tracing::debug!("  num_threads = all available cores");
        } else {
            tracing::debug!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  scratch_dir = {:?}", self.scratch_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CountConfiguration::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_config() {
        let config = CountConfiguration::new(21, 10).unwrap();
        assert_eq!(config.k, 21);
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn test_validate_k_bounds() {
        assert!(CountConfiguration::new(0, 10).is_err());
        assert!(CountConfiguration::new(64, 10).is_ok());
        assert!(CountConfiguration::new(65, 10).is_err());
    }

    #[test]
    fn test_validate_n() {
        assert!(CountConfiguration::new(21, 0).is_err());
    }

    #[test]
    fn test_validate_error_rate() {
        let config = CountConfiguration {
            error_rate: 1.0,
            ..CountConfiguration::default()
        };
        assert!(config.validate().is_err());

        let config = CountConfiguration {
            error_rate: 0.0,
            ..CountConfiguration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_budgets() {
        let config = CountConfiguration {
            target_memory: 0,
            ..CountConfiguration::default()
        };
        assert!(config.validate().is_err());

        let config = CountConfiguration {
            target_disk: 0,
            ..CountConfiguration::default()
        };
        assert!(config.validate().is_err());
    }
}
