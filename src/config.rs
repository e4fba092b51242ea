// config.rs

use log::{info, warn};

use crate::dotprod::DotProductMode;
use crate::error::Result;

/// Run settings shared by the matrix engine and the entry points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeConfig {
    /// Dosage or frequency similarity.
    pub mode: DotProductMode,
    /// Worker count; `None` uses every available CPU.
    pub threads: Option<usize>,
}

impl ComputeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: DotProductMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_frequency(self, frequency: bool) -> Self {
        self.with_mode(DotProductMode::from_frequency_flag(frequency))
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Number of workers the engine will use, never less than one.
    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            Some(0) => {
                warn!("Requested 0 worker threads; using 1.");
                1
            }
            Some(n) => n,
            None => num_cpus::get(),
        }
    }

    /// Builds a dedicated worker pool sized by [`ComputeConfig::resolved_threads`].
    pub fn build_pool(&self) -> Result<rayon::ThreadPool> {
        let num_threads = self.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("dotprod-worker-{}", i))
            .build()?;
        info!("Using {} threads for parallel operations.", num_threads);
        Ok(pool)
    }
}
