// api.rs
//
// Entry points over caller-owned framing buffers: pairwise similarity, integer sums and
// frequency sums. Each call decodes what it needs, computes, and drops everything it built.

use log::info;
use std::time::Instant;

use crate::config::ComputeConfig;
use crate::error::Result;
use crate::matrix::PairwiseEngine;
use crate::snpbin::{GenlightFraming, PackedGenotypes, Population};
use crate::sums;

/// Fills `res` (length N(N+1)/2) with the packed triangle of standardized dot products.
///
/// `sd` is not modified; the variance guard works on a private copy.
pub fn similarity(
    framing: GenlightFraming<'_>,
    mean: &[f64],
    sd: &[f64],
    config: &ComputeConfig,
    res: &mut [f64],
) -> Result<()> {
    let start = Instant::now();
    let packed = PackedGenotypes::new(framing)?;
    let engine = PairwiseEngine::new(config)?;
    let pop = engine.install(|| Population::decode(&packed));
    engine.compute_into(&pop, mean, sd, res)?;
    info!(
        "Similarity matrix for {} individuals finished in {:.2?}.",
        pop.len(),
        start.elapsed()
    );
    Ok(())
}

/// Adds per-locus dosage sums into `res` (length L, caller-zeroed).
pub fn sum_int(framing: GenlightFraming<'_>, res: &mut [i64]) -> Result<()> {
    let packed = PackedGenotypes::new(framing)?;
    info!(
        "Summing dosages of {} individuals over {} loci.",
        packed.n_individuals(),
        packed.n_loci()
    );
    sums::accumulate_packed_dosage_sums(&packed, res)
}

/// Adds per-locus frequency sums into `res` (length L, caller-zeroed).
pub fn sum_freq(framing: GenlightFraming<'_>, res: &mut [f64]) -> Result<()> {
    let packed = PackedGenotypes::new(framing)?;
    info!(
        "Summing frequencies of {} individuals over {} loci.",
        packed.n_individuals(),
        packed.n_loci()
    );
    sums::accumulate_packed_frequency_sums(&packed, res)
}
