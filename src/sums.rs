// sums.rs
//
// Per-locus reductions over all individuals, skipping missing observations.
// Every individual adds into the same output slots, so these run sequentially.
// The `accumulate_*` forms only add: callers pass a zeroed buffer.

use crate::error::{check_len, Result};
use crate::snpbin::{PackedGenotypes, Population, MISSING};

#[inline]
fn add_dosages(dosages: &[u8], res: &mut [i64]) {
    for (slot, &d) in res.iter_mut().zip(dosages) {
        if d != MISSING {
            *slot += i64::from(d);
        }
    }
}

#[inline]
fn add_frequencies(dosages: &[u8], ploidy: u8, res: &mut [f64]) {
    let ploidy = f64::from(ploidy);
    for (slot, &d) in res.iter_mut().zip(dosages) {
        if d != MISSING {
            *slot += f64::from(d) / ploidy;
        }
    }
}

/// `res[j] += Σ_i dosage_i(j)` over every individual observed at locus j.
pub fn accumulate_dosage_sums(pop: &Population, res: &mut [i64]) -> Result<()> {
    check_len("res", pop.n_loci(), res.len())?;
    for v in pop.iter() {
        add_dosages(v.raw_dosages(), res);
    }
    Ok(())
}

/// `res[j] += Σ_i frequency_i(j)` over every individual observed at locus j.
pub fn accumulate_frequency_sums(pop: &Population, res: &mut [f64]) -> Result<()> {
    check_len("res", pop.n_loci(), res.len())?;
    for v in pop.iter() {
        add_frequencies(v.raw_dosages(), v.ploidy(), res);
    }
    Ok(())
}

/// Dosage sums straight from packed framing, decoding one individual at a time
/// into a single scratch buffer.
pub fn accumulate_packed_dosage_sums(packed: &PackedGenotypes<'_>, res: &mut [i64]) -> Result<()> {
    check_len("res", packed.n_loci(), res.len())?;
    let mut scratch = vec![0u8; packed.n_loci()];
    for individual in packed.individuals() {
        individual.decode_into(&mut scratch);
        add_dosages(&scratch, res);
    }
    Ok(())
}

/// Frequency sums straight from packed framing.
pub fn accumulate_packed_frequency_sums(packed: &PackedGenotypes<'_>, res: &mut [f64]) -> Result<()> {
    check_len("res", packed.n_loci(), res.len())?;
    let mut scratch = vec![0u8; packed.n_loci()];
    for individual in packed.individuals() {
        individual.decode_into(&mut scratch);
        add_frequencies(&scratch, individual.ploidy(), res);
    }
    Ok(())
}

pub fn dosage_sums(pop: &Population) -> Vec<i64> {
    let mut res = vec![0; pop.n_loci()];
    for v in pop.iter() {
        add_dosages(v.raw_dosages(), &mut res);
    }
    res
}

pub fn frequency_sums(pop: &Population) -> Vec<f64> {
    let mut res = vec![0.0; pop.n_loci()];
    for v in pop.iter() {
        add_frequencies(v.raw_dosages(), v.ploidy(), &mut res);
    }
    res
}
