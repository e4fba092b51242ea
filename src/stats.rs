// stats.rs
//
// Per-locus summaries of a population: missing counts, means and standard deviations
// over observed genotypes. These are the usual `mean`/`sd` inputs of the matrix engine.

use log::{debug, warn};

use crate::dotprod::DotProductMode;
use crate::snpbin::{Population, MISSING};
use crate::sums;

/// Number of individuals missing at each locus.
pub fn missing_counts(pop: &Population) -> Vec<usize> {
    let mut counts = vec![0usize; pop.n_loci()];
    for v in pop.iter() {
        for (count, &d) in counts.iter_mut().zip(v.raw_dosages()) {
            *count += usize::from(d == MISSING);
        }
    }
    counts
}

/// Mean and population standard deviation per locus, computed over observed genotypes only.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusStats {
    pub mean: Vec<f64>,
    pub sd: Vec<f64>,
    /// Individuals observed at each locus.
    pub observed: Vec<usize>,
}

impl LocusStats {
    /// Loci nobody observed get mean 0 and sd 0; the variance guard turns the latter into 1.
    pub fn from_population(pop: &Population, mode: DotProductMode) -> Self {
        let observed: Vec<usize> = missing_counts(pop)
            .into_iter()
            .map(|missing| pop.len() - missing)
            .collect();

        let totals: Vec<f64> = match mode {
            DotProductMode::Dosage => sums::dosage_sums(pop).into_iter().map(|s| s as f64).collect(),
            DotProductMode::Frequency => sums::frequency_sums(pop),
        };
        let mean: Vec<f64> = totals
            .iter()
            .zip(&observed)
            .map(|(&total, &n)| if n == 0 { 0.0 } else { total / n as f64 })
            .collect();

        let mut squares = vec![0.0; pop.n_loci()];
        for v in pop.iter() {
            let divisor = match mode {
                DotProductMode::Dosage => 1.0,
                DotProductMode::Frequency => f64::from(v.ploidy()),
            };
            for ((acc, &d), &m) in squares.iter_mut().zip(v.raw_dosages()).zip(&mean) {
                if d != MISSING {
                    let centered = f64::from(d) / divisor - m;
                    *acc += centered * centered;
                }
            }
        }
        let sd: Vec<f64> = squares
            .iter()
            .zip(&observed)
            .map(|(&ss, &n)| if n == 0 { 0.0 } else { (ss / n as f64).sqrt() })
            .collect();

        let unobserved = observed.iter().filter(|&&n| n == 0).count();
        if unobserved > 0 {
            warn!("{} of {} loci have no observed genotypes.", unobserved, pop.n_loci());
        }
        debug!("Computed {:?}-mode locus statistics for {} loci.", mode, pop.n_loci());

        Self { mean, sd, observed }
    }
}
