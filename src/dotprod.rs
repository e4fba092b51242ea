// dotprod.rs
//
// Standardized dot product between two individuals, skipping any locus missing in either.

use crate::snpbin::{GenotypeVector, MISSING};

/// Which per-locus value enters the dot product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotProductMode {
    /// Raw allele counts, 0..=ploidy.
    #[default]
    Dosage,
    /// Allele counts divided by the individual's ploidy.
    Frequency,
}

impl DotProductMode {
    /// Maps a host-side "frequency" flag onto a mode.
    pub fn from_frequency_flag(frequency: bool) -> Self {
        if frequency {
            DotProductMode::Frequency
        } else {
            DotProductMode::Dosage
        }
    }
}

/// A monomorphised similarity kernel. The engine picks one implementor per call so the
/// pair loop never branches on the mode.
pub(crate) trait PairKernel: Sync {
    fn dot(x: &GenotypeVector, y: &GenotypeVector, mean: &[f64], sd: &[f64]) -> f64;
}

pub(crate) struct DosageKernel;
pub(crate) struct FrequencyKernel;

impl PairKernel for DosageKernel {
    #[inline]
    fn dot(x: &GenotypeVector, y: &GenotypeVector, mean: &[f64], sd: &[f64]) -> f64 {
        standardized_sum(x.raw_dosages(), y.raw_dosages(), mean, sd, 1.0, 1.0)
    }
}

impl PairKernel for FrequencyKernel {
    #[inline]
    fn dot(x: &GenotypeVector, y: &GenotypeVector, mean: &[f64], sd: &[f64]) -> f64 {
        standardized_sum(
            x.raw_dosages(),
            y.raw_dosages(),
            mean,
            sd,
            f64::from(x.ploidy()),
            f64::from(y.ploidy()),
        )
    }
}

#[inline(always)]
fn standardized_sum(
    x: &[u8],
    y: &[u8],
    mean: &[f64],
    sd: &[f64],
    x_divisor: f64,
    y_divisor: f64,
) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), mean.len());
    debug_assert_eq!(x.len(), sd.len());

    let mut acc = 0.0;
    for ((&a, &b), (&m, &s)) in x.iter().zip(y).zip(mean.iter().zip(sd)) {
        if a == MISSING || b == MISSING {
            continue;
        }
        let xa = f64::from(a) / x_divisor;
        let yb = f64::from(b) / y_divisor;
        acc += ((xa - m) / s) * ((yb - m) / s);
    }
    acc
}

/// Standardized dot product of two individuals over the loci both have observed.
///
/// `mean` and `sd` must have one entry per locus; `sd` is used as given, so run it through
/// the variance guard first.
pub fn dot_product(
    x: &GenotypeVector,
    y: &GenotypeVector,
    mean: &[f64],
    sd: &[f64],
    mode: DotProductMode,
) -> f64 {
    match mode {
        DotProductMode::Dosage => DosageKernel::dot(x, y, mean, sd),
        DotProductMode::Frequency => FrequencyKernel::dot(x, y, mean, sd),
    }
}
