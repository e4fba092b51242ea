//! Pairwise genetic similarity over bit-packed SNP genotypes.
//!
//! Given N individuals genotyped at L loci, the crate computes
//!
//! * the N x N matrix of standardized dot products
//!   `Σ_j ((x_j - mean_j) / sd_j) * ((y_j - mean_j) / sd_j)` over loci observed in both
//!   individuals, stored as a packed triangle (see [`matrix`]), and
//! * per-locus sums of dosages or allele frequencies over observed genotypes (see [`sums`]).
//!
//! Genotypes arrive as packed bit-planes with an explicit list of missing loci per individual
//! ([`snpbin::GenlightFraming`]); [`codec`] builds such framing from plain dosages.

pub mod api;
pub mod codec;
pub mod config;
pub mod dotprod;
pub mod error;
pub mod guard;
pub mod matrix;
pub mod snpbin;
pub mod stats;
pub mod sums;

pub use config::ComputeConfig;
pub use dotprod::{dot_product, DotProductMode};
pub use error::{GenotypeError, Result};
pub use guard::{guard_standard_deviations, NEARZERO};
pub use matrix::{pairwise_dot_products, PackedTriangle, PairwiseEngine};
pub use snpbin::{GenlightFraming, GenotypeVector, PackedGenotypes, Ploidy, Population};
pub use stats::LocusStats;
