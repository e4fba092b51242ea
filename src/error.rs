// error.rs

use thiserror::Error;

/// Errors raised while validating packed genotype framing or caller buffers.
///
/// The numeric kernels themselves never fail; everything here is a shape problem
/// detected before any dot product or sum is computed.
#[derive(Error, Debug)]
pub enum GenotypeError {
    /// One of the per-individual framing arrays has the wrong length.
    #[error("Framing mismatch: {field} has {found} entries, expected {expected}")]
    FramingLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// The packed byte buffer does not match the sum of the per-individual byte vectors.
    #[error("Packed genotype buffer holds {found} bytes, framing describes {expected}")]
    PackedLength { expected: usize, found: usize },

    /// A byte vector is too short to hold one bit per locus.
    #[error("Byte vector length {byte_len} cannot hold {n_loci} loci (need {needed})")]
    ByteVectorTooShort {
        byte_len: usize,
        n_loci: usize,
        needed: usize,
    },

    /// A missing-locus position points past the last locus.
    #[error("Individual {individual}: NA position {position} out of range for {n_loci} loci")]
    NaPositionOutOfRange {
        individual: usize,
        position: usize,
        n_loci: usize,
    },

    #[error("Individual {individual}: ploidy must be at least 1")]
    ZeroPloidy { individual: usize },

    #[error("Individual {individual}: ploidy {ploidy} exceeds the maximum of {max}")]
    PloidyTooLarge { individual: usize, ploidy: u8, max: u8 },

    /// More bit-planes than the ploidy allows; their sum could exceed any valid dosage.
    #[error("Individual {individual}: {planes} bit-planes exceed ploidy {ploidy}")]
    TooManyPlanes {
        individual: usize,
        planes: usize,
        ploidy: u8,
    },

    /// Encoding was asked to store a dosage larger than the ploidy allows.
    #[error("Locus {locus}: dosage {dosage} exceeds ploidy {ploidy}")]
    DosageAbovePloidy { locus: usize, dosage: u8, ploidy: u8 },

    /// An encoded individual does not have the locus count of the population being built.
    #[error("Individual {individual} has {found} loci, population has {expected}")]
    LocusCountMismatch {
        individual: usize,
        expected: usize,
        found: usize,
    },

    /// A caller-supplied output or statistics buffer has the wrong length.
    #[error("Buffer '{name}' has length {found}, expected {expected}")]
    BufferLength {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, GenotypeError>;

impl GenotypeError {
    pub(crate) fn framing(field: &'static str, expected: usize, found: usize) -> Self {
        Self::FramingLength {
            field,
            expected,
            found,
        }
    }

    pub(crate) fn buffer(name: &'static str, expected: usize, found: usize) -> Self {
        Self::BufferLength {
            name,
            expected,
            found,
        }
    }
}

/// Fails with [`GenotypeError::BufferLength`] unless `found == expected`.
pub(crate) fn check_len(name: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(GenotypeError::buffer(name, expected, found))
    }
}
