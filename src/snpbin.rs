// snpbin.rs
//
// Views over caller-owned packed genotype framing, and the decoded per-individual
// vectors the kernels read from.

use log::debug;
use rayon::prelude::*;
use std::time::Instant;

use crate::codec;
use crate::error::{GenotypeError, Result};

/// Sentinel stored in a decoded dosage slot when the locus is missing.
pub const MISSING: u8 = u8::MAX;

/// Largest accepted ploidy. Dosages never exceed it, so they cannot collide with [`MISSING`].
pub const MAX_PLOIDY: u8 = MISSING - 1;

/// Fails unless `1 <= ploidy <= MAX_PLOIDY`.
pub(crate) fn check_ploidy(individual: usize, ploidy: u8) -> Result<()> {
    if ploidy == 0 {
        return Err(GenotypeError::ZeroPloidy { individual });
    }
    if ploidy > MAX_PLOIDY {
        return Err(GenotypeError::PloidyTooLarge {
            individual,
            ploidy,
            max: MAX_PLOIDY,
        });
    }
    Ok(())
}

/// Ploidy of the individuals in a framing: one shared value or one per individual.
#[derive(Debug, Clone, Copy)]
pub enum Ploidy<'a> {
    Shared(u8),
    PerIndividual(&'a [u8]),
}

impl Ploidy<'_> {
    #[inline]
    fn of(&self, individual: usize) -> u8 {
        match self {
            Ploidy::Shared(p) => *p,
            Ploidy::PerIndividual(per) => per[individual],
        }
    }
}

/// Raw framing arrays describing a packed population, exactly as a host hands them over.
///
/// `gen` concatenates, for each individual in order, `vectors_per_individual[i]` bit-planes of
/// `byte_vector_len` bytes. `na_positions` concatenates each individual's
/// `na_per_individual[i]` zero-based missing loci.
#[derive(Debug, Clone, Copy)]
pub struct GenlightFraming<'a> {
    pub gen: &'a [u8],
    pub vectors_per_individual: &'a [usize],
    pub byte_vector_len: usize,
    pub na_per_individual: &'a [usize],
    pub na_positions: &'a [usize],
    pub n_individuals: usize,
    pub n_loci: usize,
    pub ploidy: Ploidy<'a>,
}

/// A validated [`GenlightFraming`] with per-individual offsets precomputed.
#[derive(Debug, Clone)]
pub struct PackedGenotypes<'a> {
    framing: GenlightFraming<'a>,
    gen_offsets: Vec<usize>,
    na_offsets: Vec<usize>,
}

impl<'a> PackedGenotypes<'a> {
    /// Checks every framing array against the stated individual and locus counts.
    pub fn new(framing: GenlightFraming<'a>) -> Result<Self> {
        let n = framing.n_individuals;
        if framing.vectors_per_individual.len() != n {
            return Err(GenotypeError::framing(
                "vectors_per_individual",
                n,
                framing.vectors_per_individual.len(),
            ));
        }
        if framing.na_per_individual.len() != n {
            return Err(GenotypeError::framing(
                "na_per_individual",
                n,
                framing.na_per_individual.len(),
            ));
        }
        if let Ploidy::PerIndividual(per) = framing.ploidy {
            if per.len() != n {
                return Err(GenotypeError::framing("ploidy", n, per.len()));
            }
        }
        for (individual, &planes) in framing.vectors_per_individual.iter().enumerate() {
            let ploidy = framing.ploidy.of(individual);
            check_ploidy(individual, ploidy)?;
            if planes > usize::from(ploidy) {
                return Err(GenotypeError::TooManyPlanes {
                    individual,
                    planes,
                    ploidy,
                });
            }
        }

        let needed = codec::byte_vector_len(framing.n_loci);
        if framing.byte_vector_len < needed {
            return Err(GenotypeError::ByteVectorTooShort {
                byte_len: framing.byte_vector_len,
                n_loci: framing.n_loci,
                needed,
            });
        }

        let gen_offsets = prefix_offsets(
            framing
                .vectors_per_individual
                .iter()
                .map(|&planes| planes * framing.byte_vector_len),
        );
        let na_offsets = prefix_offsets(framing.na_per_individual.iter().copied());

        let expected_bytes = gen_offsets[n];
        if framing.gen.len() != expected_bytes {
            return Err(GenotypeError::PackedLength {
                expected: expected_bytes,
                found: framing.gen.len(),
            });
        }
        let expected_na = na_offsets[n];
        if framing.na_positions.len() != expected_na {
            return Err(GenotypeError::framing(
                "na_positions",
                expected_na,
                framing.na_positions.len(),
            ));
        }
        for individual in 0..n {
            let positions = &framing.na_positions[na_offsets[individual]..na_offsets[individual + 1]];
            if let Some(&position) = positions.iter().find(|&&p| p >= framing.n_loci) {
                return Err(GenotypeError::NaPositionOutOfRange {
                    individual,
                    position,
                    n_loci: framing.n_loci,
                });
            }
        }

        Ok(Self {
            framing,
            gen_offsets,
            na_offsets,
        })
    }

    pub fn n_individuals(&self) -> usize {
        self.framing.n_individuals
    }

    pub fn n_loci(&self) -> usize {
        self.framing.n_loci
    }

    /// Packed view of individual `i`. Panics if `i` is out of range.
    pub fn individual(&self, i: usize) -> SnpBin<'a> {
        let f = &self.framing;
        SnpBin {
            bytes: &f.gen[self.gen_offsets[i]..self.gen_offsets[i + 1]],
            n_planes: f.vectors_per_individual[i],
            byte_len: f.byte_vector_len,
            n_loci: f.n_loci,
            na_positions: &f.na_positions[self.na_offsets[i]..self.na_offsets[i + 1]],
            ploidy: f.ploidy.of(i),
        }
    }

    pub fn individuals(&self) -> impl ExactSizeIterator<Item = SnpBin<'a>> + '_ {
        (0..self.n_individuals()).map(move |i| self.individual(i))
    }
}

fn prefix_offsets(sizes: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0];
    let mut total = 0;
    for size in sizes {
        total += size;
        offsets.push(total);
    }
    offsets
}

/// One individual's packed genotypes: bit-planes plus an explicit missing-locus list.
#[derive(Debug, Clone, Copy)]
pub struct SnpBin<'a> {
    bytes: &'a [u8],
    n_planes: usize,
    byte_len: usize,
    n_loci: usize,
    na_positions: &'a [usize],
    ploidy: u8,
}

impl<'a> SnpBin<'a> {
    pub fn n_loci(&self) -> usize {
        self.n_loci
    }

    pub fn ploidy(&self) -> u8 {
        self.ploidy
    }

    pub fn n_planes(&self) -> usize {
        self.n_planes
    }

    pub fn na_positions(&self) -> &'a [usize] {
        self.na_positions
    }

    /// Linear scan of the missing list; decode once with [`SnpBin::decode`] for repeated queries.
    pub fn is_missing(&self, locus: usize) -> bool {
        self.na_positions.contains(&locus)
    }

    /// Writes dosages into `out` (length `n_loci`) with [`MISSING`] at every missing locus.
    pub fn decode_into(&self, out: &mut [u8]) {
        codec::bytes_to_dosages(self.bytes, self.byte_len, out);
        for &locus in self.na_positions {
            out[locus] = MISSING;
        }
    }

    pub fn decode(&self) -> GenotypeVector {
        let mut dosages = vec![0u8; self.n_loci];
        self.decode_into(&mut dosages);
        GenotypeVector {
            dosages,
            ploidy: self.ploidy,
        }
    }
}

/// Decoded genotypes of one individual with O(1) per-locus queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeVector {
    dosages: Vec<u8>,
    ploidy: u8,
}

impl GenotypeVector {
    /// Builds a vector from explicit dosages, `None` marking a missing locus.
    pub fn from_dosages(dosages: &[Option<u8>], ploidy: u8) -> Result<Self> {
        check_ploidy(0, ploidy)?;
        let dosages = dosages
            .iter()
            .enumerate()
            .map(|(locus, d)| match *d {
                None => Ok(MISSING),
                Some(d) if d > ploidy => Err(GenotypeError::DosageAbovePloidy {
                    locus,
                    dosage: d,
                    ploidy,
                }),
                Some(d) => Ok(d),
            })
            .collect::<Result<Vec<u8>>>()?;
        Ok(Self { dosages, ploidy })
    }

    pub fn n_loci(&self) -> usize {
        self.dosages.len()
    }

    pub fn ploidy(&self) -> u8 {
        self.ploidy
    }

    #[inline]
    pub fn is_missing(&self, locus: usize) -> bool {
        self.dosages[locus] == MISSING
    }

    #[inline]
    pub fn dosage(&self, locus: usize) -> Option<u8> {
        match self.dosages[locus] {
            MISSING => None,
            d => Some(d),
        }
    }

    #[inline]
    pub fn frequency(&self, locus: usize) -> Option<f64> {
        self.dosage(locus)
            .map(|d| f64::from(d) / f64::from(self.ploidy))
    }

    /// Decoded dosages with [`MISSING`] in missing slots.
    #[inline]
    pub fn raw_dosages(&self) -> &[u8] {
        &self.dosages
    }

    pub fn n_missing(&self) -> usize {
        self.dosages.iter().filter(|&&d| d == MISSING).count()
    }
}

/// The decoded genotype vectors of N individuals over a common set of L loci.
#[derive(Debug, Clone, Default)]
pub struct Population {
    vectors: Vec<GenotypeVector>,
    n_loci: usize,
}

impl Population {
    /// Decodes every individual of a packed framing, in parallel over individuals.
    pub fn decode(packed: &PackedGenotypes<'_>) -> Self {
        let start = Instant::now();
        let vectors: Vec<GenotypeVector> = (0..packed.n_individuals())
            .into_par_iter()
            .map(|i| packed.individual(i).decode())
            .collect();
        debug!(
            "Decoded {} individuals x {} loci in {:.2?}.",
            vectors.len(),
            packed.n_loci(),
            start.elapsed()
        );
        Self {
            vectors,
            n_loci: packed.n_loci(),
        }
    }

    /// Wraps already decoded vectors; all must share the same locus count.
    pub fn from_vectors(n_loci: usize, vectors: Vec<GenotypeVector>) -> Result<Self> {
        if let Some((individual, v)) = vectors.iter().enumerate().find(|(_, v)| v.n_loci() != n_loci) {
            return Err(GenotypeError::LocusCountMismatch {
                individual,
                expected: n_loci,
                found: v.n_loci(),
            });
        }
        Ok(Self { vectors, n_loci })
    }

    /// Convenience for small fixtures: rows of dosages sharing one ploidy.
    pub fn from_dosage_rows(rows: &[Vec<Option<u8>>], n_loci: usize, ploidy: u8) -> Result<Self> {
        let vectors = rows
            .iter()
            .map(|row| GenotypeVector::from_dosages(row, ploidy))
            .collect::<Result<Vec<_>>>()?;
        Self::from_vectors(n_loci, vectors)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn n_loci(&self) -> usize {
        self.n_loci
    }

    pub fn get(&self, i: usize) -> Option<&GenotypeVector> {
        self.vectors.get(i)
    }

    pub fn as_slice(&self) -> &[GenotypeVector] {
        &self.vectors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GenotypeVector> {
        self.vectors.iter()
    }
}

impl std::ops::Index<usize> for Population {
    type Output = GenotypeVector;

    fn index(&self, i: usize) -> &GenotypeVector {
        &self.vectors[i]
    }
}
