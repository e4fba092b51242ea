// codec.rs
//
// Packed genotype layout: one individual is `n_planes` bit-planes laid end to end, each
// `byte_len` bytes. Locus j sits in byte j / 8 at bit j % 8 (least significant bit first).
// The dosage at a locus is the number of planes with that bit set.

use log::debug;

use crate::error::{GenotypeError, Result};
use crate::snpbin::{check_ploidy, GenlightFraming, PackedGenotypes, Ploidy, MAX_PLOIDY};

/// Bytes needed for one bit-plane over `n_loci` loci.
#[inline]
pub fn byte_vector_len(n_loci: usize) -> usize {
    n_loci.div_ceil(8)
}

/// Inflates concatenated bit-planes into per-locus dosages.
///
/// `planes` must hold a whole number of `byte_len`-sized vectors and `out` one slot per
/// locus. Trailing padding bits of the last byte are ignored. Callers go through
/// [`PackedGenotypes::new`], which caps the plane count at the ploidy, so the per-locus
/// sum stays below the decoded missing marker.
pub(crate) fn bytes_to_dosages(planes: &[u8], byte_len: usize, out: &mut [u8]) {
    out.fill(0);
    if byte_len == 0 {
        return;
    }
    debug_assert!(planes.len() / byte_len <= usize::from(MAX_PLOIDY));
    for plane in planes.chunks_exact(byte_len) {
        for (byte_idx, &byte) in plane.iter().enumerate() {
            if byte == 0 {
                continue;
            }
            let first = byte_idx * 8;
            if first >= out.len() {
                break;
            }
            let last = (first + 8).min(out.len());
            for (bit, slot) in out[first..last].iter_mut().enumerate() {
                *slot += (byte >> bit) & 1;
            }
        }
    }
}

/// Deflates a 0/1 vector into bytes, eight loci per byte, least significant bit first.
pub fn bits_to_bytes(bits: &[u8], out: &mut [u8]) {
    out.fill(0);
    for (chunk, byte) in bits.chunks(8).zip(out.iter_mut()) {
        *byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, &v)| acc | (u8::from(v != 0) << bit));
    }
}

/// One individual's genotypes in packed form, ready to be concatenated into a population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedIndividual {
    pub bytes: Vec<u8>,
    pub n_planes: usize,
    pub n_loci: usize,
    pub na_positions: Vec<usize>,
    pub ploidy: u8,
}

/// Encodes per-locus dosages (`None` = missing) into thermometer bit-planes.
///
/// Plane k carries a set bit at locus j when the dosage there is at least k + 1, so the
/// plane count equals the largest observed dosage (one empty plane when all are zero).
pub fn pack_dosages(dosages: &[Option<u8>], ploidy: u8) -> Result<PackedIndividual> {
    check_ploidy(0, ploidy)?;
    let n_loci = dosages.len();
    let byte_len = byte_vector_len(n_loci);

    let mut na_positions = Vec::new();
    let mut max_dosage = 0u8;
    for (locus, dosage) in dosages.iter().enumerate() {
        match *dosage {
            None => na_positions.push(locus),
            Some(d) if d > ploidy => {
                return Err(GenotypeError::DosageAbovePloidy {
                    locus,
                    dosage: d,
                    ploidy,
                })
            }
            Some(d) => max_dosage = max_dosage.max(d),
        }
    }

    let n_planes = usize::from(max_dosage.max(1));
    let mut bytes = vec![0u8; n_planes * byte_len];
    let mut plane_bits = vec![0u8; n_loci];
    for (plane, out) in bytes.chunks_exact_mut(byte_len.max(1)).enumerate().take(n_planes) {
        let threshold = plane as u8 + 1;
        for (bit, dosage) in plane_bits.iter_mut().zip(dosages) {
            *bit = u8::from(dosage.is_some_and(|d| d >= threshold));
        }
        bits_to_bytes(&plane_bits, out);
    }

    Ok(PackedIndividual {
        bytes,
        n_planes,
        n_loci,
        na_positions,
        ploidy,
    })
}

/// Owned framing arrays for a whole population, as produced by [`PopulationBuilder`].
#[derive(Debug, Clone, Default)]
pub struct OwnedPackedGenotypes {
    pub gen: Vec<u8>,
    pub vectors_per_individual: Vec<usize>,
    pub byte_vector_len: usize,
    pub na_per_individual: Vec<usize>,
    pub na_positions: Vec<usize>,
    pub n_loci: usize,
    pub ploidy: Vec<u8>,
}

impl OwnedPackedGenotypes {
    /// Borrows the owned arrays as a validated framing view.
    pub fn view(&self) -> Result<PackedGenotypes<'_>> {
        PackedGenotypes::new(GenlightFraming {
            gen: &self.gen,
            vectors_per_individual: &self.vectors_per_individual,
            byte_vector_len: self.byte_vector_len,
            na_per_individual: &self.na_per_individual,
            na_positions: &self.na_positions,
            n_individuals: self.vectors_per_individual.len(),
            n_loci: self.n_loci,
            ploidy: Ploidy::PerIndividual(&self.ploidy),
        })
    }
}

/// Concatenates encoded individuals into population-wide framing arrays.
#[derive(Debug)]
pub struct PopulationBuilder {
    n_loci: usize,
    packed: OwnedPackedGenotypes,
}

impl PopulationBuilder {
    pub fn new(n_loci: usize) -> Self {
        Self {
            n_loci,
            packed: OwnedPackedGenotypes {
                byte_vector_len: byte_vector_len(n_loci),
                n_loci,
                ..OwnedPackedGenotypes::default()
            },
        }
    }

    /// Encodes and appends one individual.
    pub fn push_dosages(&mut self, dosages: &[Option<u8>], ploidy: u8) -> Result<&mut Self> {
        let individual = self.packed.vectors_per_individual.len();
        if dosages.len() != self.n_loci {
            return Err(GenotypeError::LocusCountMismatch {
                individual,
                expected: self.n_loci,
                found: dosages.len(),
            });
        }
        let encoded = pack_dosages(dosages, ploidy).map_err(|e| match e {
            GenotypeError::ZeroPloidy { .. } => GenotypeError::ZeroPloidy { individual },
            GenotypeError::PloidyTooLarge { ploidy, max, .. } => GenotypeError::PloidyTooLarge {
                individual,
                ploidy,
                max,
            },
            other => other,
        })?;
        self.push_packed(encoded)
    }

    /// Appends an already encoded individual.
    pub fn push_packed(&mut self, individual: PackedIndividual) -> Result<&mut Self> {
        let index = self.packed.vectors_per_individual.len();
        if individual.n_loci != self.n_loci {
            return Err(GenotypeError::LocusCountMismatch {
                individual: index,
                expected: self.n_loci,
                found: individual.n_loci,
            });
        }
        let p = &mut self.packed;
        p.gen.extend_from_slice(&individual.bytes);
        p.vectors_per_individual.push(individual.n_planes);
        p.na_per_individual.push(individual.na_positions.len());
        p.na_positions.extend_from_slice(&individual.na_positions);
        p.ploidy.push(individual.ploidy);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.packed.vectors_per_individual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn finish(self) -> OwnedPackedGenotypes {
        debug!(
            "Packed {} individuals x {} loci into {} bytes.",
            self.packed.vectors_per_individual.len(),
            self.n_loci,
            self.packed.gen.len()
        );
        self.packed
    }
}
