// matrix.rs
//
// Pairwise standardized dot products for a whole population, stored as a packed
// triangle: all off-diagonal pairs (i < j) row by row, then the N diagonal entries.

use log::{debug, info};
use ndarray::Array2;
use rayon::prelude::*;
use std::ops::Range;
use std::time::Instant;

use crate::config::ComputeConfig;
use crate::dotprod::{DosageKernel, DotProductMode, FrequencyKernel, PairKernel};
use crate::error::{check_len, Result};
use crate::guard::guard_standard_deviations;
use crate::snpbin::{GenotypeVector, Population};

/// Length of the packed buffer for `n` individuals: N(N+1)/2.
#[inline]
pub fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Index of the first diagonal entry: N(N-1)/2.
#[inline]
pub fn diagonal_offset(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Index of the first off-diagonal entry of row `i`.
#[inline]
fn row_offset(n: usize, i: usize) -> usize {
    i * n - i * (i + 1) / 2
}

/// Packed index of the pair `(i, j)` with `i < j < n`.
#[inline]
pub fn off_diagonal_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    row_offset(n, i) + (j - i - 1)
}

/// Symmetric N x N similarity matrix in packed triangular form.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTriangle {
    n: usize,
    values: Vec<f64>,
}

impl PackedTriangle {
    /// Wraps a packed buffer; its length must be `packed_len(n)`.
    pub fn from_packed(n: usize, values: Vec<f64>) -> Result<Self> {
        check_len("packed triangle", packed_len(n), values.len())?;
        Ok(Self { n, values })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Entry `(i, j)` in either order. Panics if an index is out of range.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n && j < self.n, "index ({}, {}) out of range for n={}", i, j, self.n);
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => self.values[diagonal_offset(self.n) + i],
            std::cmp::Ordering::Less => self.values[off_diagonal_index(self.n, i, j)],
            std::cmp::Ordering::Greater => self.values[off_diagonal_index(self.n, j, i)],
        }
    }

    pub fn off_diagonal(&self) -> &[f64] {
        &self.values[..diagonal_offset(self.n)]
    }

    pub fn diagonal(&self) -> &[f64] {
        &self.values[diagonal_offset(self.n)..]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Expands to a full symmetric matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.n, self.n), |(i, j)| self.get(i, j))
    }
}

/// Splits `0..len` into at most `workers` contiguous ranges of near-equal size,
/// the larger ones first.
pub(crate) fn static_chunks(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let base = len / workers;
    let extra = len % workers;
    let mut start = 0;
    (0..workers)
        .map(|w| {
            let size = base + usize::from(w < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Every `(i, j)` with `i` in `rows` and `i < j < n`, in packed order.
fn row_pairs(n: usize, rows: Range<usize>) -> impl Iterator<Item = (usize, usize)> {
    rows.flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}

/// Cuts `buf` into consecutive disjoint slices of the given widths.
fn split_by_widths<'b>(mut buf: &'b mut [f64], widths: impl Iterator<Item = usize>) -> Vec<&'b mut [f64]> {
    let mut parts = Vec::new();
    for width in widths {
        let (head, tail) = std::mem::take(&mut buf).split_at_mut(width);
        parts.push(head);
        buf = tail;
    }
    parts
}

/// Drives the pair kernel over every (i, j) with a fixed worker pool.
pub struct PairwiseEngine {
    pool: rayon::ThreadPool,
    workers: usize,
    mode: DotProductMode,
}

impl PairwiseEngine {
    pub fn new(config: &ComputeConfig) -> Result<Self> {
        Ok(Self {
            pool: config.build_pool()?,
            workers: config.resolved_threads(),
            mode: config.mode,
        })
    }

    pub fn mode(&self) -> DotProductMode {
        self.mode
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `op` on this engine's worker pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// Computes the packed similarity matrix. `sd` is guarded into a private copy first.
    pub fn compute(&self, pop: &Population, mean: &[f64], sd: &[f64]) -> Result<PackedTriangle> {
        let mut values = vec![0.0; packed_len(pop.len())];
        self.compute_into(pop, mean, sd, &mut values)?;
        Ok(PackedTriangle {
            n: pop.len(),
            values,
        })
    }

    /// Like [`PairwiseEngine::compute`] but writes into a caller buffer of length N(N+1)/2.
    pub fn compute_into(&self, pop: &Population, mean: &[f64], sd: &[f64], res: &mut [f64]) -> Result<()> {
        let n = pop.len();
        check_len("mean", pop.n_loci(), mean.len())?;
        check_len("sd", pop.n_loci(), sd.len())?;
        check_len("res", packed_len(n), res.len())?;

        let sd = guard_standard_deviations(sd);
        info!(
            "Computing {} pairwise dot products for {} individuals over {} loci ({:?} mode, {} workers).",
            packed_len(n),
            n,
            pop.n_loci(),
            self.mode,
            self.workers
        );

        match self.mode {
            DotProductMode::Dosage => self.fill::<DosageKernel>(pop.as_slice(), mean, &sd, res),
            DotProductMode::Frequency => self.fill::<FrequencyKernel>(pop.as_slice(), mean, &sd, res),
        }
        Ok(())
    }

    fn fill<K: PairKernel>(&self, vectors: &[GenotypeVector], mean: &[f64], sd: &[f64], res: &mut [f64]) {
        let n = vectors.len();
        let (off, diag) = res.split_at_mut(diagonal_offset(n));

        // Off-diagonal: each worker owns a contiguous block of outer rows, which is
        // also a contiguous block of the packed buffer.
        let start = Instant::now();
        let row_chunks = static_chunks(n.saturating_sub(1), self.workers);
        let row_slices = split_by_widths(
            off,
            row_chunks.iter().map(|rows| row_offset(n, rows.end) - row_offset(n, rows.start)),
        );
        self.pool.install(|| {
            row_chunks
                .into_par_iter()
                .zip(row_slices)
                .for_each(|(rows, out)| {
                    let mut pairs = row_pairs(n, rows);
                    for (cell, (i, j)) in out.iter_mut().zip(pairs.by_ref()) {
                        *cell = K::dot(&vectors[i], &vectors[j], mean, sd);
                    }
                    debug_assert!(pairs.next().is_none(), "row block wider than its output slice");
                });
        });
        debug!("Off-diagonal phase finished in {:.2?}.", start.elapsed());

        let start = Instant::now();
        let diag_chunks = static_chunks(n, self.workers);
        let diag_slices = split_by_widths(diag, diag_chunks.iter().map(|r| r.len()));
        self.pool.install(|| {
            diag_chunks
                .into_par_iter()
                .zip(diag_slices)
                .for_each(|(individuals, out)| {
                    for (cell, i) in out.iter_mut().zip(individuals) {
                        *cell = K::dot(&vectors[i], &vectors[i], mean, sd);
                    }
                });
        });
        debug!("Diagonal phase finished in {:.2?}.", start.elapsed());
    }
}

/// One-shot form of [`PairwiseEngine::compute`].
pub fn pairwise_dot_products(
    pop: &Population,
    mean: &[f64],
    sd: &[f64],
    config: &ComputeConfig,
) -> Result<PackedTriangle> {
    PairwiseEngine::new(config)?.compute(pop, mean, sd)
}
