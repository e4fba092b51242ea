// guard.rs

use log::debug;

/// Standard deviations below this are treated as zero variance.
pub const NEARZERO: f64 = 1e-10;

/// Returns a copy of `sd` with every entry below [`NEARZERO`] replaced by `1.0`.
///
/// A locus with (near) zero variance then contributes its centered value unscaled
/// instead of an infinity or NaN.
pub fn guard_standard_deviations(sd: &[f64]) -> Vec<f64> {
    let mut guarded = sd.to_vec();
    guard_in_place(&mut guarded);
    guarded
}

/// In-place form of [`guard_standard_deviations`]. Returns how many loci were clamped.
pub fn guard_in_place(sd: &mut [f64]) -> usize {
    let mut clamped = 0;
    for s in sd.iter_mut().filter(|s| **s < NEARZERO) {
        *s = 1.0;
        clamped += 1;
    }
    if clamped > 0 {
        debug!("Variance guard: {} of {} loci had sd < {:e}, set to 1.0.", clamped, sd.len(), NEARZERO);
    }
    clamped
}
