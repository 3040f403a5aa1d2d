use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::sparse::SparseRatingMatrix;

/// Policy for a multiplicative update whose denominator is zero.
///
/// A zero denominator shows up for users/items with no observed ratings, or when
/// the factor entries it is built from are exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DenominatorGuard {
    /// base * numer / (denom + eps) for every update
    Epsilon(f64),
    /// Leave the entry unchanged when the denominator is exactly zero
    SkipZero,
    /// Report a zero denominator as an error
    Disabled,
}

impl Default for DenominatorGuard {
    fn default() -> Self {
        DenominatorGuard::Epsilon(1e-10)
    }
}

/// Single-entry multiplicative update: base * numer / denom under `guard`.
///
/// Returns `None` when the denominator is zero and the guard is disabled.
pub fn multiplicative_step(base: f64, numer: f64, denom: f64, guard: DenominatorGuard) -> Option<f64> {
    match guard {
        DenominatorGuard::Epsilon(eps) => Some(base * numer / (denom + eps)),
        DenominatorGuard::SkipZero if denom == 0.0 => Some(base),
        DenominatorGuard::Disabled if denom == 0.0 => None,
        _ => Some(base * numer / denom),
    }
}

/// True when `base * numer / denom` lost precision below the normal range:
/// a subnormal result, or zero from non-zero inputs.
pub fn underflowed(base: f64, numer: f64, new: f64) -> bool {
    if new == 0.0 {
        base != 0.0 && numer != 0.0
    } else {
        !new.is_normal()
    }
}

/// Predicted rating for one cell: u_row . V[:, col]
pub fn predict_cell(u_row: ArrayView1<f64>, v: &Array2<f64>, col: usize) -> f64 {
    u_row.dot(&v.column(col))
}

/// Weighted squared error ||W o (R - UV)||^2.
///
/// W is 1 exactly on the observed cells of R, so only those are visited.
pub fn weighted_loss(r: &SparseRatingMatrix, u: &Array2<f64>, v: &Array2<f64>) -> f64 {
    r.iter()
        .map(|(i, j, rating)| {
            let diff = rating - predict_cell(u.row(i), v, j);
            diff * diff
        })
        .sum()
}
