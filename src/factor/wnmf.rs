use log::{debug, info, warn};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Factor, Result, WnmfError};
use crate::sparse::SparseRatingMatrix;

use super::init::init_factors;
pub use super::update_rules::DenominatorGuard;
use super::update_rules::{multiplicative_step, underflowed, weighted_loss};

/// Hyperparameters of a WNMF fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WnmfConfig {
    /// Latent rank k
    pub rank: usize,
    pub sweep_count: usize,
    pub seed: Option<u64>,
    pub guard: DenominatorGuard,
    /// Stop early once the loss changes by at most `tol` between sweeps
    pub tol: Option<f64>,
    /// Update U rows and V columns on the rayon pool
    pub parallel: bool,
}

impl Default for WnmfConfig {
    fn default() -> Self {
        Self {
            rank: 40,
            sweep_count: 4,
            seed: None,
            guard: DenominatorGuard::default(),
            tol: None,
            parallel: false,
        }
    }
}

impl WnmfConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(WnmfError::InvalidConfiguration(
                "rank must be positive".to_string(),
            ));
        }
        if let DenominatorGuard::Epsilon(eps) = self.guard {
            if !(eps.is_finite() && eps > 0.0) {
                return Err(WnmfError::InvalidConfiguration(format!(
                    "epsilon must be finite and positive, got {}",
                    eps
                )));
            }
        }
        if let Some(tol) = self.tol {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(WnmfError::InvalidConfiguration(format!(
                    "tolerance must be finite and non-negative, got {}",
                    tol
                )));
            }
        }
        Ok(())
    }
}

/// Result of a fit: R ≈ U * V
#[derive(Debug, Clone)]
pub struct FittedFactors {
    /// m x k user factors
    pub u: Array2<f64>,
    /// k x n item factors
    pub v: Array2<f64>,
    /// Loss of the initial factors followed by the loss after each sweep
    pub loss_history: Vec<f64>,
    pub sweeps_run: usize,
    /// Updated entries that fell below the normal f64 range, summed over all sweeps
    pub underflowed_entries: usize,
}

impl FittedFactors {
    pub fn final_loss(&self) -> f64 {
        self.loss_history.last().copied().unwrap_or(f64::NAN)
    }
}

/// Weighted non-negative matrix factorization with multiplicative updates.
///
/// One sweep updates every entry of U (row by row, in place), then every entry
/// of V (column by column, in place), each from the most recent values.
/// Each U row only reads itself and V, and each V column only reads itself and
/// U, so the parallel mode produces the same numbers as the sequential one.
pub struct WnmfModel {
    pub config: WnmfConfig,
}

impl WnmfModel {
    pub fn new(rank: usize) -> Self {
        Self {
            config: WnmfConfig {
                rank,
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: WnmfConfig) -> Self {
        Self { config }
    }

    /// Initialize U and V from the configured seed and run the sweeps
    pub fn fit(&self, r: &SparseRatingMatrix) -> Result<FittedFactors> {
        self.config.validate()?;
        let (m, n) = r.shape();
        let (u, v) = init_factors(m, n, self.config.rank, self.config.seed)?;
        self.fit_from(r, u, v)
    }

    /// Run the sweeps starting from caller-supplied factors
    pub fn fit_from(
        &self,
        r: &SparseRatingMatrix,
        mut u: Array2<f64>,
        mut v: Array2<f64>,
    ) -> Result<FittedFactors> {
        self.config.validate()?;
        if r.nnz() == 0 {
            return Err(WnmfError::EmptyInput);
        }
        let (m, n) = r.shape();
        let k = u.ncols();
        if u.nrows() != m || v.dim() != (k, n) {
            return Err(WnmfError::InvalidConfiguration(format!(
                "factor shapes {:?} and {:?} do not fit a {}x{} rating matrix",
                u.dim(),
                v.dim(),
                m,
                n
            )));
        }
        if u.iter().chain(v.iter()).any(|&x| !(x.is_finite() && x >= 0.0)) {
            return Err(WnmfError::InvalidConfiguration(
                "initial factors must be finite and non-negative".to_string(),
            ));
        }

        info!(
            "WNMF fit: {}x{} ratings, {} observed, rank {}, up to {} sweeps",
            m,
            n,
            r.nnz(),
            k,
            self.config.sweep_count
        );

        let mut loss_history = Vec::with_capacity(self.config.sweep_count + 1);
        loss_history.push(finite_loss(r, &u, &v, 0)?);
        let mut sweeps_run = 0;
        let mut underflowed_entries = 0;

        for sweep in 0..self.config.sweep_count {
            let underflows = self.sweep(r, &mut u, &mut v)?;
            if underflows > 0 {
                warn!(
                    "Sweep {}: {} factor entries underflowed below the normal range",
                    sweep + 1,
                    underflows
                );
            }
            underflowed_entries += underflows;
            sweeps_run += 1;

            let loss = finite_loss(r, &u, &v, sweep + 1)?;
            let prev = loss_history[loss_history.len() - 1];
            loss_history.push(loss);
            debug!("Sweep {}: weighted loss {:.6}", sweep + 1, loss);

            if let Some(tol) = self.config.tol {
                if (prev - loss).abs() <= tol {
                    debug!("Converged after {} sweeps (tol {})", sweeps_run, tol);
                    break;
                }
            }
        }

        info!(
            "WNMF done: {} sweeps, loss {:.6} -> {:.6}",
            sweeps_run,
            loss_history[0],
            loss_history[loss_history.len() - 1]
        );

        Ok(FittedFactors {
            u,
            v,
            loss_history,
            sweeps_run,
            underflowed_entries,
        })
    }

    /// One full sweep: all of U, then all of V.
    /// Returns the number of updated entries that underflowed.
    pub fn sweep(
        &self,
        r: &SparseRatingMatrix,
        u: &mut Array2<f64>,
        v: &mut Array2<f64>,
    ) -> Result<usize> {
        let in_u = self.update_u(r, u, v)?;
        let in_v = self.update_v(r, u, v)?;
        Ok(in_u + in_v)
    }

    fn update_u(&self, r: &SparseRatingMatrix, u: &mut Array2<f64>, v: &Array2<f64>) -> Result<usize> {
        let guard = self.config.guard;
        if self.config.parallel {
            u.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .map(|(i, row)| update_user_row(r, i, row, v, guard))
                .try_reduce(|| 0, |a, b| Ok(a + b))
        } else {
            u.axis_iter_mut(Axis(0))
                .enumerate()
                .try_fold(0, |acc, (i, row)| Ok(acc + update_user_row(r, i, row, v, guard)?))
        }
    }

    fn update_v(&self, r: &SparseRatingMatrix, u: &Array2<f64>, v: &mut Array2<f64>) -> Result<usize> {
        let guard = self.config.guard;
        if self.config.parallel {
            v.axis_iter_mut(Axis(1))
                .into_par_iter()
                .enumerate()
                .map(|(c, col)| update_item_col(r, c, col, u, guard))
                .try_reduce(|| 0, |a, b| Ok(a + b))
        } else {
            v.axis_iter_mut(Axis(1))
                .enumerate()
                .try_fold(0, |acc, (c, col)| Ok(acc + update_item_col(r, c, col, u, guard)?))
        }
    }
}

fn finite_loss(r: &SparseRatingMatrix, u: &Array2<f64>, v: &Array2<f64>, sweep: usize) -> Result<f64> {
    let loss = weighted_loss(r, u, v);
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(WnmfError::NonFiniteLoss { sweep })
    }
}

/// U[i,j] <- U[i,j] * sum_c R[i,c] V[j,c] / sum_c (U[i,:] . V[:,c]) V[j,c]
/// over the observed cells c of row i, for j = 0..k in order.
fn update_user_row(
    r: &SparseRatingMatrix,
    i: usize,
    mut u_row: ArrayViewMut1<f64>,
    v: &Array2<f64>,
    guard: DenominatorGuard,
) -> Result<usize> {
    let observed: Vec<(usize, f64)> = r.row(i).collect();
    let mut underflows = 0;
    // Current predictions U[i,:] . V[:,c], patched after every entry update
    let mut preds: Vec<f64> = observed
        .iter()
        .map(|&(c, _)| u_row.dot(&v.column(c)))
        .collect();

    for j in 0..u_row.len() {
        let mut numer = 0.0;
        let mut denom = 0.0;
        for (&(c, rating), &pred) in observed.iter().zip(&preds) {
            let v_jc = v[[j, c]];
            numer += rating * v_jc;
            denom += pred * v_jc;
        }

        let old = u_row[j];
        let new = multiplicative_step(old, numer, denom, guard).ok_or(
            WnmfError::DegenerateDenominator {
                factor: Factor::U,
                row: i,
                col: j,
            },
        )?;
        if !new.is_finite() {
            return Err(WnmfError::NumericOverflow {
                factor: Factor::U,
                row: i,
                col: j,
            });
        }
        if underflowed(old, numer, new) {
            underflows += 1;
        }
        u_row[j] = new;

        let delta = new - old;
        for (&(c, _), pred) in observed.iter().zip(preds.iter_mut()) {
            *pred += delta * v[[j, c]];
        }
    }
    Ok(underflows)
}

/// V[j,c] <- V[j,c] * sum_i U[i,j] R[i,c] / sum_i U[i,j] (U[i,:] . V[:,c])
/// over the observed cells i of column c, for j = 0..k in order.
fn update_item_col(
    r: &SparseRatingMatrix,
    c: usize,
    mut v_col: ArrayViewMut1<f64>,
    u: &Array2<f64>,
    guard: DenominatorGuard,
) -> Result<usize> {
    let observed: Vec<(usize, f64)> = r.col(c).collect();
    let mut underflows = 0;
    let mut preds: Vec<f64> = observed
        .iter()
        .map(|&(i, _)| u.row(i).dot(&v_col))
        .collect();

    for j in 0..v_col.len() {
        let mut numer = 0.0;
        let mut denom = 0.0;
        for (&(i, rating), &pred) in observed.iter().zip(&preds) {
            let u_ij = u[[i, j]];
            numer += u_ij * rating;
            denom += u_ij * pred;
        }

        let old = v_col[j];
        let new = multiplicative_step(old, numer, denom, guard).ok_or(
            WnmfError::DegenerateDenominator {
                factor: Factor::V,
                row: j,
                col: c,
            },
        )?;
        if !new.is_finite() {
            return Err(WnmfError::NumericOverflow {
                factor: Factor::V,
                row: j,
                col: c,
            });
        }
        if underflowed(old, numer, new) {
            underflows += 1;
        }
        v_col[j] = new;

        let delta = new - old;
        for (&(i, _), pred) in observed.iter().zip(preds.iter_mut()) {
            *pred += delta * u[[i, j]];
        }
    }
    Ok(underflows)
}
