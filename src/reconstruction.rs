use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::factor::update_rules::predict_cell;
use crate::sparse::SparseRatingMatrix;

/// Actual rating next to its reconstruction for one observed cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedPrediction {
    pub user: usize,
    pub item: usize,
    pub actual: f64,
    pub predicted: f64,
}

impl ObservedPrediction {
    pub fn residual(&self) -> f64 {
        self.actual - self.predicted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionSummary {
    pub count: usize,
    pub rmse: f64,
    pub mae: f64,
    pub mean_residual: f64,
    /// Sample standard deviation, NaN with fewer than two cells
    pub residual_std_dev: f64,
}

/// Lazy view of UV over fitted factors.
///
/// Rows are produced one at a time so the full m x n product is only built on
/// request via [`Reconstruction::to_dense`]. Runs on the calling thread unless
/// [`Reconstruction::with_parallel`] is set.
pub struct Reconstruction<'a> {
    u: &'a Array2<f64>,
    v: &'a Array2<f64>,
    parallel: bool,
}

impl<'a> Reconstruction<'a> {
    pub fn new(u: &'a Array2<f64>, v: &'a Array2<f64>) -> Self {
        Self {
            u,
            v,
            parallel: false,
        }
    }

    /// Spread [`Reconstruction::observed_pairs`] over the rayon pool
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.u.nrows(), self.v.ncols())
    }

    /// (UV)[user, item], `None` outside the reconstructed matrix
    pub fn predict(&self, user: usize, item: usize) -> Option<f64> {
        let (m, n) = self.shape();
        if user >= m || item >= n {
            return None;
        }
        Some(predict_cell(self.u.row(user), self.v, item))
    }

    /// Row `user` of UV, `None` for a user outside the matrix
    pub fn row(&self, user: usize) -> Option<Array1<f64>> {
        if user >= self.u.nrows() {
            return None;
        }
        Some(self.u.row(user).dot(self.v))
    }

    pub fn to_dense(&self) -> Array2<f64> {
        self.u.dot(self.v)
    }

    /// (actual, predicted) for every observed cell of `r`, row-major.
    /// Cells outside the factor shapes are skipped.
    pub fn observed_pairs(&self, r: &SparseRatingMatrix) -> Vec<ObservedPrediction> {
        let pairs_of_row = |i: usize| {
            r.row(i)
                .filter_map(move |(j, actual)| {
                    self.predict(i, j).map(|predicted| ObservedPrediction {
                        user: i,
                        item: j,
                        actual,
                        predicted,
                    })
                })
                .collect::<Vec<_>>()
        };
        if self.parallel {
            (0..r.nrows())
                .into_par_iter()
                .flat_map_iter(pairs_of_row)
                .collect()
        } else {
            (0..r.nrows()).flat_map(pairs_of_row).collect()
        }
    }

    pub fn summary(&self, r: &SparseRatingMatrix) -> ReconstructionSummary {
        summarize(&self.observed_pairs(r))
    }
}

pub fn summarize(pairs: &[ObservedPrediction]) -> ReconstructionSummary {
    let residuals: Vec<f64> = pairs.iter().map(ObservedPrediction::residual).collect();
    let count = residuals.len();
    if count == 0 {
        return ReconstructionSummary {
            count,
            rmse: f64::NAN,
            mae: f64::NAN,
            mean_residual: f64::NAN,
            residual_std_dev: f64::NAN,
        };
    }
    let squared = residuals.iter().map(|r| r * r).sum::<f64>();
    let absolute = residuals.iter().map(|r| r.abs()).sum::<f64>();
    ReconstructionSummary {
        count,
        rmse: (squared / count as f64).sqrt(),
        mae: absolute / count as f64,
        mean_residual: residuals.iter().mean(),
        residual_std_dev: residuals.iter().std_dev(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::RatingTriple;
    use ndarray::array;

    fn factors() -> (Array2<f64>, Array2<f64>) {
        (array![[1.0, 0.0], [0.5, 2.0]], array![[4.0, 2.0, 1.0], [0.5, 0.0, 1.0]])
    }

    #[test]
    fn test_row_matches_dense() {
        let (u, v) = factors();
        let rec = Reconstruction::new(&u, &v);
        let dense = rec.to_dense();
        assert_eq!(rec.shape(), (2, 3));
        for i in 0..2 {
            assert_eq!(rec.row(i).unwrap(), dense.row(i));
            for j in 0..3 {
                assert!((rec.predict(i, j).unwrap() - dense[[i, j]]).abs() < 1e-12);
            }
        }
        assert_eq!(dense, array![[4.0, 2.0, 1.0], [3.0, 1.0, 2.5]]);
    }

    #[test]
    fn test_observed_pairs_row_major() {
        let (u, v) = factors();
        let r = SparseRatingMatrix::from_triples(
            2,
            3,
            vec![
                RatingTriple::new(1, 2, 3.0),
                RatingTriple::new(0, 0, 5.0),
                RatingTriple::new(1, 0, 3.0),
            ],
        )
        .unwrap();
        let pairs = Reconstruction::new(&u, &v).observed_pairs(&r);
        let cells: Vec<_> = pairs.iter().map(|p| (p.user, p.item)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (1, 2)]);
        assert_eq!(pairs[0].actual, 5.0);
        assert_eq!(pairs[0].predicted, 4.0);
        assert!((pairs[2].residual() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let (u, v) = factors();
        let rec = Reconstruction::new(&u, &v);
        assert_eq!(rec.predict(2, 0), None);
        assert_eq!(rec.predict(0, 3), None);
        assert!(rec.row(2).is_none());
    }

    #[test]
    fn test_parallel_pairs_match_sequential() {
        let (u, v) = factors();
        let r = SparseRatingMatrix::from_triples(
            2,
            3,
            vec![
                RatingTriple::new(0, 1, 2.0),
                RatingTriple::new(1, 0, 3.0),
                RatingTriple::new(1, 2, 1.0),
            ],
        )
        .unwrap();
        let sequential = Reconstruction::new(&u, &v).observed_pairs(&r);
        let parallel = Reconstruction::new(&u, &v)
            .with_parallel(true)
            .observed_pairs(&r);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_summary() {
        let pairs = vec![
            ObservedPrediction { user: 0, item: 0, actual: 5.0, predicted: 4.0 },
            ObservedPrediction { user: 0, item: 1, actual: 2.0, predicted: 3.0 },
        ];
        let summary = summarize(&pairs);
        assert_eq!(summary.count, 2);
        assert!((summary.rmse - 1.0).abs() < 1e-12);
        assert!((summary.mae - 1.0).abs() < 1e-12);
        assert!(summary.mean_residual.abs() < 1e-12);
        assert!((summary.residual_std_dev - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summary_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.rmse.is_nan());
    }
}
