use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{Result, WnmfError};

/// One resolved rating: dense user index, dense item index, rating value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingTriple {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
}

impl RatingTriple {
    pub fn new(user: usize, item: usize, rating: f64) -> Self {
        Self { user, item, rating }
    }
}

/// What the builder does with a triple it cannot place in the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexStrictness {
    /// Drop the triple, log it and keep going
    Reject,
    /// Abort the build with an error
    #[default]
    Fail,
}

/// Accumulates rating triples and compresses them into a [`SparseRatingMatrix`].
///
/// Duplicate (user, item) pairs overwrite the earlier rating: last write wins.
pub struct SparseRatingMatrixBuilder {
    n_users: usize,
    n_items: usize,
    strictness: IndexStrictness,
    cells: HashMap<(usize, usize), f64>,
    rejected: usize,
    overwritten: usize,
}

impl SparseRatingMatrixBuilder {
    pub fn new(n_users: usize, n_items: usize, strictness: IndexStrictness) -> Self {
        Self {
            n_users,
            n_items,
            strictness,
            cells: HashMap::new(),
            rejected: 0,
            overwritten: 0,
        }
    }

    pub fn push(&mut self, triple: RatingTriple) -> Result<()> {
        let RatingTriple { user, item, rating } = triple;

        let problem = if user >= self.n_users || item >= self.n_items {
            Some(WnmfError::MalformedIndex {
                user,
                item,
                n_users: self.n_users,
                n_items: self.n_items,
            })
        } else if !rating.is_finite() || rating < 0.0 {
            Some(WnmfError::InvalidRating { user, item, rating })
        } else {
            None
        };

        if let Some(error) = problem {
            return match self.strictness {
                IndexStrictness::Fail => Err(error),
                IndexStrictness::Reject => {
                    warn!("Rejected rating triple: {}", error);
                    self.rejected += 1;
                    Ok(())
                }
            };
        }

        match self.cells.entry((user, item)) {
            Entry::Occupied(mut slot) => {
                debug!(
                    "Rating ({}, {}) overwritten: {} -> {}",
                    user,
                    item,
                    slot.get(),
                    rating
                );
                slot.insert(rating);
                self.overwritten += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(rating);
            }
        }
        Ok(())
    }

    pub fn extend<I>(&mut self, triples: I) -> Result<()>
    where
        I: IntoIterator<Item = RatingTriple>,
    {
        for triple in triples {
            self.push(triple)?;
        }
        Ok(())
    }

    /// Number of triples dropped under [`IndexStrictness::Reject`]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Number of triples that replaced an earlier rating for the same cell
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    /// Cells whose final rating is exactly zero; they are left out of `R`
    pub fn zero_ratings(&self) -> usize {
        self.cells.values().filter(|&&v| v == 0.0).count()
    }

    /// Compress the accumulated cells into CSR/CSC form.
    ///
    /// A cell whose last written rating is zero is not an observation: it is
    /// dropped here, so it appears in neither `R` nor `W`.
    pub fn build(self) -> Result<SparseRatingMatrix> {
        let mut triplets = TriMat::with_capacity((self.n_users, self.n_items), self.cells.len());
        let mut zeros = 0;
        for (&(i, j), &v) in &self.cells {
            if v == 0.0 {
                zeros += 1;
                continue;
            }
            triplets.add_triplet(i, j, v);
        }
        if zeros > 0 {
            debug!("Dropped {} zero ratings as unobserved", zeros);
        }
        if triplets.nnz() == 0 {
            return Err(WnmfError::EmptyInput);
        }

        // cells are unique, so the conversion has nothing to sum
        let csr: CsMat<f64> = triplets.to_csr();
        let csc = csr.to_csc();
        Ok(SparseRatingMatrix { csr, csc })
    }
}

/// Read-only sparse user x item rating matrix `R`.
///
/// Held as CSR for row walks plus a CSC copy for column walks, both
/// O(observed). Absent cells are unobserved, not zero ratings.
#[derive(Debug, Clone)]
pub struct SparseRatingMatrix {
    csr: CsMat<f64>,
    csc: CsMat<f64>,
}

impl SparseRatingMatrix {
    /// Build from triples with [`IndexStrictness::Fail`].
    ///
    /// # Example
    /// ```
    /// use rating_wnmf::sparse::{RatingTriple, SparseRatingMatrix};
    /// let r = SparseRatingMatrix::from_triples(
    ///     2,
    ///     2,
    ///     vec![RatingTriple::new(0, 0, 5.0), RatingTriple::new(1, 0, 4.0)],
    /// )
    /// .unwrap();
    /// assert_eq!(r.get(1, 0), Some(4.0));
    /// assert_eq!(r.get(1, 1), None);
    /// ```
    pub fn from_triples<I>(n_users: usize, n_items: usize, triples: I) -> Result<Self>
    where
        I: IntoIterator<Item = RatingTriple>,
    {
        let mut builder = SparseRatingMatrixBuilder::new(n_users, n_items, IndexStrictness::Fail);
        builder.extend(triples)?;
        builder.build()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.csr.shape()
    }

    pub fn nrows(&self) -> usize {
        self.csr.rows()
    }

    pub fn ncols(&self) -> usize {
        self.csr.cols()
    }

    pub fn nnz(&self) -> usize {
        self.csr.nnz()
    }

    /// CSR view of the ratings
    pub fn as_csr(&self) -> &CsMat<f64> {
        &self.csr
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows() || col >= self.ncols() {
            return None;
        }
        self.csr.get(row, col).copied()
    }

    pub fn is_observed(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some()
    }

    /// Observed `(col, rating)` pairs of one row, columns ascending.
    /// Empty for a row outside the matrix.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        outer_entries(&self.csr, row)
    }

    /// Observed `(row, rating)` pairs of one column, rows ascending.
    /// Empty for a column outside the matrix.
    pub fn col(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        outer_entries(&self.csc, col)
    }

    pub fn row_nnz(&self, row: usize) -> usize {
        self.csr.outer_view(row).map_or(0, |view| view.nnz())
    }

    pub fn col_nnz(&self, col: usize) -> usize {
        self.csc.outer_view(col).map_or(0, |view| view.nnz())
    }

    /// All observed `(row, col, rating)` cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.csr.iter().map(|(&v, (i, j))| (i, j, v))
    }

    /// Dense copy with unobserved cells set to zero
    pub fn to_dense(&self) -> Array2<f64> {
        self.csr.to_dense()
    }

    pub fn weight_mask(&self) -> WeightMask {
        WeightMask::from_ratings(self)
    }
}

fn outer_entries(mat: &CsMat<f64>, outer: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    mat.outer_view(outer)
        .into_iter()
        .flat_map(|view| {
            let (indices, data) = view.into_raw_storage();
            indices.iter().copied().zip(data.iter())
        })
        .map(|(inner, &v)| (inner, v))
}

/// Binary observation mask `W`: 1 exactly where `R` holds an observed rating.
///
/// Shares the sparsity pattern of `R`, with every stored value replaced by 1.
/// Never mutated after derivation.
#[derive(Debug, Clone)]
pub struct WeightMask {
    csr: CsMat<f64>,
    csc: CsMat<f64>,
}

impl WeightMask {
    pub fn from_ratings(ratings: &SparseRatingMatrix) -> Self {
        Self {
            csr: ratings.csr.map(|_| 1.0),
            csc: ratings.csc.map(|_| 1.0),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.csr.shape()
    }

    /// 1.0 on observed cells, 0.0 elsewhere (including outside the matrix)
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (n_rows, n_cols) = self.shape();
        if row >= n_rows || col >= n_cols {
            return 0.0;
        }
        self.csr.get(row, col).copied().unwrap_or(0.0)
    }

    pub fn count(&self) -> usize {
        self.csr.nnz()
    }

    pub fn observed_in_row(&self, row: usize) -> usize {
        self.csr.outer_view(row).map_or(0, |view| view.nnz())
    }

    pub fn observed_in_col(&self, col: usize) -> usize {
        self.csc.outer_view(col).map_or(0, |view| view.nnz())
    }

    pub fn to_dense(&self) -> Array2<f64> {
        self.csr.to_dense()
    }
}
