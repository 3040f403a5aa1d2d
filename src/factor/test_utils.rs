/// Shared test fixtures for the factorization engine
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use crate::sparse::{RatingTriple, SparseRatingMatrix};

/// The 2 users x 2 items example: {(0,0,5), (0,1,3), (1,0,4)}
pub fn scenario_ratings() -> SparseRatingMatrix {
    SparseRatingMatrix::from_triples(
        2,
        2,
        vec![
            RatingTriple::new(0, 0, 5.0),
            RatingTriple::new(0, 1, 3.0),
            RatingTriple::new(1, 0, 4.0),
        ],
    )
    .unwrap()
}

/// Observe each cell of a random rank-`rank` non-negative matrix with
/// probability `density`. Every user rates at least item 0 so the matrix is
/// never empty.
pub fn make_low_rank_ratings(
    n_users: usize,
    n_items: usize,
    density: f64,
    rank: usize,
) -> SparseRatingMatrix {
    let mut rng = StdRng::seed_from_u64(7);
    let a = Array2::random_using((n_users, rank), Uniform::new(0.5, 1.5), &mut rng);
    let b = Array2::random_using((rank, n_items), Uniform::new(0.5, 1.5), &mut rng);
    let full = a.dot(&b);

    let mut triples = Vec::new();
    for i in 0..n_users {
        for j in 0..n_items {
            if j == 0 || rng.gen::<f64>() < density {
                triples.push(RatingTriple::new(i, j, full[[i, j]]));
            }
        }
    }
    SparseRatingMatrix::from_triples(n_users, n_items, triples).unwrap()
}
