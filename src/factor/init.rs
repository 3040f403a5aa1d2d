use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use crate::error::{Result, WnmfError};

pub const DEFAULT_SEED: u64 = 42;

/// Draw `U` (m x k) and `V` (k x n) independently from Uniform[0, 1).
///
/// No normalization or scaling is applied. `U` is drawn first, so a given
/// seed always yields the same pair.
pub fn init_factors(
    m: usize,
    n: usize,
    k: usize,
    seed: Option<u64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    if k == 0 {
        return Err(WnmfError::InvalidConfiguration(
            "rank must be positive".to_string(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(DEFAULT_SEED));
    let u = Array2::random_using((m, k), Uniform::new(0.0, 1.0), &mut rng);
    let v = Array2::random_using((k, n), Uniform::new(0.0, 1.0), &mut rng);
    Ok((u, v))
}
