//! Integration tests for the rating factorization pipeline
//!
//! Covers the path from raw review files through matrix construction,
//! fitting and the written outputs.

use std::fs;

use ndarray::Array2;
use ndarray_npy::read_npy;
use rating_wnmf::config::Config;
use rating_wnmf::factor::init_factors;
use rating_wnmf::*;
use tempfile::tempdir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Users 0..n_users rate items in a banded pattern with ratings in 1..=5
fn banded_triples(n_users: usize, n_items: usize) -> Vec<RatingTriple> {
    let mut triples = Vec::new();
    for i in 0..n_users {
        for offset in 0..3 {
            let j = (i + offset) % n_items;
            let rating = 1.0 + ((i * 7 + j * 3) % 5) as f64;
            triples.push(RatingTriple::new(i, j, rating));
        }
    }
    triples
}

#[test]
fn test_scenario_from_triples() {
    init_logger();
    let triples = vec![
        RatingTriple::new(0, 0, 5.0),
        RatingTriple::new(0, 1, 3.0),
        RatingTriple::new(1, 0, 4.0),
    ];
    let r = SparseRatingMatrix::from_triples(2, 2, triples).unwrap();
    let w = r.weight_mask();
    assert_eq!(w.to_dense(), ndarray::array![[1.0, 1.0], [1.0, 0.0]]);

    let config = WnmfConfig {
        rank: 1,
        sweep_count: 1,
        seed: Some(2024),
        ..Default::default()
    };
    let (u0, v0) = init_factors(2, 2, 1, Some(2024)).unwrap();
    let before = u0[[1, 0]] * v0[[0, 0]];

    let fitted = WnmfModel::with_config(config).fit(&r).unwrap();
    assert!(fitted
        .u
        .iter()
        .chain(fitted.v.iter())
        .all(|&x| x.is_finite() && x >= 0.0));
    let after = Reconstruction::new(&fitted.u, &fitted.v).predict(1, 0).unwrap();
    assert!((after - 4.0).abs() < (before - 4.0).abs());
}

#[test]
fn test_loss_monotone_on_banded_data() {
    init_logger();
    let r = SparseRatingMatrix::from_triples(40, 25, banded_triples(40, 25)).unwrap();
    let fitted = WnmfModel::with_config(WnmfConfig {
        rank: 5,
        sweep_count: 30,
        seed: Some(11),
        parallel: true,
        ..Default::default()
    })
    .fit(&r)
    .unwrap();
    for pair in fitted.loss_history.windows(2) {
        assert!(pair[1] <= pair[0] * (1.0 + 1e-9) + 1e-12);
    }
    assert!(fitted.u.iter().chain(fitted.v.iter()).all(|&x| x >= 0.0));
}

#[test]
fn test_weight_mask_is_indicator_of_observed() {
    let r = SparseRatingMatrix::from_triples(10, 8, banded_triples(10, 8)).unwrap();
    let w = r.weight_mask();
    let dense = w.to_dense();
    for i in 0..10 {
        for j in 0..8 {
            assert_eq!(dense[[i, j]] == 1.0, r.is_observed(i, j));
            assert!(dense[[i, j]] == 0.0 || dense[[i, j]] == 1.0);
        }
    }
    assert_eq!(w.count(), r.nnz());
}

#[test]
fn test_cli_run_writes_outputs() {
    init_logger();
    let dir = tempdir().unwrap();
    let reviews = dir.path().join("reviews.csv");
    let users = dir.path().join("users.json");
    let items = dir.path().join("items.json");
    let out = dir.path().join("out");

    fs::write(
        &reviews,
        "user_id,business_id,stars\n\
         alice,cafe,5\n\
         alice,deli,3\n\
         bob,cafe,4\n\
         bob,cafe,2\n\
         carol,deli,1\n\
         mallory,cafe,5\n",
    )
    .unwrap();
    fs::write(&users, r#"{"alice": 0, "bob": 1, "carol": 2}"#).unwrap();
    // "bar" has no reviews and becomes an all-zero column
    fs::write(&items, r#"{"cafe": 0, "deli": 1, "bar": 2}"#).unwrap();

    let args = vec![
        "rating_wnmf".to_string(),
        reviews.display().to_string(),
        users.display().to_string(),
        items.display().to_string(),
        out.display().to_string(),
        "2".to_string(),
        "4".to_string(),
        "42".to_string(),
    ];
    let config = Config::new(args.into_iter()).unwrap();
    let output = run(&config).unwrap();

    assert_eq!(output.ratings.shape(), (3, 3));
    assert_eq!(output.ratings.nnz(), 4);
    // last write wins for bob/cafe
    assert_eq!(output.ratings.get(1, 0), Some(2.0));
    assert_eq!(output.stats.overwritten_triples, 1);
    assert_eq!(output.stats.unresolved_reviews, 1);

    let u: Array2<f64> = read_npy(out.join("U.npy")).unwrap();
    let v: Array2<f64> = read_npy(out.join("V.npy")).unwrap();
    assert_eq!(u.dim(), (3, 2));
    assert_eq!(v.dim(), (2, 3));
    assert!(u.iter().chain(v.iter()).all(|x| x.is_finite()));

    let report = fs::read_to_string(out.join("report.txt")).unwrap();
    assert_eq!(report.lines().count(), 4);
    assert!(report.lines().all(|line| line.contains(" - ")));
}

#[test]
fn test_unrated_item_guard_disabled_fails() {
    let triples = vec![RatingTriple::new(0, 0, 3.0), RatingTriple::new(1, 1, 4.0)];
    let r = SparseRatingMatrix::from_triples(2, 3, triples).unwrap();
    let config = WnmfConfig {
        rank: 2,
        seed: Some(1),
        guard: DenominatorGuard::Disabled,
        ..Default::default()
    };
    let err = WnmfModel::with_config(config).fit(&r).unwrap_err();
    assert!(matches!(err, WnmfError::DegenerateDenominator { .. }));

    let config = WnmfConfig {
        rank: 2,
        seed: Some(1),
        ..Default::default()
    };
    assert!(WnmfModel::with_config(config).fit(&r).is_ok());
}
