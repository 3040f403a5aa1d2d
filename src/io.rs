use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use ndarray_npy::WriteNpyExt;
use serde::Deserialize;

use crate::error::Result;
use crate::factor::FittedFactors;
use crate::index::RatingIndex;
use crate::reconstruction::ObservedPrediction;
use crate::sparse::RatingTriple;

/// One row of the review export; columns other than these are ignored
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewRecord {
    pub user_id: String,
    pub business_id: String,
    pub stars: f64,
}

pub fn read_reviews<P: AsRef<Path>>(path: P) -> Result<Vec<ReviewRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut reviews = Vec::new();
    for record in reader.deserialize() {
        let review: ReviewRecord = record?;
        reviews.push(review);
    }
    info!(
        "Loaded {} reviews from {}",
        reviews.len(),
        path.as_ref().display()
    );
    Ok(reviews)
}

/// Read a `{"raw_id": index, ...}` lookup table
pub fn read_index_table<P: AsRef<Path>>(path: P) -> Result<RatingIndex> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let map: HashMap<String, usize> = serde_json::from_reader(reader)?;
    let index = RatingIndex::from_map(map)?;
    info!(
        "Loaded {} ids from {}",
        index.len(),
        path.as_ref().display()
    );
    Ok(index)
}

/// Map raw reviews onto dense indices; returns the triples and how many
/// reviews named an unknown user or business.
pub fn resolve_reviews(
    reviews: &[ReviewRecord],
    users: &RatingIndex,
    items: &RatingIndex,
) -> (Vec<RatingTriple>, usize) {
    let mut unresolved = 0;
    let triples = reviews
        .iter()
        .filter_map(|review| {
            match (users.get(&review.user_id), items.get(&review.business_id)) {
                (Some(user), Some(item)) => Some(RatingTriple::new(user, item, review.stars)),
                _ => {
                    unresolved += 1;
                    None
                }
            }
        })
        .collect();
    if unresolved > 0 {
        warn!("{} reviews reference unknown user or business ids", unresolved);
    }
    (triples, unresolved)
}

/// One `actual - predicted` line per observed cell
pub fn write_report<P: AsRef<Path>>(path: P, pairs: &[ObservedPrediction]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for pair in pairs {
        writeln!(writer, "{} - {}", pair.actual, pair.predicted)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `U.npy` and `V.npy` into `dir`, creating it if needed
pub fn save_factors<P: AsRef<Path>>(dir: P, factors: &FittedFactors) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    factors.u.write_npy(BufWriter::new(File::create(dir.join("U.npy"))?))?;
    factors.v.write_npy(BufWriter::new(File::create(dir.join("V.npy"))?))?;
    info!("Saved factors to {}", dir.display());
    Ok(())
}
