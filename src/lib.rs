/**
 * File: /src/lib.rs
 * Created Date: Monday, January 22nd 2024
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 12th March 2024 3:02:51 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2024-03-12		Zihan	weighted NMF over sparse user-business ratings
 */
pub mod config;
pub mod error;
pub mod factor;
pub mod index;
pub mod io;
pub mod pipeline;
pub mod reconstruction;
pub mod sparse;

use log::info;

pub use error::{Result, WnmfError};
pub use factor::{DenominatorGuard, FittedFactors, WnmfConfig, WnmfModel};
pub use index::RatingIndex;
pub use pipeline::{PipelineOutput, RatingPipeline};
pub use reconstruction::{ObservedPrediction, Reconstruction};
pub use sparse::{IndexStrictness, RatingTriple, SparseRatingMatrix, WeightMask};

/// Load the review export and lookup tables named in `config`, fit, and write
/// `U.npy`, `V.npy` and `report.txt` into the output directory.
pub fn run(config: &config::Config) -> Result<PipelineOutput> {
    let users = io::read_index_table(config.get_users())?;
    let items = io::read_index_table(config.get_items())?;
    let reviews = io::read_reviews(config.get_reviews())?;
    let (triples, unresolved) = io::resolve_reviews(&reviews, &users, &items);

    let pipeline = RatingPipeline::new(config.get_wnmf().clone(), IndexStrictness::Fail);
    let mut output = pipeline.run(triples, users.len(), items.len())?;
    output.stats.unresolved_reviews = unresolved;

    io::save_factors(config.get_out_dir(), &output.factors)?;
    io::write_report(config.get_out_dir().join("report.txt"), &output.predictions)?;
    info!(
        "Wrote results to {} in {:?}",
        config.get_out_dir().display(),
        output.stats.total_duration
    );
    Ok(output)
}
